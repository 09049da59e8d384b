use async_trait::async_trait;

use super::wire::{
    AckResponse, AllocationRequest, AllocationResponse, BarcodeCheckRequest,
    BarcodeCheckResponse, BookingResponse, LicenceCheckResponse, PassportRequest,
    ProvisionalRecordRequest,
};
use crate::error::BookingResult;
use crate::submission::SubmissionRecord;

/// Looks up a barcode previously assigned to a (user, office) pair
#[async_trait]
pub trait BarcodeLookupService: Send + Sync {
    async fn lookup(&self, request: &BarcodeCheckRequest) -> BookingResult<BarcodeCheckResponse>;
}

/// Allocates fresh barcodes from the shared pool
#[async_trait]
pub trait BarcodeAllocationService: Send + Sync {
    async fn allocate(&self, request: &AllocationRequest) -> BookingResult<AllocationResponse>;
}

/// Records that a barcode was provisionally allocated for an office
#[async_trait]
pub trait ProvisionalRecordStore: Send + Sync {
    async fn store_provisional(
        &self,
        request: &ProvisionalRecordRequest,
    ) -> BookingResult<AckResponse>;
}

/// Commits a booking reservation for a barcode
#[async_trait]
pub trait BookingService: Send + Sync {
    async fn submit_booking(&self, record: &SubmissionRecord) -> BookingResult<BookingResponse>;
}

/// Marks a booked item as an issued ePassport
#[async_trait]
pub trait PassportService: Send + Sync {
    async fn submit_passport(&self, request: &PassportRequest) -> BookingResult<AckResponse>;
}

/// Downstream licence verification, consulted after a completed booking
#[async_trait]
pub trait LicenceCheckService: Send + Sync {
    async fn check_licence(&self) -> BookingResult<LicenceCheckResponse>;
}
