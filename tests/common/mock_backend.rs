use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use booking_core::config::BookingConfig;
use booking_core::directory::DestinationOffice;
use booking_core::error::{BookingError, BookingResult};
use booking_core::events::{EventPublisher, PublishedEvent};
use booking_core::services::{
    AckResponse, AllocationRequest, AllocationResponse, BarcodeAllocationService,
    BarcodeCheckRequest, BarcodeCheckResponse, BarcodeLookupService, BookingResponse,
    BookingService, LicenceCheckResponse, LicenceCheckService, PassportRequest, PassportService,
    ProvisionalRecordRequest, ProvisionalRecordStore,
};
use booking_core::session::{BookingServices, BookingSession};
use booking_core::submission::SubmissionRecord;

pub const LOOKED_UP_BARCODE: &str = "8801234567890";
pub const ALLOCATED_BARCODE: &str = "9901112223334";

/// Recording stand-in for every backend collaborator.
///
/// Answers are configured with the `with_*` builders before the backend is
/// shared; every request is recorded for later assertions.
#[derive(Debug)]
pub struct MockBackend {
    lookup_answer: BookingResult<BarcodeCheckResponse>,
    allocation_answer: BookingResult<AllocationResponse>,
    store_answer: BookingResult<AckResponse>,
    booking_answers: Mutex<Vec<BookingResult<BookingResponse>>>,
    passport_answers: Mutex<Vec<BookingResult<AckResponse>>>,
    licence_answer: BookingResult<LicenceCheckResponse>,
    lookup_delay: Option<Duration>,
    booking_delay: Option<Duration>,

    pub lookups: Mutex<Vec<BarcodeCheckRequest>>,
    pub allocations: Mutex<Vec<AllocationRequest>>,
    pub provisional_records: Mutex<Vec<ProvisionalRecordRequest>>,
    pub bookings: Mutex<Vec<SubmissionRecord>>,
    pub passports: Mutex<Vec<PassportRequest>>,
    pub licence_checks: Mutex<usize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Every service succeeds and the lookup finds [`LOOKED_UP_BARCODE`]
    pub fn new() -> Self {
        Self {
            lookup_answer: Ok(lookup_found(LOOKED_UP_BARCODE)),
            allocation_answer: Ok(AllocationResponse {
                barcode: Some(format!("\"{ALLOCATED_BARCODE}\"")),
                ..Default::default()
            }),
            store_answer: Ok(AckResponse::empty_success()),
            booking_answers: Mutex::new(Vec::new()),
            passport_answers: Mutex::new(Vec::new()),
            licence_answer: Ok(LicenceCheckResponse {
                success: Some(true),
                ..Default::default()
            }),
            lookup_delay: None,
            booking_delay: None,
            lookups: Mutex::new(Vec::new()),
            allocations: Mutex::new(Vec::new()),
            provisional_records: Mutex::new(Vec::new()),
            bookings: Mutex::new(Vec::new()),
            passports: Mutex::new(Vec::new()),
            licence_checks: Mutex::new(0),
        }
    }

    pub fn with_lookup(mut self, answer: BookingResult<BarcodeCheckResponse>) -> Self {
        self.lookup_answer = answer;
        self
    }

    pub fn with_allocation(mut self, answer: BookingResult<AllocationResponse>) -> Self {
        self.allocation_answer = answer;
        self
    }

    pub fn with_store(mut self, answer: BookingResult<AckResponse>) -> Self {
        self.store_answer = answer;
        self
    }

    /// Queue booking answers, consumed in order; afterwards bookings are accepted
    pub fn with_bookings(self, answers: Vec<BookingResult<BookingResponse>>) -> Self {
        *self.booking_answers.lock() = answers;
        self
    }

    /// Queue passport answers, consumed in order; afterwards passports succeed
    pub fn with_passports(self, answers: Vec<BookingResult<AckResponse>>) -> Self {
        *self.passport_answers.lock() = answers;
        self
    }

    pub fn with_licence(mut self, answer: BookingResult<LicenceCheckResponse>) -> Self {
        self.licence_answer = answer;
        self
    }

    pub fn with_lookup_delay(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn with_booking_delay(mut self, delay: Duration) -> Self {
        self.booking_delay = Some(delay);
        self
    }

    pub fn services(self: &Arc<Self>) -> BookingServices {
        BookingServices {
            lookup: self.clone(),
            allocation: self.clone(),
            provisional_store: self.clone(),
            booking: self.clone(),
            passport: self.clone(),
            licence: self.clone(),
        }
    }

    pub fn booking_count(&self) -> usize {
        self.bookings.lock().len()
    }

    pub fn passport_count(&self) -> usize {
        self.passports.lock().len()
    }

    pub fn allocation_count(&self) -> usize {
        self.allocations.lock().len()
    }

    pub fn licence_check_count(&self) -> usize {
        *self.licence_checks.lock()
    }
}

#[async_trait]
impl BarcodeLookupService for MockBackend {
    async fn lookup(&self, request: &BarcodeCheckRequest) -> BookingResult<BarcodeCheckResponse> {
        self.lookups.lock().push(request.clone());
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        self.lookup_answer.clone()
    }
}

#[async_trait]
impl BarcodeAllocationService for MockBackend {
    async fn allocate(&self, request: &AllocationRequest) -> BookingResult<AllocationResponse> {
        self.allocations.lock().push(request.clone());
        self.allocation_answer.clone()
    }
}

#[async_trait]
impl ProvisionalRecordStore for MockBackend {
    async fn store_provisional(
        &self,
        request: &ProvisionalRecordRequest,
    ) -> BookingResult<AckResponse> {
        self.provisional_records.lock().push(request.clone());
        self.store_answer.clone()
    }
}

#[async_trait]
impl BookingService for MockBackend {
    async fn submit_booking(&self, record: &SubmissionRecord) -> BookingResult<BookingResponse> {
        self.bookings.lock().push(record.clone());
        if let Some(delay) = self.booking_delay {
            tokio::time::sleep(delay).await;
        }
        let mut answers = self.booking_answers.lock();
        if answers.is_empty() {
            Ok(booking_accepted("IT-55"))
        } else {
            answers.remove(0)
        }
    }
}

#[async_trait]
impl PassportService for MockBackend {
    async fn submit_passport(&self, request: &PassportRequest) -> BookingResult<AckResponse> {
        self.passports.lock().push(request.clone());
        let mut answers = self.passport_answers.lock();
        if answers.is_empty() {
            Ok(AckResponse::empty_success())
        } else {
            answers.remove(0)
        }
    }
}

#[async_trait]
impl LicenceCheckService for MockBackend {
    async fn check_licence(&self) -> BookingResult<LicenceCheckResponse> {
        *self.licence_checks.lock() += 1;
        self.licence_answer.clone()
    }
}

pub fn lookup_found(barcode: &str) -> BarcodeCheckResponse {
    BarcodeCheckResponse {
        status: Some("success".into()),
        status_code: Some("200".into()),
        barcode: Some(barcode.into()),
        ..Default::default()
    }
}

pub fn lookup_not_found() -> BarcodeCheckResponse {
    BarcodeCheckResponse {
        success: Some(false),
        status_code: Some("404".into()),
        ..Default::default()
    }
}

pub fn booking_accepted(item_id: &str) -> BookingResponse {
    BookingResponse {
        success: Some(true),
        status_code: Some("200".into()),
        item_id: Some(item_id.into()),
        ..Default::default()
    }
}

pub fn transport_error(service: &str) -> BookingError {
    BookingError::transport(service, "connection reset by peer")
}

pub fn agargaon() -> DestinationOffice {
    DestinationOffice::new(
        "1001",
        "AGARGAON",
        "Regional Passport Office, Agargaon, Sher-e-Bangla Nagar, Dhaka-1207",
        "01733393301",
    )
}

pub fn jatrabari() -> DestinationOffice {
    DestinationOffice::new(
        "1002",
        "JATRABARI",
        "Regional Passport Office, Jatrabari, Dhaka-1204",
        "01733393302",
    )
}

/// Session wired to `backend` with default configuration
pub fn session_with(backend: &Arc<MockBackend>) -> (BookingSession, EventPublisher) {
    session_with_config(backend, &BookingConfig::default())
}

pub fn session_with_config(
    backend: &Arc<MockBackend>,
    config: &BookingConfig,
) -> (BookingSession, EventPublisher) {
    let publisher = EventPublisher::default();
    let session = BookingSession::new("op-17", backend.services(), config, publisher.clone());
    (session, publisher)
}

/// Drain already-published events without waiting
pub fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<PublishedEvent>) -> Vec<PublishedEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Wait for the named event, skipping others
pub async fn wait_for_event(
    rx: &mut tokio::sync::broadcast::Receiver<PublishedEvent>,
    name: &str,
) -> PublishedEvent {
    loop {
        match rx.recv().await {
            Ok(event) if event.name == name => return event,
            Ok(_) => continue,
            Err(e) => panic!("event stream ended before {name}: {e}"),
        }
    }
}
