//! # Backend Service Seams
//!
//! The booking workflow drives six independent backend collaborators. Each is
//! an `async_trait` so the orchestrator can run against the real HTTP
//! implementation ([`HttpBackend`]) or against test doubles.
//!
//! Trait methods return the decoded wire response; business interpretation
//! (success, not-found, rejection) lives on the wire types in [`wire`] and is
//! applied by the resolver and submitters. Transport-level problems are
//! reported as [`BookingError::Transport`].

pub mod http;
pub mod traits;
pub mod wire;

use std::future::Future;
use std::time::{Duration, Instant};

use crate::error::{BookingError, BookingResult};
use crate::logging::log_service_call;

pub use http::HttpBackend;
pub use traits::{
    BarcodeAllocationService, BarcodeLookupService, BookingService, LicenceCheckService,
    PassportService, ProvisionalRecordStore,
};
pub use wire::{
    AckResponse, AllocationRequest, AllocationResponse, BarcodeCheckRequest,
    BarcodeCheckResponse, BookingResponse, LicenceCheckResponse, PassportRequest,
    ProvisionalRecordRequest,
};

/// Run a backend call under a bounded timeout.
///
/// An elapsed timeout is reported as a transport failure so callers treat it
/// like any other call that did not complete.
pub async fn bounded<T, F>(service: &str, limit: Duration, call: F) -> BookingResult<T>
where
    F: Future<Output = BookingResult<T>>,
{
    let started = Instant::now();
    let result = match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(BookingError::transport(
            service,
            format!("timed out after {}ms", limit.as_millis()),
        )),
    };

    let elapsed = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => log_service_call(service, "completed", None, Some(elapsed), None),
        Err(e) => log_service_call(service, "failed", None, Some(elapsed), Some(&e.to_string())),
    }

    result
}
