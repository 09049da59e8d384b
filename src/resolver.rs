//! # Barcode Resolver
//!
//! Determines the operative barcode for a (user, destination office) pair.
//!
//! The common path is a lookup of a barcode already assigned to the pair. A
//! lookup that reports failure or an explicit not-found is an *expected
//! absence*: the resolver then allocates one fresh barcode from the shared
//! pool. Exactly one of {lookup success, allocation success, terminal failure}
//! happens per call and partial barcodes are never returned.
//!
//! Persisting a freshly allocated barcode is the caller's job; see
//! [`ProvisionalRecorder`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::barcode::{Barcode, BarcodeProvenance, ResolvedBarcode};
use crate::config::AllocationConfig;
use crate::constants::{services, status};
use crate::directory::DestinationOffice;
use crate::error::{BestEffortOutcome, BookingError, BookingResult};
use crate::services::{
    bounded, AllocationRequest, BarcodeAllocationService, BarcodeCheckRequest,
    BarcodeLookupService, ProvisionalRecordRequest, ProvisionalRecordStore,
};

/// Result of asking the lookup service for a pre-assigned barcode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Assigned(Barcode),
    /// Expected absence: nothing pre-assigned, fall back to allocation
    NotAssigned,
}

/// Shared service-account identity used for pool allocation
#[derive(Clone, PartialEq, Eq)]
pub struct PoolCredential {
    pub user_id: String,
    pub password: String,
    pub barcode_qty: u32,
    pub barcode_type: String,
}

impl fmt::Debug for PoolCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCredential")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .field("barcode_qty", &self.barcode_qty)
            .field("barcode_type", &self.barcode_type)
            .finish()
    }
}

impl From<&AllocationConfig> for PoolCredential {
    fn from(config: &AllocationConfig) -> Self {
        Self {
            user_id: config.pool_user_id.clone(),
            password: config.pool_password.clone(),
            barcode_qty: config.barcode_qty,
            barcode_type: config.barcode_type.clone(),
        }
    }
}

impl PoolCredential {
    fn allocation_request(&self) -> AllocationRequest {
        AllocationRequest {
            user_id: self.user_id.clone(),
            user_pass: self.password.clone(),
            barcode_qty: self.barcode_qty,
            barcode_type: self.barcode_type.clone(),
        }
    }
}

/// Resolve-or-allocate barcode resolution
#[derive(Clone)]
pub struct BarcodeResolver {
    lookup: Arc<dyn BarcodeLookupService>,
    allocation: Arc<dyn BarcodeAllocationService>,
    pool: PoolCredential,
    timeout: Duration,
}

impl fmt::Debug for BarcodeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarcodeResolver")
            .field("pool", &self.pool)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl BarcodeResolver {
    pub fn new(
        lookup: Arc<dyn BarcodeLookupService>,
        allocation: Arc<dyn BarcodeAllocationService>,
        pool: PoolCredential,
        timeout: Duration,
    ) -> Self {
        Self {
            lookup,
            allocation,
            pool,
            timeout,
        }
    }

    /// Resolve the operative barcode for `user_id` shipping to `office_code`
    pub async fn resolve(&self, user_id: &str, office_code: &str) -> BookingResult<ResolvedBarcode> {
        match self.lookup(user_id, office_code).await? {
            LookupOutcome::Assigned(barcode) => {
                Ok(ResolvedBarcode::new(barcode, BarcodeProvenance::LookedUp))
            }
            LookupOutcome::NotAssigned => self.allocate(office_code).await,
        }
    }

    /// Ask the lookup service for a pre-assigned barcode.
    ///
    /// Not-found answers are [`LookupOutcome::NotAssigned`]; only transport
    /// failures surface as errors.
    pub async fn lookup(&self, user_id: &str, office_code: &str) -> BookingResult<LookupOutcome> {
        let request = BarcodeCheckRequest {
            user_id: user_id.to_string(),
            post_code: office_code.to_string(),
        };

        let lookup = bounded(
            services::BARCODE_LOOKUP,
            self.timeout,
            self.lookup.lookup(&request),
        )
        .await;

        match lookup {
            Ok(response) => match response.assigned_barcode() {
                Some(raw) => {
                    let barcode = Barcode::parse(&raw)?;
                    info!(
                        office_code = office_code,
                        barcode = %barcode,
                        "Using pre-assigned barcode"
                    );
                    Ok(LookupOutcome::Assigned(barcode))
                }
                None => {
                    info!(
                        office_code = office_code,
                        status_code = ?response.status_code,
                        message = ?response.message,
                        "No barcode pre-assigned, allocating from pool"
                    );
                    Ok(LookupOutcome::NotAssigned)
                }
            },
            Err(BookingError::Rejected { status_code, .. })
                if status_code == status::NOT_FOUND_CODE =>
            {
                info!(
                    office_code = office_code,
                    "Lookup answered not found, allocating from pool"
                );
                Ok(LookupOutcome::NotAssigned)
            }
            Err(e) => {
                warn!(office_code = office_code, error = %e, "Barcode lookup failed");
                Err(BookingError::lookup_failure(format!("lookup failed: {e}")))
            }
        }
    }

    async fn allocate(&self, office_code: &str) -> BookingResult<ResolvedBarcode> {
        let request = self.pool.allocation_request();
        debug!(request = ?request, "Requesting barcode allocation");

        let response = bounded(
            services::BARCODE_ALLOCATION,
            self.timeout,
            self.allocation.allocate(&request),
        )
        .await
        .map_err(|e| {
            warn!(office_code = office_code, error = %e, "Barcode allocation failed");
            BookingError::lookup_failure(format!("allocation failed: {e}"))
        })?;

        match response.barcode() {
            Some(raw) => {
                let barcode = Barcode::parse(&raw)?;
                info!(
                    office_code = office_code,
                    barcode = %barcode,
                    "Allocated fresh barcode"
                );
                Ok(ResolvedBarcode::new(barcode, BarcodeProvenance::FreshlyAllocated))
            }
            None => {
                let reason = response
                    .message
                    .unwrap_or_else(|| "Barcode not available".to_string());
                warn!(office_code = office_code, reason = %reason, "Allocation returned no barcode");
                Err(BookingError::lookup_failure(reason))
            }
        }
    }
}

/// Best-effort writer of provisional records for freshly allocated barcodes
#[derive(Clone)]
pub struct ProvisionalRecorder {
    store: Arc<dyn ProvisionalRecordStore>,
    timeout: Duration,
}

impl fmt::Debug for ProvisionalRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionalRecorder")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ProvisionalRecorder {
    pub fn new(store: Arc<dyn ProvisionalRecordStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Record that `barcode` was allocated for `office`. Never fails.
    pub async fn record(
        &self,
        user_id: &str,
        office: &DestinationOffice,
        barcode: &Barcode,
    ) -> BestEffortOutcome {
        let request = ProvisionalRecordRequest {
            user_id: user_id.to_string(),
            rpo_address: office.address.clone(),
            phone: office.phone.clone(),
            post_code: office.code.clone(),
            rpo_name: office.name.clone(),
            barcode: barcode.to_string(),
            booking_status: status::PROVISIONAL.to_string(),
        };

        let result = bounded(
            services::PROVISIONAL_STORE,
            self.timeout,
            self.store.store_provisional(&request),
        )
        .await;

        match result {
            Ok(ack) if ack.is_success() => {
                debug!(barcode = %barcode, office_code = %office.code, "Provisional record stored");
                BestEffortOutcome::Succeeded
            }
            Ok(ack) => {
                let reason = format!(
                    "store answered {}: {}",
                    ack.reported_code(),
                    ack.reported_message("no message")
                );
                warn!(barcode = %barcode, reason = %reason, "Provisional record not stored");
                BestEffortOutcome::Failed(reason)
            }
            Err(e) => {
                warn!(barcode = %barcode, error = %e, "Provisional record not stored");
                BestEffortOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AckResponse, AllocationResponse, BarcodeCheckResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct FixedLookup(BookingResult<BarcodeCheckResponse>);

    #[async_trait]
    impl BarcodeLookupService for FixedLookup {
        async fn lookup(&self, _: &BarcodeCheckRequest) -> BookingResult<BarcodeCheckResponse> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct CountingAllocation {
        response: Option<AllocationResponse>,
        calls: Mutex<Vec<AllocationRequest>>,
    }

    #[async_trait]
    impl BarcodeAllocationService for CountingAllocation {
        async fn allocate(&self, request: &AllocationRequest) -> BookingResult<AllocationResponse> {
            self.calls.lock().push(request.clone());
            self.response
                .clone()
                .ok_or_else(|| BookingError::transport("barcode_allocation", "unreachable"))
        }
    }

    fn pool() -> PoolCredential {
        PoolCredential {
            user_id: "POOL".into(),
            password: "pw".into(),
            barcode_qty: 1,
            barcode_type: "DG".into(),
        }
    }

    fn resolver(
        lookup: BookingResult<BarcodeCheckResponse>,
        allocation: Arc<CountingAllocation>,
    ) -> BarcodeResolver {
        BarcodeResolver::new(
            Arc::new(FixedLookup(lookup)),
            allocation,
            pool(),
            Duration::from_secs(5),
        )
    }

    fn found(barcode: &str) -> BarcodeCheckResponse {
        BarcodeCheckResponse {
            status: Some("success".into()),
            status_code: Some("200".into()),
            barcode: Some(barcode.into()),
            ..Default::default()
        }
    }

    fn not_found() -> BarcodeCheckResponse {
        BarcodeCheckResponse {
            success: Some(false),
            status_code: Some("404".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lookup_hit_never_allocates() {
        let allocation = Arc::new(CountingAllocation::default());
        let resolved = resolver(Ok(found("8801234567890")), allocation.clone())
            .resolve("op-1", "1001")
            .await
            .unwrap();

        assert_eq!(resolved.barcode.as_str(), "8801234567890");
        assert_eq!(resolved.provenance, BarcodeProvenance::LookedUp);
        assert!(allocation.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_not_found_allocates_once_with_pool_identity() {
        let allocation = Arc::new(CountingAllocation {
            response: Some(AllocationResponse {
                barcode: Some("\"9901112223334\"".into()),
                ..Default::default()
            }),
            ..Default::default()
        });

        let resolved = resolver(Ok(not_found()), allocation.clone())
            .resolve("op-1", "1002")
            .await
            .unwrap();

        assert_eq!(resolved.barcode.as_str(), "9901112223334");
        assert_eq!(resolved.provenance, BarcodeProvenance::FreshlyAllocated);

        let calls = allocation.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].user_id, "POOL");
        assert_eq!(calls[0].barcode_type, "DG");
        assert_eq!(calls[0].barcode_qty, 1);
    }

    #[tokio::test]
    async fn test_http_404_rejection_is_expected_absence() {
        let allocation = Arc::new(CountingAllocation {
            response: Some(AllocationResponse {
                barcode: Some("9901112223335".into()),
                ..Default::default()
            }),
            ..Default::default()
        });

        let resolved = resolver(
            Err(BookingError::rejected("barcode_lookup", "404", "Not Found")),
            allocation.clone(),
        )
        .resolve("op-1", "1002")
        .await
        .unwrap();

        assert_eq!(resolved.provenance, BarcodeProvenance::FreshlyAllocated);
    }

    #[tokio::test]
    async fn test_lookup_reports_absence_as_value() {
        let allocation = Arc::new(CountingAllocation::default());
        let outcome = resolver(Ok(not_found()), allocation)
            .lookup("op-1", "1002")
            .await
            .unwrap();
        assert_eq!(outcome, LookupOutcome::NotAssigned);
    }

    #[tokio::test]
    async fn test_lookup_transport_failure_is_terminal() {
        let allocation = Arc::new(CountingAllocation::default());
        let result = resolver(
            Err(BookingError::transport("barcode_lookup", "connection refused")),
            allocation.clone(),
        )
        .resolve("op-1", "1001")
        .await;

        assert!(matches!(result, Err(BookingError::LookupFailure { .. })));
        assert!(allocation.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_allocation_without_barcode_is_lookup_failure() {
        let allocation = Arc::new(CountingAllocation {
            response: Some(AllocationResponse {
                barcode: Some("\"\"".into()),
                message: Some("Pool exhausted".into()),
                ..Default::default()
            }),
            ..Default::default()
        });

        let result = resolver(Ok(not_found()), allocation.clone())
            .resolve("op-1", "1002")
            .await;

        match result {
            Err(BookingError::LookupFailure { reason }) => assert_eq!(reason, "Pool exhausted"),
            other => panic!("expected lookup failure, got {other:?}"),
        }
        assert_eq!(allocation.calls.lock().len(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl ProvisionalRecordStore for FailingStore {
        async fn store_provisional(
            &self,
            _: &ProvisionalRecordRequest,
        ) -> BookingResult<AckResponse> {
            Ok(AckResponse {
                status_code: Some("500".into()),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_provisional_failure_is_best_effort() {
        let recorder = ProvisionalRecorder::new(Arc::new(FailingStore), Duration::from_secs(1));
        let office = DestinationOffice::new("1002", "JATRABARI", "RPO Jatrabari", "017");
        let outcome = recorder
            .record("op-1", &office, &Barcode::parse("9901112223334").unwrap())
            .await;
        assert!(matches!(outcome, BestEffortOutcome::Failed(reason) if reason.contains("500")));
    }

    #[test]
    fn test_pool_credential_debug_masks_password() {
        assert!(!format!("{:?}", pool()).contains("\"pw\""));
    }
}
