//! # Booking Session
//!
//! Orchestrates one operator interaction: select an office, resolve a
//! barcode, optionally re-scan it, then commit the booking and the passport
//! record.
//!
//! ## Concurrency
//!
//! All operations take `&self`; share the session through an `Arc`. Session
//! data sits behind a `parking_lot::Mutex` that is never held across an
//! await. Two rules keep overlapping calls safe:
//!
//! - The state itself is the in-flight flag. Calling `resolve_barcode` while
//!   resolving, or `commit` while submitting, returns the current state and
//!   does nothing else.
//! - Every open and cancel bumps a generation counter. A backend result that
//!   comes back under an older generation is discarded.

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::barcode::{Barcode, BarcodeProvenance};
use crate::config::{BookingConfig, ShipmentConfig};
use crate::constants::events;
use crate::directory::DestinationOffice;
use crate::error::{BestEffortOutcome, BookingError, BookingResult};
use crate::events::EventPublisher;
use crate::licence::LicenceCheckNotifier;
use crate::logging::{log_booking_operation, log_error};
use crate::resolver::{BarcodeResolver, PoolCredential, ProvisionalRecorder};
use crate::scanner::{ScanDetector, ScanFeed, ScanPolicy};
use crate::services::{
    BarcodeAllocationService, BarcodeLookupService, BookingService, HttpBackend,
    LicenceCheckService, PassportService, ProvisionalRecordStore,
};
use crate::state_machine::{SessionEvent, SessionState, SessionStateMachine};
use crate::submission::{
    BookingFacts, BookingSubmitter, CommitResult, PassportSubmitter, SubmissionRecord,
};

/// The backend collaborators a session drives
#[derive(Clone)]
pub struct BookingServices {
    pub lookup: Arc<dyn BarcodeLookupService>,
    pub allocation: Arc<dyn BarcodeAllocationService>,
    pub provisional_store: Arc<dyn ProvisionalRecordStore>,
    pub booking: Arc<dyn BookingService>,
    pub passport: Arc<dyn PassportService>,
    pub licence: Arc<dyn LicenceCheckService>,
}

impl BookingServices {
    /// Route every collaborator through one HTTP backend
    pub fn from_backend(backend: Arc<HttpBackend>) -> Self {
        Self {
            lookup: backend.clone(),
            allocation: backend.clone(),
            provisional_store: backend.clone(),
            booking: backend.clone(),
            passport: backend.clone(),
            licence: backend,
        }
    }
}

impl fmt::Debug for BookingServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingServices").finish_non_exhaustive()
    }
}

/// Read-only view of a session for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Option<String>,
    pub state: SessionState,
    pub office: Option<DestinationOffice>,
    pub barcode: Option<Barcode>,
    pub provenance: Option<BarcodeProvenance>,
    pub scan_buffer: String,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub warning_message: Option<String>,
}

#[derive(Debug)]
struct SessionInner {
    machine: SessionStateMachine,
    generation: u64,
    session_id: Option<String>,
    office: Option<DestinationOffice>,
    barcode: Option<Barcode>,
    provenance: Option<BarcodeProvenance>,
    scanner: ScanDetector,
    /// Accepted booking awaiting its passport record
    pending_commit: Option<CommitResult>,
    error_message: Option<String>,
    success_message: Option<String>,
    warning_message: Option<String>,
}

impl SessionInner {
    fn new(policy: ScanPolicy) -> Self {
        Self {
            machine: SessionStateMachine::new(),
            generation: 0,
            session_id: None,
            office: None,
            barcode: None,
            provenance: None,
            scanner: ScanDetector::new(policy),
            pending_commit: None,
            error_message: None,
            success_message: None,
            warning_message: None,
        }
    }

    fn state(&self) -> SessionState {
        self.machine.current_state()
    }

    fn clear_messages(&mut self) {
        self.error_message = None;
        self.success_message = None;
        self.warning_message = None;
    }

    /// Drop everything tied to the closed session except the messages
    fn clear_workflow(&mut self) {
        self.office = None;
        self.barcode = None;
        self.provenance = None;
        self.pending_commit = None;
        self.scanner.reset();
    }

    /// Close scan mode and discard any partial scan. Falls back to the held
    /// barcode, or to the failed resolve when there is none.
    fn leave_scan_mode(&mut self) -> BookingResult<SessionState> {
        let state = match self.state() {
            SessionState::Scanning if self.barcode.is_some() => {
                self.machine.transition(SessionEvent::ScanStopped)?
            }
            SessionState::Scanning => self.machine.transition(SessionEvent::ScanAbandoned)?,
            state => state,
        };
        self.scanner.reset();
        Ok(state)
    }

    fn office_code(&self) -> Option<&str> {
        self.office.as_ref().map(|o| o.code.as_str())
    }
}

enum CommitStep {
    Booking(Box<SubmissionRecord>),
    PassportOnly(CommitResult),
}

/// One operator's booking interaction
pub struct BookingSession {
    user_id: String,
    resolver: BarcodeResolver,
    recorder: ProvisionalRecorder,
    booking: BookingSubmitter,
    passport: PassportSubmitter,
    licence: LicenceCheckNotifier,
    publisher: EventPublisher,
    shipment: ShipmentConfig,
    success_dismiss_after: Duration,
    inner: Mutex<SessionInner>,
}

impl fmt::Debug for BookingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BookingSession")
            .field("user_id", &self.user_id)
            .field("inner", &*self.inner.lock())
            .finish_non_exhaustive()
    }
}

impl BookingSession {
    pub fn new(
        user_id: impl Into<String>,
        services: BookingServices,
        config: &BookingConfig,
        publisher: EventPublisher,
    ) -> Self {
        let timeout = config.endpoints.request_timeout();

        Self {
            user_id: user_id.into(),
            resolver: BarcodeResolver::new(
                services.lookup,
                services.allocation,
                PoolCredential::from(&config.allocation),
                timeout,
            ),
            recorder: ProvisionalRecorder::new(services.provisional_store, timeout),
            booking: BookingSubmitter::new(services.booking, timeout),
            passport: PassportSubmitter::new(services.passport, timeout),
            licence: LicenceCheckNotifier::new(services.licence, publisher.clone(), timeout),
            publisher,
            shipment: config.shipment.clone(),
            success_dismiss_after: config.notifications.success_dismiss_after(),
            inner: Mutex::new(SessionInner::new(ScanPolicy::from(&config.scan))),
        }
    }

    /// Build a session that talks to the configured HTTP services
    pub fn with_http_backend(
        user_id: impl Into<String>,
        config: &BookingConfig,
        publisher: EventPublisher,
    ) -> BookingResult<Self> {
        config.validate()?;
        let backend = Arc::new(HttpBackend::new(&config.endpoints)?);
        Ok(Self::new(
            user_id,
            BookingServices::from_backend(backend),
            config,
            publisher,
        ))
    }

    /// Open a session for `office` and resolve its barcode.
    ///
    /// Allowed from `Idle` or `Closed`; every field of the previous session is
    /// reset and a fresh session id is assigned.
    pub async fn open_session(&self, office: DestinationOffice) -> BookingResult<SessionState> {
        let session_id = {
            let mut inner = self.inner.lock();
            inner.machine.transition(SessionEvent::SelectOffice)?;

            let session_id = Uuid::new_v4().to_string();
            inner.generation += 1;
            inner.session_id = Some(session_id.clone());
            inner.clear_workflow();
            inner.clear_messages();
            inner.office = Some(office.clone());
            session_id
        };

        log_booking_operation(
            "open_session",
            Some(&session_id),
            Some(&office.code),
            None,
            "opened",
            Some(&office.name),
        );
        self.publisher.publish(
            events::SESSION_OPENED,
            json!({ "session_id": session_id, "office_code": office.code }),
        );

        self.resolve_barcode().await
    }

    /// Resolve the operative barcode for the selected office.
    ///
    /// Runs automatically on open; call again from `Error(Resolve)` to retry.
    /// A freshly allocated barcode is provisionally recorded before it is
    /// offered; a failed record only raises a warning.
    pub async fn resolve_barcode(&self) -> BookingResult<SessionState> {
        let (generation, session_id, office) = {
            let mut inner = self.inner.lock();
            if inner.state() == SessionState::ResolvingBarcode {
                debug!("Barcode resolution already in flight");
                return Ok(inner.state());
            }

            let office = inner
                .office
                .clone()
                .ok_or_else(|| BookingError::Precondition("Select an office first".to_string()))?;
            if inner.barcode.is_none() {
                inner.leave_scan_mode()?;
            }
            inner.machine.transition(SessionEvent::RequestResolve)?;
            inner.error_message = None;
            inner.warning_message = None;
            inner.barcode = None;
            inner.provenance = None;
            inner.scanner.reset();
            (inner.generation, inner.session_id.clone(), office)
        };

        let resolved = self.resolver.resolve(&self.user_id, &office.code).await;

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                let mut inner = self.inner.lock();
                if inner.generation != generation {
                    debug!(error = %e, "Discarding resolve failure for a closed session");
                    return Ok(inner.state());
                }
                let state = inner.machine.transition(SessionEvent::ResolveFailed)?;
                inner.error_message = Some(e.user_message());
                log_error("booking_session", "resolve_barcode", &e.to_string(), session_id.as_deref());
                return Ok(state);
            }
        };

        let recorded = if resolved.provenance.requires_provisional_record() && self.is_current(generation) {
            self.recorder
                .record(&self.user_id, &office, &resolved.barcode)
                .await
        } else {
            BestEffortOutcome::Succeeded
        };

        let state = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(barcode = %resolved.barcode, "Discarding barcode resolved for a closed session");
                return Ok(inner.state());
            }
            let state = inner.machine.transition(SessionEvent::BarcodeResolved)?;
            inner.barcode = Some(resolved.barcode.clone());
            inner.provenance = Some(resolved.provenance);
            if let BestEffortOutcome::Failed(reason) = &recorded {
                warn!(
                    barcode = %resolved.barcode,
                    reason = %reason,
                    "Continuing without provisional record"
                );
                inner.warning_message = Some(format!(
                    "Barcode {} could not be reserved in advance; you can still continue.",
                    resolved.barcode
                ));
            }
            state
        };

        log_booking_operation(
            "resolve_barcode",
            session_id.as_deref(),
            Some(&office.code),
            Some(resolved.barcode.as_str()),
            "resolved",
            Some(&resolved.provenance.to_string()),
        );
        self.publisher.publish(
            events::BARCODE_RESOLVED,
            json!({
                "session_id": session_id,
                "office_code": office.code,
                "barcode": resolved.barcode,
                "provenance": resolved.provenance,
            }),
        );

        Ok(state)
    }

    /// Open scan mode, discarding any partial scan
    pub fn start_scan(&self) -> BookingResult<SessionState> {
        let mut inner = self.inner.lock();
        let state = inner.machine.transition(SessionEvent::StartScan)?;
        inner.scanner.start();
        Ok(state)
    }

    /// Leave scan mode without a completed scan.
    ///
    /// The partial buffer is discarded. The session returns to `BarcodeReady`
    /// when a barcode is held, otherwise to `Error(Resolve)` so the resolve
    /// can be retried.
    pub fn stop_scan(&self) -> BookingResult<SessionState> {
        let mut inner = self.inner.lock();
        if !inner.state().accepts_scan_input() {
            return Err(BookingError::InvalidTransition {
                from: inner.state().to_string(),
                event: SessionEvent::ScanStopped.to_string(),
            });
        }
        let state = inner.leave_scan_mode()?;
        debug!(state = %state, "Scan mode closed");
        Ok(state)
    }

    /// Apply one character from the scanner or keyboard.
    ///
    /// Input outside the barcode-awaiting states is ignored. A completed scan
    /// replaces the session's barcode.
    pub fn feed_scan_input(&self, ch: char) -> ScanFeed {
        self.feed_scan_input_at(ch, tokio::time::Instant::now())
    }

    pub fn feed_scan_input_at(&self, ch: char, at: tokio::time::Instant) -> ScanFeed {
        let (feed, session_id, office_code) = {
            let mut inner = self.inner.lock();
            if !inner.state().accepts_scan_input() {
                debug!(state = %inner.state(), "Ignoring scan input");
                return ScanFeed::Ignored;
            }

            let feed = inner.scanner.feed_at(ch, at);
            let completion = match &feed {
                ScanFeed::Ignored => None,
                ScanFeed::Accepted { auto_started } => {
                    if *auto_started && inner.state() != SessionState::Scanning {
                        // Scanners do not wait for the operator to press "Scan"
                        if let Err(e) = inner.machine.transition(SessionEvent::StartScan) {
                            warn!(error = %e, "Could not enter scan mode");
                        }
                    }
                    None
                }
                ScanFeed::Completed(completion) => Some(completion.barcode.clone()),
            };
            let Some(barcode) = completion else {
                return feed;
            };

            if let Err(e) = inner.machine.transition(SessionEvent::ScanCompleted) {
                warn!(error = %e, "Dropping completed scan");
                return ScanFeed::Ignored;
            }
            inner.barcode = Some(barcode);
            inner.provenance = Some(BarcodeProvenance::Scanned);
            inner.error_message = None;
            (
                feed,
                inner.session_id.clone(),
                inner.office_code().map(str::to_string),
            )
        };

        if let Some(completion) = feed.completion() {
            info!(
                session_id = ?session_id,
                barcode = %completion.barcode,
                source = %completion.source,
                "Scan completed"
            );
            self.publisher.publish(
                events::SCAN_COMPLETED,
                json!({
                    "session_id": session_id,
                    "office_code": office_code,
                    "barcode": completion.barcode,
                    "source": completion.source,
                }),
            );
        }

        feed
    }

    /// Commit the booking and then the passport record.
    ///
    /// From `Error(PassportSubmit)` only the passport step is retried, reusing
    /// the accepted booking. Handled failures are reported through the
    /// returned state and the session messages; `Err` means the call itself
    /// was not allowed.
    pub async fn commit(&self) -> BookingResult<SessionState> {
        let (generation, session_id, step) = {
            let mut inner = self.inner.lock();
            if matches!(
                inner.state(),
                SessionState::Submitting | SessionState::PassportSubmitting
            ) {
                debug!("Commit already in flight");
                return Ok(inner.state());
            }

            let barcode = inner.barcode.clone().ok_or_else(|| {
                BookingError::Precondition("A barcode is required before committing".to_string())
            })?;
            let office = inner
                .office
                .clone()
                .ok_or_else(|| BookingError::Precondition("Select an office first".to_string()))?;
            // An unfinished scan never blocks committing the held barcode
            inner.leave_scan_mode()?;
            if !inner.state().allows_commit() {
                return Err(BookingError::InvalidTransition {
                    from: inner.state().to_string(),
                    event: SessionEvent::Commit.to_string(),
                });
            }

            let step = match &inner.pending_commit {
                Some(commit) if inner.state().is_error() => CommitStep::PassportOnly(commit.clone()),
                _ => CommitStep::Booking(Box::new(SubmissionRecord::new(
                    self.user_id.clone(),
                    &barcode,
                    &office,
                    &self.shipment,
                ))),
            };

            inner.machine.transition(SessionEvent::Commit)?;
            inner.error_message = None;
            inner.scanner.reset();
            (inner.generation, inner.session_id.clone(), step)
        };

        let commit = match step {
            CommitStep::PassportOnly(commit) => commit,
            CommitStep::Booking(record) => match self.booking.submit(&record).await {
                Ok(commit) => {
                    let mut inner = self.inner.lock();
                    if inner.generation != generation {
                        warn!(item_id = %commit.item_id, "Booking accepted after the session closed");
                        return Ok(inner.state());
                    }
                    inner.machine.transition(SessionEvent::BookingAccepted)?;
                    inner.pending_commit = Some(commit.clone());
                    drop(inner);

                    log_booking_operation(
                        "commit",
                        session_id.as_deref(),
                        None,
                        Some(commit.barcode.as_str()),
                        "booked",
                        Some(&commit.item_id),
                    );
                    self.publisher.publish(
                        events::BOOKING_COMMITTED,
                        json!({
                            "session_id": session_id,
                            "barcode": commit.barcode,
                            "item_id": commit.item_id,
                        }),
                    );
                    commit
                }
                Err(e) => {
                    let mut inner = self.inner.lock();
                    if inner.generation != generation {
                        return Ok(inner.state());
                    }
                    let state = inner.machine.transition(SessionEvent::BookingFailed)?;
                    inner.error_message = Some(e.user_message());
                    log_error("booking_session", "commit", &e.to_string(), session_id.as_deref());
                    return Ok(state);
                }
            },
        };

        let facts = BookingFacts::from(&self.shipment);
        let outcome = self
            .passport
            .submit_passport(&self.user_id, &commit, &facts)
            .await;

        self.settle_passport(generation, session_id, commit, outcome)
    }

    fn settle_passport(
        &self,
        generation: u64,
        session_id: Option<String>,
        commit: CommitResult,
        outcome: BookingResult<()>,
    ) -> BookingResult<SessionState> {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            debug!(item_id = %commit.item_id, "Discarding passport result for a closed session");
            return Ok(inner.state());
        }

        match outcome {
            Ok(()) => {
                let state = inner.machine.transition(SessionEvent::PassportSettled)?;
                let message = format!("Booking {} confirmed", commit.barcode);
                inner.success_message = Some(message.clone());
                inner.clear_workflow();
                drop(inner);

                log_booking_operation(
                    "commit",
                    session_id.as_deref(),
                    None,
                    Some(commit.barcode.as_str()),
                    "completed",
                    Some(&commit.item_id),
                );
                self.publisher.publish(
                    events::NOTIFICATION_SHOWN,
                    json!({ "session_id": session_id, "message": message }),
                );
                self.publish_closed(session_id.as_deref(), "completed");
                self.schedule_licence_check(session_id.unwrap_or_default());
                Ok(state)
            }
            Err(e @ BookingError::Rejected { .. }) => {
                // The booking stands; no compensating rollback exists
                let state = inner.machine.transition(SessionEvent::PassportSettled)?;
                inner.warning_message = Some(format!(
                    "Booking {} was recorded, but the passport record was not accepted: {}",
                    commit.barcode,
                    e.user_message()
                ));
                inner.clear_workflow();
                drop(inner);

                warn!(
                    session_id = ?session_id,
                    item_id = %commit.item_id,
                    error = %e,
                    "Passport record rejected after booking was accepted"
                );
                self.publisher.publish(
                    events::PASSPORT_DISCREPANCY,
                    json!({
                        "session_id": session_id,
                        "barcode": commit.barcode,
                        "item_id": commit.item_id,
                        "reason": e.to_string(),
                    }),
                );
                self.publish_closed(session_id.as_deref(), "passport_discrepancy");
                Ok(state)
            }
            Err(e) => {
                let state = inner.machine.transition(SessionEvent::PassportFailed)?;
                inner.error_message = Some(e.user_message());
                log_error("booking_session", "submit_passport", &e.to_string(), session_id.as_deref());
                Ok(state)
            }
        }
    }

    /// Dismiss the success notice after the configured delay, then run the
    /// licence check
    fn schedule_licence_check(&self, session_id: String) {
        let delay = self.success_dismiss_after;
        let publisher = self.publisher.clone();
        let licence = self.licence.clone();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            publisher.publish(
                events::NOTIFICATION_DISMISSED,
                json!({ "session_id": session_id }),
            );
            licence.check(&session_id).await;
        });
    }

    /// Discard the session. Steps already committed to the backend stay
    /// committed; in-flight results arriving later are dropped.
    pub fn cancel(&self) -> SessionState {
        let (previous, session_id) = {
            let mut inner = self.inner.lock();
            let previous = inner.state();
            inner.generation += 1;
            if let Err(e) = inner.machine.transition(SessionEvent::Cancel) {
                warn!(error = %e, "Cancel transition refused");
            }
            inner.clear_workflow();
            inner.clear_messages();
            (previous, inner.session_id.clone())
        };

        if previous.is_in_flight() {
            info!(state = %previous, "Cancelling with a backend call outstanding; its result will be discarded");
        }
        if !previous.allows_open() {
            log_booking_operation("cancel", session_id.as_deref(), None, None, "cancelled", Some(&previous.to_string()));
            self.publish_closed(session_id.as_deref(), "cancelled");
        }

        SessionState::Closed
    }

    fn publish_closed(&self, session_id: Option<&str>, reason: &str) {
        self.publisher.publish(
            events::SESSION_CLOSED,
            json!({ "session_id": session_id, "reason": reason }),
        );
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.lock().generation == generation
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.inner.lock().session_id.clone()
    }

    pub fn office(&self) -> Option<DestinationOffice> {
        self.inner.lock().office.clone()
    }

    pub fn barcode(&self) -> Option<Barcode> {
        self.inner.lock().barcode.clone()
    }

    pub fn barcode_provenance(&self) -> Option<BarcodeProvenance> {
        self.inner.lock().provenance
    }

    pub fn scan_buffer(&self) -> String {
        self.inner.lock().scanner.buffer().to_string()
    }

    pub fn is_scan_active(&self) -> bool {
        self.inner.lock().scanner.is_active()
    }

    pub fn error_message(&self) -> Option<String> {
        self.inner.lock().error_message.clone()
    }

    pub fn success_message(&self) -> Option<String> {
        self.inner.lock().success_message.clone()
    }

    pub fn warning_message(&self) -> Option<String> {
        self.inner.lock().warning_message.clone()
    }

    /// Most relevant message for the operator: error, then warning, then success
    pub fn last_message(&self) -> Option<String> {
        let inner = self.inner.lock();
        inner
            .error_message
            .clone()
            .or_else(|| inner.warning_message.clone())
            .or_else(|| inner.success_message.clone())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock();
        SessionSnapshot {
            session_id: inner.session_id.clone(),
            state: inner.state(),
            office: inner.office.clone(),
            barcode: inner.barcode.clone(),
            provenance: inner.provenance,
            scan_buffer: inner.scanner.buffer().to_string(),
            error_message: inner.error_message.clone(),
            success_message: inner.success_message.clone(),
            warning_message: inner.warning_message.clone(),
        }
    }
}
