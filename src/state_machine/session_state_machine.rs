use tracing::debug;

use super::{events::SessionEvent, states::FailedStage, states::SessionState};
use crate::error::{BookingError, BookingResult};

/// Determine the target state for `event` in `current`.
///
/// Pure: no side effects, and every pair not listed is an invalid transition.
pub fn determine_target_state(
    current: SessionState,
    event: SessionEvent,
) -> BookingResult<SessionState> {
    use SessionEvent as E;
    use SessionState as S;

    let target = match (current, event) {
        // Opening
        (from, E::SelectOffice) if from.allows_open() => S::OfficeSelected,

        // Resolution
        (
            S::OfficeSelected
            | S::Error {
                stage: FailedStage::Resolve,
            },
            E::RequestResolve,
        ) => S::ResolvingBarcode,
        (S::ResolvingBarcode, E::BarcodeResolved) => S::BarcodeReady,
        (S::ResolvingBarcode, E::ResolveFailed) => S::Error {
            stage: FailedStage::Resolve,
        },

        // Scan loop
        (from, E::StartScan) if from.accepts_scan_input() => S::Scanning,
        (from, E::ScanCompleted) if from.accepts_scan_input() => S::BarcodeReady,
        (S::Scanning, E::ScanStopped) => S::BarcodeReady,
        // Scan mode without a barcode is only reachable from a failed resolve
        (S::Scanning, E::ScanAbandoned) => S::Error {
            stage: FailedStage::Resolve,
        },

        // Commit
        (
            S::BarcodeReady
            | S::Error {
                stage: FailedStage::Submit,
            },
            E::Commit,
        ) => S::Submitting,
        (
            S::Error {
                stage: FailedStage::PassportSubmit,
            },
            E::Commit,
        ) => S::PassportSubmitting,
        (S::Submitting, E::BookingAccepted) => S::PassportSubmitting,
        (S::Submitting, E::BookingFailed) => S::Error {
            stage: FailedStage::Submit,
        },
        (S::PassportSubmitting, E::PassportSettled) => S::Closed,
        (S::PassportSubmitting, E::PassportFailed) => S::Error {
            stage: FailedStage::PassportSubmit,
        },

        // Cancel is always allowed
        (_, E::Cancel) => S::Closed,

        (from, _) => {
            return Err(BookingError::InvalidTransition {
                from: from.to_string(),
                event: event.to_string(),
            })
        }
    };

    Ok(target)
}

/// Holder of the current session state; all changes go through
/// [`determine_target_state`]
#[derive(Debug, Clone, Default)]
pub struct SessionStateMachine {
    current: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state(&self) -> SessionState {
        self.current
    }

    /// Apply `event`, leaving the state untouched when the transition is invalid
    pub fn transition(&mut self, event: SessionEvent) -> BookingResult<SessionState> {
        let target = determine_target_state(self.current, event)?;
        debug!(
            from = %self.current,
            to = %target,
            event = event.event_type(),
            "Session state transition"
        );
        self.current = target;
        Ok(target)
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }
}
