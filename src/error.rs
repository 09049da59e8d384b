use thiserror::Error;

/// Errors surfaced by the booking fulfillment workflow.
///
/// Only the critical path (resolve, submit, passport submit) produces these.
/// Best-effort side paths report through [`BestEffortOutcome`] instead and
/// never propagate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// The call did not complete: connect error, non-2xx HTTP status,
    /// undecodable body or an elapsed timeout.
    #[error("Transport failure calling {service}: {reason}")]
    Transport { service: String, reason: String },

    /// The backend explicitly refused the request.
    #[error("{service} rejected the request ({status_code}): {message}")]
    Rejected {
        service: String,
        status_code: String,
        message: String,
    },

    /// No barcode could be looked up or allocated for the office.
    #[error("Barcode lookup failed: {reason}")]
    LookupFailure { reason: String },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Invalid transition from {from} on {event}")]
    InvalidTransition { from: String, event: String },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl BookingError {
    pub fn transport(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            service: service.into(),
            reason: reason.into(),
        }
    }

    pub fn rejected(
        service: impl Into<String>,
        status_code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            service: service.into(),
            status_code: status_code.into(),
            message: message.into(),
        }
    }

    pub fn lookup_failure(reason: impl Into<String>) -> Self {
        Self::LookupFailure {
            reason: reason.into(),
        }
    }

    /// Whether re-invoking the same operation unchanged may succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::LookupFailure { .. })
    }

    /// Text shown to the operator.
    ///
    /// Rejections are shown verbatim with the backend status code; transport
    /// problems collapse to a generic retry prompt.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport { .. } => {
                "The service could not be reached. Please retry.".to_string()
            }
            Self::Rejected {
                status_code,
                message,
                ..
            } => format!("{message} (code {status_code})"),
            Self::LookupFailure { .. } => {
                "No barcode is available for this office. Please retry.".to_string()
            }
            Self::Precondition(msg) => msg.clone(),
            Self::InvalidTransition { .. } => {
                "That action is not available right now.".to_string()
            }
            Self::Configuration(msg) => format!("Configuration error: {msg}"),
        }
    }
}

/// Result of a side path whose failure must never block the workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BestEffortOutcome {
    Succeeded,
    Failed(String),
}

impl BestEffortOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

pub type BookingResult<T> = std::result::Result<T, BookingError>;
