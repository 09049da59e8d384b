use serde::{Deserialize, Serialize};
use std::fmt;

/// Which critical-path step failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedStage {
    /// Barcode lookup and allocation both failed to produce a barcode
    Resolve,
    /// Booking submission was rejected or did not complete
    Submit,
    /// Booking succeeded but the passport record did not go through
    PassportSubmit,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "resolve"),
            Self::Submit => write!(f, "submit"),
            Self::PassportSubmit => write!(f, "passport_submit"),
        }
    }
}

impl std::str::FromStr for FailedStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resolve" => Ok(Self::Resolve),
            "submit" => Ok(Self::Submit),
            "passport_submit" => Ok(Self::PassportSubmit),
            _ => Err(format!("Invalid failed stage: {s}")),
        }
    }
}

/// Booking session workflow states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No office selected
    #[default]
    Idle,
    /// Office picked, barcode not yet resolved
    OfficeSelected,
    /// Lookup or allocation in flight
    ResolvingBarcode,
    /// A barcode is held and may be committed
    BarcodeReady,
    /// Operator opened scan mode
    Scanning,
    /// Booking submission in flight
    Submitting,
    /// Passport submission in flight
    PassportSubmitting,
    /// Session finished or cancelled
    Closed,
    /// The current attempt failed; retry or cancel
    Error { stage: FailedStage },
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// A backend call for this session is outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::ResolvingBarcode | Self::Submitting | Self::PassportSubmitting
        )
    }

    /// States in which scanner input is applied
    pub fn accepts_scan_input(&self) -> bool {
        matches!(
            self,
            Self::BarcodeReady
                | Self::Scanning
                | Self::Error {
                    stage: FailedStage::Resolve
                }
        )
    }

    /// States from which `commit` may start or resume
    pub fn allows_commit(&self) -> bool {
        matches!(
            self,
            Self::BarcodeReady
                | Self::Error {
                    stage: FailedStage::Submit | FailedStage::PassportSubmit
                }
        )
    }

    /// A new session may be opened
    pub fn allows_open(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::OfficeSelected => write!(f, "office_selected"),
            Self::ResolvingBarcode => write!(f, "resolving_barcode"),
            Self::BarcodeReady => write!(f, "barcode_ready"),
            Self::Scanning => write!(f, "scanning"),
            Self::Submitting => write!(f, "submitting"),
            Self::PassportSubmitting => write!(f, "passport_submitting"),
            Self::Closed => write!(f, "closed"),
            Self::Error { stage } => write!(f, "error:{stage}"),
        }
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(stage) = s.strip_prefix("error:") {
            return Ok(Self::Error {
                stage: stage.parse()?,
            });
        }

        match s {
            "idle" => Ok(Self::Idle),
            "office_selected" => Ok(Self::OfficeSelected),
            "resolving_barcode" => Ok(Self::ResolvingBarcode),
            "barcode_ready" => Ok(Self::BarcodeReady),
            "scanning" => Ok(Self::Scanning),
            "submitting" => Ok(Self::Submitting),
            "passport_submitting" => Ok(Self::PassportSubmitting),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Invalid session state: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_string_conversion() {
        assert_eq!(SessionState::BarcodeReady.to_string(), "barcode_ready");
        assert_eq!(
            "error:passport_submit".parse::<SessionState>().unwrap(),
            SessionState::Error {
                stage: FailedStage::PassportSubmit
            }
        );
        assert!("error:bogus".parse::<SessionState>().is_err());
        assert!("open".parse::<SessionState>().is_err());
    }

    #[test]
    fn test_scan_input_only_while_awaiting_barcode() {
        assert!(SessionState::BarcodeReady.accepts_scan_input());
        assert!(SessionState::Scanning.accepts_scan_input());
        assert!(SessionState::Error {
            stage: FailedStage::Resolve
        }
        .accepts_scan_input());
        assert!(!SessionState::Submitting.accepts_scan_input());
        assert!(!SessionState::Closed.accepts_scan_input());
        assert!(!SessionState::Error {
            stage: FailedStage::Submit
        }
        .accepts_scan_input());
    }

    #[test]
    fn test_in_flight_and_open_states() {
        assert!(SessionState::ResolvingBarcode.is_in_flight());
        assert!(SessionState::PassportSubmitting.is_in_flight());
        assert!(!SessionState::Scanning.is_in_flight());
        assert!(SessionState::Idle.allows_open());
        assert!(SessionState::Closed.allows_open());
        assert!(!SessionState::Error {
            stage: FailedStage::Resolve
        }
        .allows_open());
    }

    #[test]
    fn test_commit_states() {
        assert!(SessionState::BarcodeReady.allows_commit());
        assert!(SessionState::Error {
            stage: FailedStage::Submit
        }
        .allows_commit());
        assert!(!SessionState::Scanning.allows_commit());
        assert!(!SessionState::Error {
            stage: FailedStage::Resolve
        }
        .allows_commit());
    }

    #[test]
    fn test_state_serde() {
        let json = serde_json::to_string(&SessionState::PassportSubmitting).unwrap();
        assert_eq!(json, "\"passport_submitting\"");

        let error = SessionState::Error {
            stage: FailedStage::Submit,
        };
        let round: SessionState =
            serde_json::from_str(&serde_json::to_string(&error).unwrap()).unwrap();
        assert_eq!(round, error);
    }
}
