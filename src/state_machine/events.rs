use serde::{Deserialize, Serialize};

/// Events that drive booking session transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// Operator picked a destination office
    SelectOffice,
    /// Barcode resolution started (automatically or as a retry)
    RequestResolve,
    BarcodeResolved,
    ResolveFailed,
    /// Operator opened scan mode, or scanner input auto-started it
    StartScan,
    ScanCompleted,
    /// Scan mode left with the previous barcode still held
    ScanStopped,
    /// Scan mode left with no barcode to fall back on
    ScanAbandoned,
    /// Operator committed the booking
    Commit,
    BookingAccepted,
    BookingFailed,
    /// Passport step finished; a rejection also settles it
    PassportSettled,
    /// Passport call did not complete
    PassportFailed,
    Cancel,
}

impl SessionEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SelectOffice => "select_office",
            Self::RequestResolve => "request_resolve",
            Self::BarcodeResolved => "barcode_resolved",
            Self::ResolveFailed => "resolve_failed",
            Self::StartScan => "start_scan",
            Self::ScanCompleted => "scan_completed",
            Self::ScanStopped => "scan_stopped",
            Self::ScanAbandoned => "scan_abandoned",
            Self::Commit => "commit",
            Self::BookingAccepted => "booking_accepted",
            Self::BookingFailed => "booking_failed",
            Self::PassportSettled => "passport_settled",
            Self::PassportFailed => "passport_failed",
            Self::Cancel => "cancel",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PassportSettled | Self::Cancel)
    }
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.event_type())
    }
}
