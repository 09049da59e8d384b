//! # Workflow Constants
//!
//! Policy constants and wire vocabulary shared by the booking fulfillment
//! workflow. Values that operators may need to tune are also exposed through
//! [`crate::config::BookingConfig`]; the constants here are the defaults.

use std::time::Duration;

/// Number of buffered characters that completes a scan.
///
/// This is a heuristic for the 13-digit symbology printed on ePassport
/// parcels, not a scanner protocol guarantee.
pub const SCAN_COMPLETION_LENGTH: usize = 13;

/// Largest gap between keystrokes still attributed to a hardware scanner
pub const SCANNER_MAX_KEYSTROKE_GAP: Duration = Duration::from_millis(50);

/// How long the success notice stays up before it dismisses itself
pub const SUCCESS_NOTICE_DISMISS_AFTER: Duration = Duration::from_secs(3);

/// Bound applied to every backend call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Workflow events published on the [`crate::events::EventPublisher`]
pub mod events {
    pub const SESSION_OPENED: &str = "booking.session.opened";
    pub const SESSION_CLOSED: &str = "booking.session.closed";
    pub const BARCODE_RESOLVED: &str = "booking.barcode.resolved";
    pub const SCAN_COMPLETED: &str = "booking.scan.completed";
    pub const BOOKING_COMMITTED: &str = "booking.committed";
    pub const NOTIFICATION_SHOWN: &str = "booking.notification.shown";
    pub const NOTIFICATION_DISMISSED: &str = "booking.notification.dismissed";
    pub const PASSPORT_DISCREPANCY: &str = "booking.passport.discrepancy";
    pub const LICENCE_CHECK_COMPLETED: &str = "booking.licence_check.completed";
    pub const LICENCE_CHECK_FAILED: &str = "booking.licence_check.failed";
}

/// Status vocabulary spoken by the backend services
pub mod status {
    pub const SUCCESS: &str = "success";
    pub const OK_CODE: &str = "200";
    pub const NOT_FOUND_CODE: &str = "404";
    /// `booking_status` of a provisional record
    pub const PROVISIONAL: &str = "Init";
    /// `booking_status` of a submitted ePassport item
    pub const BOOKED: &str = "Booked";
}

/// Service names used in logs and errors
pub mod services {
    pub const BARCODE_LOOKUP: &str = "barcode_lookup";
    pub const BARCODE_ALLOCATION: &str = "barcode_allocation";
    pub const PROVISIONAL_STORE: &str = "provisional_store";
    pub const BOOKING_SUBMIT: &str = "booking_submit";
    pub const PASSPORT_SUBMIT: &str = "passport_submit";
    pub const LICENCE_CHECK: &str = "licence_check";
}

/// Defaults for the shared allocation pool
pub mod allocation {
    pub const DEFAULT_POOL_USER_ID: &str = "BTD001";
    pub const DEFAULT_BARCODE_QTY: u32 = 1;
    pub const DEFAULT_BARCODE_TYPE: &str = "DG";
}

/// Fixed-origin shipment defaults for the Submission Record
pub mod shipment {
    pub const USER_GROUP: &str = "POSTAGE_POS";
    pub const BRANCH_CODE: &str = "121500";
    pub const SHIFT: &str = "D";
    pub const HANDHELD_DEVICE: &str = "9";
    pub const SERVICE_TYPE: &str = "Parcel";
    pub const ITEM_WEIGHT_GRAMS: u32 = 1000;
    pub const VAS_TYPE: &str = "GEP";
    pub const DELIVERY_BRANCH_CODE: &str = "0";
    pub const SENDER_NAME: &str = "Passport Personalization Complex";
    pub const SENDER_CONTACT: &str = "01733393350";
    pub const SENDER_ADDRESS: &str = "Plot-4, Road-1, Sector-16(i), Diabari, Uttara, Dhaka-1711";
    pub const ITEM_DESCRIPTION: &str = "ePassport_RPO";
}
