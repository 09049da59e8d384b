//! # Booking Configuration
//!
//! Typed configuration for the booking fulfillment workflow: backend endpoints,
//! the shared allocation pool credential, scanner policy, notification timing
//! and the fixed-origin shipment constants.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use booking_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let timeout = manager.config().endpoints.request_timeout();
//! let threshold = manager.config().scan.completion_length;
//! # Ok(())
//! # }
//! ```

pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;
use crate::error::{BookingError, BookingResult};

pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/booking-config.yaml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Backend service locations and transport settings
    pub endpoints: EndpointConfig,

    /// Shared pool identity used for missing-barcode allocation
    pub allocation: AllocationConfig,

    /// ScanStream Detector policy
    pub scan: ScanConfig,

    /// Operator notification timing
    pub notifications: NotificationConfig,

    /// Fixed-origin shipment metadata for the Submission Record
    pub shipment: ShipmentConfig,
}

impl BookingConfig {
    /// Reject configurations the workflow cannot run with
    pub fn validate(&self) -> BookingResult<()> {
        for (name, url) in [
            ("endpoints.dms_base_url", &self.endpoints.dms_base_url),
            (
                "endpoints.allocation_base_url",
                &self.endpoints.allocation_base_url,
            ),
            ("endpoints.booking_base_url", &self.endpoints.booking_base_url),
        ] {
            if url.trim().is_empty() {
                return Err(BookingError::Configuration(format!("{name} must not be empty")));
            }
        }

        if self.endpoints.request_timeout_ms == 0 {
            return Err(BookingError::Configuration(
                "endpoints.request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.scan.completion_length == 0 {
            return Err(BookingError::Configuration(
                "scan.completion_length must be greater than zero".to_string(),
            ));
        }

        if self.allocation.pool_user_id.trim().is_empty() {
            return Err(BookingError::Configuration(
                "allocation.pool_user_id must not be empty".to_string(),
            ));
        }

        if self.allocation.barcode_qty == 0 {
            return Err(BookingError::Configuration(
                "allocation.barcode_qty must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// Host serving lookup, provisional store, passport submit and licence check
    pub dms_base_url: String,
    /// Host serving missing-barcode allocation
    pub allocation_base_url: String,
    /// Host serving booking submission
    pub booking_base_url: String,
    pub lookup_path: String,
    pub allocation_path: String,
    pub provisional_store_path: String,
    pub booking_path: String,
    pub passport_path: String,
    pub licence_check_path: String,
    /// Bound applied to every backend call
    pub request_timeout_ms: u64,
    /// Operator bearer credential attached to authenticated calls
    pub bearer_token: Option<String>,
}

impl EndpointConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            dms_base_url: "https://brta2.bpodms.gov.bd".to_string(),
            allocation_base_url: "https://brta2.bpodms.gov.bd".to_string(),
            booking_base_url: "https://bpodms.ekdak.com".to_string(),
            lookup_path: "/api/epassportchack".to_string(),
            allocation_path: "/api/passport_get_barcode".to_string(),
            provisional_store_path: "/api/epassportstore".to_string(),
            booking_path: "/app_dommail_internal_api/public/ws/bookingreq".to_string(),
            passport_path: "/api/epassportsubmit".to_string(),
            licence_check_path: "/api/brtabookinglicencecheck".to_string(),
            request_timeout_ms: constants::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64,
            bearer_token: None,
        }
    }
}

/// Shared pool credential for the allocation fallback
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AllocationConfig {
    pub pool_user_id: String,
    /// Never logged; supply through `BOOKING__ALLOCATION__POOL_PASSWORD`
    pub pool_password: String,
    pub barcode_qty: u32,
    pub barcode_type: String,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            pool_user_id: constants::allocation::DEFAULT_POOL_USER_ID.to_string(),
            pool_password: String::new(),
            barcode_qty: constants::allocation::DEFAULT_BARCODE_QTY,
            barcode_type: constants::allocation::DEFAULT_BARCODE_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Buffered characters that complete a scan
    pub completion_length: usize,
    /// Largest inter-keystroke gap attributed to a hardware scanner
    pub max_keystroke_gap_ms: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            completion_length: constants::SCAN_COMPLETION_LENGTH,
            max_keystroke_gap_ms: constants::SCANNER_MAX_KEYSTROKE_GAP.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub success_dismiss_ms: u64,
}

impl NotificationConfig {
    pub fn success_dismiss_after(&self) -> Duration {
        Duration::from_millis(self.success_dismiss_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            success_dismiss_ms: constants::SUCCESS_NOTICE_DISMISS_AFTER.as_millis() as u64,
        }
    }
}

/// Shipment constants flattened into every Submission Record.
///
/// This product does not compute charges, so every price field defaults to
/// zero.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShipmentConfig {
    pub user_group: String,
    pub city_post_status: String,
    pub is_city_post: String,
    pub emts_branch_code: String,
    pub my_branch_code: String,
    pub shift: String,
    pub handheld_device: String,
    pub service_type: String,
    pub item_weight: u32,
    pub is_charge: String,
    pub is_station: String,
    pub delivery_branch_code: String,
    pub vas_type: String,
    pub set_ad: String,
    pub vp_service: String,
    pub vp_amount: u32,
    pub item_price: u32,
    pub insurance_price: u32,
    pub is_bulk_mail: String,
    pub sender_name: String,
    pub sender_contact: String,
    pub sender_address: String,
    pub item_description: String,
    pub image_src: String,
    pub image_pod: u32,
    pub ad_pod_id: u32,
}

impl Default for ShipmentConfig {
    fn default() -> Self {
        use constants::shipment;

        Self {
            user_group: shipment::USER_GROUP.to_string(),
            city_post_status: "Yes".to_string(),
            is_city_post: "No".to_string(),
            emts_branch_code: shipment::BRANCH_CODE.to_string(),
            my_branch_code: shipment::BRANCH_CODE.to_string(),
            shift: shipment::SHIFT.to_string(),
            handheld_device: shipment::HANDHELD_DEVICE.to_string(),
            service_type: shipment::SERVICE_TYPE.to_string(),
            item_weight: shipment::ITEM_WEIGHT_GRAMS,
            is_charge: "Yes".to_string(),
            is_station: "No".to_string(),
            delivery_branch_code: shipment::DELIVERY_BRANCH_CODE.to_string(),
            vas_type: shipment::VAS_TYPE.to_string(),
            set_ad: "No".to_string(),
            vp_service: "No".to_string(),
            vp_amount: 0,
            item_price: 0,
            insurance_price: 0,
            is_bulk_mail: "No".to_string(),
            sender_name: shipment::SENDER_NAME.to_string(),
            sender_contact: shipment::SENDER_CONTACT.to_string(),
            sender_address: shipment::SENDER_ADDRESS.to_string(),
            item_description: shipment::ITEM_DESCRIPTION.to_string(),
            image_src: "No".to_string(),
            image_pod: 0,
            ad_pod_id: 0,
        }
    }
}
