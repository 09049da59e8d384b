//! Request and response shapes spoken by the backend services, plus the
//! normalisation rules that turn their loosely typed status fields into
//! decisions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::constants::status;
use crate::utils::serde::{deserialize_optional_code, deserialize_optional_text, sanitize_barcode};

fn code_is(code: &Option<String>, expected: &str) -> bool {
    code.as_deref() == Some(expected)
}

fn status_is_success(status_text: &Option<String>) -> bool {
    status_text
        .as_deref()
        .is_some_and(|s| s.trim().eq_ignore_ascii_case(status::SUCCESS))
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Barcode lookup request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeCheckRequest {
    pub user_id: String,
    pub post_code: String,
}

/// Barcode lookup response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarcodeCheckResponse {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub barcode: Option<String>,
    #[serde(default)]
    pub post_code: Option<String>,
    #[serde(default)]
    pub rpo_name: Option<String>,
    #[serde(default)]
    pub booking_status: Option<String>,
}

impl BarcodeCheckResponse {
    /// `status == "success"` or `status_code == "200"`, unless the service
    /// explicitly says `success: false`
    pub fn is_success(&self) -> bool {
        self.success != Some(false)
            && (status_is_success(&self.status) || code_is(&self.status_code, status::OK_CODE))
    }

    /// No barcode has been pre-assigned: a failure report or an explicit 404
    pub fn is_not_found(&self) -> bool {
        !self.is_success() || code_is(&self.status_code, status::NOT_FOUND_CODE)
    }

    /// The pre-assigned barcode, if the lookup found a usable one
    pub fn assigned_barcode(&self) -> Option<String> {
        if self.is_not_found() {
            return None;
        }
        non_empty(&self.barcode).map(str::to_string)
    }
}

/// Missing-barcode allocation request, issued with the shared pool credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationRequest {
    pub user_id: String,
    pub user_pass: String,
    pub barcode_qty: u32,
    pub barcode_type: String,
}

impl fmt::Debug for AllocationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationRequest")
            .field("user_id", &self.user_id)
            .field("user_pass", &"***")
            .field("barcode_qty", &self.barcode_qty)
            .field("barcode_type", &self.barcode_type)
            .finish()
    }
}

/// Missing-barcode allocation response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationResponse {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Raw barcode text; the service wraps it in quote characters
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub barcode: Option<String>,
}

impl AllocationResponse {
    /// The allocated barcode with surrounding quotes stripped
    pub fn barcode(&self) -> Option<String> {
        self.barcode.as_deref().and_then(sanitize_barcode)
    }
}

/// Provisional-record store request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionalRecordRequest {
    pub user_id: String,
    pub rpo_address: String,
    pub phone: String,
    pub post_code: String,
    pub rpo_name: String,
    pub barcode: String,
    pub booking_status: String,
}

/// Generic acknowledgement used by the provisional store and passport submit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AckResponse {
    /// What an empty 2xx body means: success
    pub fn empty_success() -> Self {
        Self {
            status_code: Some(status::OK_CODE.to_string()),
            status: Some(status::SUCCESS.to_string()),
            success: Some(true),
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        code_is(&self.status_code, status::OK_CODE) || status_is_success(&self.status)
    }

    /// Status code to report in a rejection
    pub fn reported_code(&self) -> String {
        self.status_code.clone().unwrap_or_else(|| "unknown".to_string())
    }

    pub fn reported_message(&self, fallback: &str) -> String {
        non_empty(&self.message).unwrap_or(fallback).to_string()
    }
}

/// Booking submission response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResponse {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    /// Service-assigned item identifier
    #[serde(default, deserialize_with = "deserialize_optional_text")]
    pub item_id: Option<String>,
}

impl BookingResponse {
    /// Accepted unless the service says `success: false`, and only with a
    /// 200 code or a success status
    pub fn is_accepted(&self) -> bool {
        self.success != Some(false)
            && (code_is(&self.status_code, status::OK_CODE) || status_is_success(&self.status))
    }

    pub fn item_id(&self) -> Option<&str> {
        non_empty(&self.item_id)
    }

    pub fn reported_code(&self) -> String {
        self.status_code.clone().unwrap_or_else(|| "unknown".to_string())
    }

    pub fn reported_message(&self) -> String {
        non_empty(&self.message)
            .unwrap_or("Booking was not accepted")
            .to_string()
    }
}

/// Passport submission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassportRequest {
    pub user_id: String,
    pub item_id: String,
    pub total_charge: u32,
    pub service_type: String,
    pub vas_type: String,
    pub price: u32,
    pub insured: u32,
    pub booking_status: String,
}

/// Licence check response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenceCheckResponse {
    #[serde(default, deserialize_with = "deserialize_optional_code")]
    pub status_code: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl LicenceCheckResponse {
    pub fn is_success(&self) -> bool {
        self.success == Some(true) || code_is(&self.status_code, status::OK_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(json: &str) -> BarcodeCheckResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_lookup_success_with_barcode() {
        let response = lookup(
            r#"{"status":"success","status_code":"200","barcode":"8801234567890"}"#,
        );
        assert!(response.is_success());
        assert!(!response.is_not_found());
        assert_eq!(response.assigned_barcode().as_deref(), Some("8801234567890"));
    }

    #[test]
    fn test_lookup_not_found_variants() {
        let explicit = lookup(r#"{"success":false,"status_code":"404"}"#);
        assert!(explicit.is_not_found());
        assert_eq!(explicit.assigned_barcode(), None);

        let numeric = lookup(r#"{"status":"success","status_code":404,"barcode":"1"}"#);
        assert!(numeric.is_not_found());

        let failed = lookup(r#"{"status":"failed","message":"Data not found"}"#);
        assert!(failed.is_not_found());
    }

    #[test]
    fn test_lookup_success_without_barcode_has_no_assignment() {
        let response = lookup(r#"{"status":"Success","barcode":"  "}"#);
        assert!(response.is_success());
        assert_eq!(response.assigned_barcode(), None);
    }

    #[test]
    fn test_allocation_barcode_is_sanitized() {
        let response: AllocationResponse =
            serde_json::from_str(r#"{"barcode":"\"9901112223334\""}"#).unwrap();
        assert_eq!(response.barcode().as_deref(), Some("9901112223334"));

        let absent: AllocationResponse = serde_json::from_str(r#"{"barcode":null}"#).unwrap();
        assert_eq!(absent.barcode(), None);
    }

    #[test]
    fn test_allocation_request_debug_masks_password() {
        let request = AllocationRequest {
            user_id: "BTD001".into(),
            user_pass: "secret".into(),
            barcode_qty: 1,
            barcode_type: "DG".into(),
        };
        assert!(!format!("{request:?}").contains("secret"));
    }

    #[test]
    fn test_booking_acceptance() {
        let accepted: BookingResponse =
            serde_json::from_str(r#"{"success":true,"status_code":"200","item_id":"IT-55"}"#)
                .unwrap();
        assert!(accepted.is_accepted());
        assert_eq!(accepted.item_id(), Some("IT-55"));

        let refused: BookingResponse = serde_json::from_str(
            r#"{"success":false,"status_code":"200","message":"Duplicate booking"}"#,
        )
        .unwrap();
        assert!(!refused.is_accepted());
        assert_eq!(refused.reported_message(), "Duplicate booking");

        let conflict: BookingResponse =
            serde_json::from_str(r#"{"status_code":"409"}"#).unwrap();
        assert!(!conflict.is_accepted());
        assert_eq!(conflict.reported_code(), "409");
    }

    #[test]
    fn test_ack_success_rules() {
        assert!(AckResponse::empty_success().is_success());
        let failed: AckResponse = serde_json::from_str(r#"{"status_code":"500"}"#).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.reported_message("fallback"), "fallback");
    }

    #[test]
    fn test_licence_success_rules() {
        let ok: LicenceCheckResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(ok.is_success());
        let failed: LicenceCheckResponse =
            serde_json::from_str(r#"{"status_code":"403"}"#).unwrap();
        assert!(!failed.is_success());
    }
}
