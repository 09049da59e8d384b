/*!
 * Serde helpers for the loosely typed payloads returned by the backend
 * services.
 *
 * The services are inconsistent about whether `status_code` is a JSON string
 * or a number, and about quoting barcodes. These helpers normalise both so
 * that the wire types can compare against plain strings.
 */

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Deserialize an optional status code that may be a string or a number.
///
/// ```json
/// { "status_code": "200" }   // Some("200")
/// { "status_code": 404 }     // Some("404")
/// { "status_code": null }    // None
/// ```
///
/// # Usage with serde
///
/// ```rust
/// use serde::Deserialize;
/// use booking_core::utils::serde::deserialize_optional_code;
///
/// #[derive(Deserialize)]
/// struct Response {
///     #[serde(default, deserialize_with = "deserialize_optional_code")]
///     status_code: Option<String>,
/// }
///
/// let parsed: Response = serde_json::from_str(r#"{"status_code": 200}"#).unwrap();
/// assert_eq!(parsed.status_code.as_deref(), Some("200"));
/// ```
pub fn deserialize_optional_code<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "Expected string or numeric status code, found: {other}"
        ))),
    }
}

/// Deserialize an optional string field, mapping numbers to their decimal text
pub fn deserialize_optional_text<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_optional_code(deserializer)
}

/// Strip every `"` from a barcode and trim whitespace.
///
/// The allocation service returns barcodes as quoted JSON text inside a string.
/// Returns `None` when nothing usable remains.
pub fn sanitize_barcode(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| *c != '"').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize, Debug, PartialEq)]
    struct TestStruct {
        #[serde(default, deserialize_with = "deserialize_optional_code")]
        status_code: Option<String>,
    }

    #[test]
    fn test_code_from_string() {
        let result: TestStruct = serde_json::from_str(r#"{"status_code": "404"}"#).unwrap();
        assert_eq!(result.status_code.as_deref(), Some("404"));
    }

    #[test]
    fn test_code_from_number() {
        let result: TestStruct = serde_json::from_str(r#"{"status_code": 200}"#).unwrap();
        assert_eq!(result.status_code.as_deref(), Some("200"));
    }

    #[test]
    fn test_code_null_and_missing() {
        let result: TestStruct = serde_json::from_str(r#"{"status_code": null}"#).unwrap();
        assert_eq!(result.status_code, None);
        let result: TestStruct = serde_json::from_str(r#"{"other": 1}"#).unwrap();
        assert_eq!(result.status_code, None);
    }

    #[test]
    fn test_code_rejects_objects() {
        let result: Result<TestStruct, _> = serde_json::from_str(r#"{"status_code": {"a": 1}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitize_barcode() {
        assert_eq!(
            sanitize_barcode("\"9901112223334\"").as_deref(),
            Some("9901112223334")
        );
        assert_eq!(sanitize_barcode("  8801234567890 ").as_deref(), Some("8801234567890"));
        assert_eq!(sanitize_barcode("\"\""), None);
        assert_eq!(sanitize_barcode(""), None);
    }
}
