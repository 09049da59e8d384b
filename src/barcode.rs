use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BookingError, BookingResult};

/// A non-empty parcel tracking barcode
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

impl Barcode {
    /// Trim and validate a barcode; blank input is rejected
    pub fn parse(raw: &str) -> BookingResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(BookingError::Precondition(
                "A barcode is required".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Barcode {
    type Error = BookingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Barcode> for String {
    fn from(value: Barcode) -> Self {
        value.0
    }
}

impl AsRef<str> for Barcode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Where the session's current barcode came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarcodeProvenance {
    /// Pre-assigned and returned by the lookup service
    LookedUp,
    /// Allocated from the shared pool after the lookup found nothing
    FreshlyAllocated,
    /// Supplied by a completed scan
    Scanned,
}

impl BarcodeProvenance {
    /// Only freshly allocated barcodes need a provisional record
    pub fn requires_provisional_record(&self) -> bool {
        matches!(self, Self::FreshlyAllocated)
    }
}

impl fmt::Display for BarcodeProvenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LookedUp => write!(f, "looked_up"),
            Self::FreshlyAllocated => write!(f, "freshly_allocated"),
            Self::Scanned => write!(f, "scanned"),
        }
    }
}

/// A barcode together with its provenance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedBarcode {
    pub barcode: Barcode,
    pub provenance: BarcodeProvenance,
}

impl ResolvedBarcode {
    pub fn new(barcode: Barcode, provenance: BarcodeProvenance) -> Self {
        Self {
            barcode,
            provenance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(Barcode::parse(" 8801234567890 ").unwrap().as_str(), "8801234567890");
        assert!(matches!(Barcode::parse("   "), Err(BookingError::Precondition(_))));
    }

    #[test]
    fn test_serde_validates() {
        let barcode: Barcode = serde_json::from_str("\"8801234567890\"").unwrap();
        assert_eq!(barcode.to_string(), "8801234567890");
        assert!(serde_json::from_str::<Barcode>("\"\"").is_err());
    }

    #[test]
    fn test_only_allocated_barcodes_need_provisional_record() {
        assert!(BarcodeProvenance::FreshlyAllocated.requires_provisional_record());
        assert!(!BarcodeProvenance::LookedUp.requires_provisional_record());
        assert!(!BarcodeProvenance::Scanned.requires_provisional_record());
    }
}
