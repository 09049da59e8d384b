//! # Destination Directory
//!
//! Read-only reference data for the regional passport offices a parcel can be
//! booked to. The directory is static: it is built once, never mutated, and
//! shared freely across sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{BookingError, BookingResult};

/// A regional passport office acting as shipment destination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DestinationOffice {
    /// Unique short identifier (the office's post code)
    pub code: String,
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl DestinationOffice {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            address: address.into(),
            phone: phone.into(),
        }
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.code.to_lowercase().contains(needle)
    }
}

impl fmt::Display for DestinationOffice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// Ordered, immutable collection of destination offices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationDirectory {
    offices: Vec<DestinationOffice>,
}

impl DestinationDirectory {
    /// Build a directory, rejecting duplicate or empty office codes
    pub fn new(offices: Vec<DestinationOffice>) -> BookingResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for office in &offices {
            if office.code.trim().is_empty() {
                return Err(BookingError::Configuration(format!(
                    "Office '{}' has an empty code",
                    office.name
                )));
            }
            if !seen.insert(office.code.as_str()) {
                return Err(BookingError::Configuration(format!(
                    "Duplicate office code '{}'",
                    office.code
                )));
            }
        }
        Ok(Self { offices })
    }

    /// Load a directory from a JSON array of offices
    pub fn from_json(json: &str) -> BookingResult<Self> {
        let offices: Vec<DestinationOffice> = serde_json::from_str(json)
            .map_err(|e| BookingError::Configuration(format!("Invalid office directory: {e}")))?;
        Self::new(offices)
    }

    /// Directory of the regional passport offices served by the personalization complex
    pub fn builtin() -> Self {
        let offices = BUILTIN_OFFICES
            .iter()
            .map(|(code, name, address, phone)| DestinationOffice::new(*code, *name, *address, *phone))
            .collect();
        Self { offices }
    }

    pub fn list_offices(&self) -> &[DestinationOffice] {
        &self.offices
    }

    /// Case-insensitive substring match on name or code, preserving order.
    /// An empty or blank query returns every office.
    pub fn filter(&self, query: &str) -> Vec<&DestinationOffice> {
        let needle = query.trim().to_lowercase();
        self.offices
            .iter()
            .filter(|office| needle.is_empty() || office.matches(&needle))
            .collect()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&DestinationOffice> {
        self.offices.iter().find(|office| office.code == code)
    }

    pub fn len(&self) -> usize {
        self.offices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offices.is_empty()
    }
}

impl Default for DestinationDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_OFFICES: &[(&str, &str, &str, &str)] = &[
    (
        "1001",
        "AGARGAON",
        "Regional Passport Office, Agargaon, Sher-e-Bangla Nagar, Dhaka-1207",
        "01733393301",
    ),
    (
        "1002",
        "JATRABARI",
        "Regional Passport Office, Jatrabari, Dhaka-1204",
        "01733393302",
    ),
    (
        "1003",
        "UTTARA",
        "Regional Passport Office, Sector-11, Uttara, Dhaka-1230",
        "01733393303",
    ),
    (
        "4102",
        "CHANDGAON",
        "Regional Passport Office, Chandgaon (ctg) 4102",
        "01733393304",
    ),
    (
        "4000",
        "MANSURABAD",
        "Regional Passport Office, Mansurabad, Chattogram-4000",
        "01733393305",
    ),
    (
        "6000",
        "RAJSHAHI",
        "Regional Passport Office, Sopura, Rajshahi-6000",
        "01733393306",
    ),
    (
        "9000",
        "KHULNA",
        "Regional Passport Office, Boyra, Khulna-9000",
        "01733393307",
    ),
    (
        "3100",
        "SYLHET",
        "Regional Passport Office, Uposhohor, Sylhet-3100",
        "01733393308",
    ),
    (
        "8200",
        "BARISHAL",
        "Regional Passport Office, Nathullabad, Barishal-8200",
        "01733393309",
    ),
    (
        "5400",
        "RANGPUR",
        "Regional Passport Office, Cantonment Road, Rangpur-5400",
        "01733393310",
    ),
    (
        "2200",
        "MYMENSINGH",
        "Regional Passport Office, Kewatkhali, Mymensingh-2200",
        "01733393311",
    ),
    (
        "3500",
        "CUMILLA",
        "Regional Passport Office, Dharmapur, Cumilla-3500",
        "01733393312",
    ),
];
