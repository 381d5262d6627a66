//! Security vendor records.

use crate::model::{require_id, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type VendorId = Uuid;

/// Product family the vendor was tested as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VendorType {
    Edr,
    Xdr,
    Epp,
    Other,
}

impl VendorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Edr => "EDR",
            Self::Xdr => "XDR",
            Self::Epp => "EPP",
            Self::Other => "OTHER",
        }
    }

    /// Parses the stored value. Matching is case-insensitive.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "EDR" => Some(Self::Edr),
            "XDR" => Some(Self::Xdr),
            "EPP" => Some(Self::Epp),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub vendor_type: VendorType,
    pub description: Option<String>,
    /// Product version that was under test.
    pub test_version: Option<String>,
    pub test_date: Option<NaiveDate>,
}

impl Vendor {
    pub fn new(name: impl Into<String>, vendor_type: VendorType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            vendor_type,
            description: None,
            test_version: None,
            test_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("vendor", &self.id)?;
        require_text("name", &self.name)
    }
}
