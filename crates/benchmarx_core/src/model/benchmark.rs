//! Benchmark reports: dated detection result sets from a named test lab.
//!
//! # Invariants
//! - At most one benchmark is active at a time (enforced by the store).
//! - New benchmarks start inactive; activation is an explicit operator step.

use crate::model::{require_id, require_text, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BenchmarkId = Uuid;

/// Date format used for `report_date` in storage and import files.
pub const REPORT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub id: BenchmarkId,
    pub name: String,
    /// Test laboratory, e.g. `AVLab` or `SE Labs`.
    pub source: String,
    pub report_date: NaiveDate,
    pub description: Option<String>,
    /// Epoch milliseconds; assigned by the store on insert.
    pub imported_at: Option<i64>,
    pub imported_by: Option<String>,
    pub is_active: bool,
    pub metadata: Option<serde_json::Value>,
}

impl Benchmark {
    pub fn new(name: impl Into<String>, source: impl Into<String>, report_date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            source: source.into(),
            report_date,
            description: None,
            imported_at: None,
            imported_by: None,
            is_active: false,
            metadata: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("benchmark", &self.id)?;
        require_text("name", &self.name)?;
        require_text("source", &self.source)
    }

    /// Label used by selectors: `name (YYYY-MM-DD)`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.report_date)
    }
}

/// Aggregate counts over one benchmark's detection results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BenchmarkStats {
    pub vendor_count: u32,
    pub attack_count: u32,
    pub detection_count: u32,
    pub active_count: u32,
    pub dynamic_count: u32,
    pub no_evid_count: u32,
}

/// Parses a `YYYY-MM-DD` report date.
pub fn parse_report_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), REPORT_DATE_FORMAT).ok()
}
