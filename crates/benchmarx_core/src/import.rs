//! Benchmark import from JSON documents.
//!
//! # Responsibility
//! - Parse a lab report export into benchmark, catalog and detection rows.
//! - Upsert catalog entities by name and write detections atomically.
//!
//! # Invariants
//! - The whole document is applied in one transaction or not at all.
//! - Detections may only reference vendors and attacks that exist in storage
//!   or in the same document.
//! - Importing never changes which benchmark is active unless `activate` is set.

use crate::model::benchmark::{Benchmark, BenchmarkId};
use crate::model::catalog::{Attack, AttackCategory, AttackId, CategoryId, Severity};
use crate::model::detection::{DetectionResult, DetectionState};
use crate::model::vendor::{Vendor, VendorId, VendorType};
use crate::repo::benchmark_repo::{BenchmarkRepository, SqliteBenchmarkRepository};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use crate::repo::RepoError;
use chrono::NaiveDate;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Top-level import document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkImport {
    pub benchmark: BenchmarkSpec,
    #[serde(default)]
    pub vendors: Vec<VendorSpec>,
    #[serde(default)]
    pub categories: Vec<CategorySpec>,
    #[serde(default)]
    pub attacks: Vec<AttackSpec>,
    #[serde(default)]
    pub detections: Vec<DetectionSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkSpec {
    pub name: String,
    pub source: String,
    pub report_date: NaiveDate,
    pub description: Option<String>,
    pub imported_by: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Makes the benchmark the active one after a successful import.
    #[serde(default)]
    pub activate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VendorSpec {
    pub name: String,
    #[serde(default = "default_vendor_type")]
    pub vendor_type: VendorType,
    pub description: Option<String>,
    pub test_version: Option<String>,
    pub test_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategorySpec {
    pub name: String,
    pub mitre_tactic: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttackSpec {
    pub name: String,
    /// Category name; must exist in storage or in `categories`.
    pub category: String,
    pub mitre_technique_id: Option<String>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DetectionSpec {
    pub vendor: String,
    pub attack: String,
    /// `ACTIVE`, `DYNAMIC` or `NO_EVID`, case-insensitive.
    pub state: String,
    pub notes: Option<String>,
}

fn default_vendor_type() -> VendorType {
    VendorType::Edr
}

fn default_severity() -> Severity {
    Severity::Medium
}

/// What an import wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub benchmark_id: BenchmarkId,
    pub benchmark_name: String,
    /// `false` when detections were merged into an existing benchmark.
    pub benchmark_created: bool,
    pub vendors_created: u32,
    pub vendors_updated: u32,
    pub categories_created: u32,
    pub attacks_created: u32,
    pub detections_written: u32,
    pub activated: bool,
}

#[derive(Debug)]
pub enum ImportError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    UnknownCategory {
        attack: String,
        category: String,
    },
    UnknownVendor {
        row: usize,
        name: String,
    },
    UnknownAttack {
        row: usize,
        name: String,
    },
    InvalidState {
        row: usize,
        value: String,
    },
    Repo(RepoError),
}

impl Display for ImportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read import file `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid import document: {err}"),
            Self::UnknownCategory { attack, category } => {
                write!(f, "attack `{attack}` references unknown category `{category}`")
            }
            Self::UnknownVendor { row, name } => {
                write!(f, "detection #{row} references unknown vendor `{name}`")
            }
            Self::UnknownAttack { row, name } => {
                write!(f, "detection #{row} references unknown attack `{name}`")
            }
            Self::InvalidState { row, value } => write!(
                f,
                "detection #{row} has invalid state `{value}`; expected ACTIVE|DYNAMIC|NO_EVID"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ImportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ImportError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ImportError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

impl From<serde_json::Error> for ImportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

pub fn parse_import(contents: &str) -> Result<BenchmarkImport, ImportError> {
    Ok(serde_json::from_str(contents)?)
}

/// Reads and applies an import file.
pub fn import_file(conn: &Connection, path: &Path) -> Result<ImportSummary, ImportError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    import_benchmark(conn, &parse_import(&contents)?)
}

/// Applies `document` in one transaction.
///
/// An existing benchmark with the same name is reused; its detections for the
/// listed `(vendor, attack)` pairs are overwritten.
pub fn import_benchmark(
    conn: &Connection,
    document: &BenchmarkImport,
) -> Result<ImportSummary, ImportError> {
    let started_at = Instant::now();
    let result = apply_import(conn, document);
    match &result {
        Ok(summary) => info!(
            "event=benchmark_import module=import status=ok benchmark_id={} created={} vendors={} attacks={} detections={} duration_ms={}",
            summary.benchmark_id,
            summary.benchmark_created,
            summary.vendors_created + summary.vendors_updated,
            summary.attacks_created,
            summary.detections_written,
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event=benchmark_import module=import status=error detections={} duration_ms={} error={}",
            document.detections.len(),
            started_at.elapsed().as_millis(),
            err
        ),
    }
    result
}

fn apply_import(
    conn: &Connection,
    document: &BenchmarkImport,
) -> Result<ImportSummary, ImportError> {
    let vendors = SqliteVendorRepository::try_new(conn)?;
    let catalog = SqliteCatalogRepository::try_new(conn)?;
    let benchmarks = SqliteBenchmarkRepository::try_new(conn)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;

    let spec = &document.benchmark;
    let (benchmark_id, benchmark_created) = match benchmarks.find_benchmark_by_name(&spec.name)? {
        Some(existing) => (existing.id, false),
        None => {
            let mut benchmark = Benchmark::new(&spec.name, &spec.source, spec.report_date);
            benchmark.description = spec.description.clone();
            benchmark.imported_by = spec.imported_by.clone();
            benchmark.metadata = spec.metadata.clone();
            (benchmarks.create_benchmark(&benchmark)?, true)
        }
    };

    let mut summary = ImportSummary {
        benchmark_id,
        benchmark_name: spec.name.trim().to_string(),
        benchmark_created,
        vendors_created: 0,
        vendors_updated: 0,
        categories_created: 0,
        attacks_created: 0,
        detections_written: 0,
        activated: false,
    };

    let mut vendor_ids: HashMap<String, VendorId> = HashMap::new();
    for vendor_spec in &document.vendors {
        let id = match vendors.find_vendor_by_name(&vendor_spec.name)? {
            Some(mut existing) => {
                existing.vendor_type = vendor_spec.vendor_type;
                existing.description = vendor_spec.description.clone().or(existing.description);
                existing.test_version =
                    vendor_spec.test_version.clone().or(existing.test_version);
                existing.test_date = vendor_spec.test_date.or(existing.test_date);
                vendors.update_vendor(&existing)?;
                summary.vendors_updated += 1;
                existing.id
            }
            None => {
                let mut vendor = Vendor::new(&vendor_spec.name, vendor_spec.vendor_type);
                vendor.description = vendor_spec.description.clone();
                vendor.test_version = vendor_spec.test_version.clone();
                vendor.test_date = vendor_spec.test_date;
                summary.vendors_created += 1;
                vendors.create_vendor(&vendor)?
            }
        };
        vendor_ids.insert(name_key(&vendor_spec.name), id);
    }

    let mut category_ids: HashMap<String, CategoryId> = HashMap::new();
    for category_spec in &document.categories {
        let id = match catalog.find_category_by_name(&category_spec.name)? {
            Some(existing) => existing.id,
            None => {
                let mut category = AttackCategory::new(&category_spec.name);
                category.mitre_tactic = category_spec.mitre_tactic.clone();
                category.description = category_spec.description.clone();
                summary.categories_created += 1;
                catalog.create_category(&category)?
            }
        };
        category_ids.insert(name_key(&category_spec.name), id);
    }

    let mut attack_ids: HashMap<String, AttackId> = HashMap::new();
    for attack_spec in &document.attacks {
        let id = match catalog.find_attack_by_name(&attack_spec.name)? {
            Some(existing) => existing.attack.id,
            None => {
                let category_id = match category_ids.get(&name_key(&attack_spec.category)) {
                    Some(id) => *id,
                    None => catalog
                        .find_category_by_name(&attack_spec.category)?
                        .map(|category| category.id)
                        .ok_or_else(|| ImportError::UnknownCategory {
                            attack: attack_spec.name.clone(),
                            category: attack_spec.category.clone(),
                        })?,
                };
                let mut attack = Attack::new(&attack_spec.name, category_id, attack_spec.severity);
                attack.mitre_technique_id = attack_spec.mitre_technique_id.clone();
                attack.description = attack_spec.description.clone();
                summary.attacks_created += 1;
                catalog.create_attack(&attack)?
            }
        };
        attack_ids.insert(name_key(&attack_spec.name), id);
    }

    for (index, detection_spec) in document.detections.iter().enumerate() {
        let row = index + 1;
        let state = DetectionState::parse(&detection_spec.state).ok_or_else(|| {
            ImportError::InvalidState {
                row,
                value: detection_spec.state.clone(),
            }
        })?;
        let vendor_id = match vendor_ids.get(&name_key(&detection_spec.vendor)) {
            Some(id) => *id,
            None => {
                let id = vendors
                    .find_vendor_by_name(&detection_spec.vendor)?
                    .map(|vendor| vendor.id)
                    .ok_or_else(|| ImportError::UnknownVendor {
                        row,
                        name: detection_spec.vendor.clone(),
                    })?;
                vendor_ids.insert(name_key(&detection_spec.vendor), id);
                id
            }
        };
        let attack_id = match attack_ids.get(&name_key(&detection_spec.attack)) {
            Some(id) => *id,
            None => {
                let id = catalog
                    .find_attack_by_name(&detection_spec.attack)?
                    .map(|listing| listing.attack.id)
                    .ok_or_else(|| ImportError::UnknownAttack {
                        row,
                        name: detection_spec.attack.clone(),
                    })?;
                attack_ids.insert(name_key(&detection_spec.attack), id);
                id
            }
        };

        let mut detection = DetectionResult::new(benchmark_id, vendor_id, attack_id, state);
        detection.notes = detection_spec.notes.clone();
        benchmarks.upsert_detection(&detection)?;
        summary.detections_written += 1;
    }

    tx.commit()?;

    if spec.activate {
        benchmarks.set_active_benchmark(benchmark_id)?;
        summary.activated = true;
    }
    Ok(summary)
}

/// Names are unique case-insensitively in storage; match the same way here.
fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
