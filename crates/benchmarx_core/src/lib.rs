//! Core domain logic for BenchmarX.
//! This crate is the single source of truth for scoring and ranking invariants.

pub mod config;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod report;
pub mod repo;
pub mod scoring;
pub mod service;

pub use config::{load_config, BenchmarxConfig, ConfigError};
pub use db::{open_db, open_db_in_memory, DbError};
pub use import::{import_benchmark, import_file, BenchmarkImport, ImportError, ImportSummary};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::benchmark::{Benchmark, BenchmarkId, BenchmarkStats};
pub use model::catalog::{Attack, AttackCategory, AttackId, AttackListing, CategoryId, Severity};
pub use model::context::{
    CompanySize, ContextId, ContextProfile, ContextWeight, SecurityMaturity, WeightTarget,
};
pub use model::detection::{DetectionResult, DetectionState, ScoredDetection};
pub use model::rule::{ScoredResult, ScoringRule};
pub use model::vendor::{Vendor, VendorId, VendorType};
pub use model::ValidationError;
pub use repo::{RepoError, RepoResult};
pub use service::scoring_service::{ScoringError, ScoringResult, ScoringService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
