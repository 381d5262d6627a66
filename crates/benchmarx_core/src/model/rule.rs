//! Versioned scoring rules and materialized score rows.

use crate::model::benchmark::BenchmarkId;
use crate::model::context::ContextId;
use crate::model::vendor::VendorId;
use crate::model::{require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point mapping from detection state to score contribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringRule {
    pub version: String,
    pub active_points: f64,
    pub dynamic_points: f64,
    pub no_evid_points: f64,
    pub description: Option<String>,
    pub created_by: Option<String>,
    pub is_active: bool,
}

impl ScoringRule {
    pub fn new(version: impl Into<String>, active: f64, dynamic: f64, no_evid: f64) -> Self {
        Self {
            version: version.into(),
            active_points: active,
            dynamic_points: dynamic,
            no_evid_points: no_evid,
            description: None,
            created_by: None,
            is_active: false,
        }
    }

    /// # Invariants
    /// - All points are finite.
    /// - `active > 0` so the maximum score is never zero for weighted input.
    /// - `active >= dynamic >= no_evid`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("version", &self.version)?;
        for (field, value) in [
            ("active_points", self.active_points),
            ("dynamic_points", self.dynamic_points),
            ("no_evid_points", self.no_evid_points),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::InvalidPoints { field, value });
            }
        }
        if self.active_points <= 0.0
            || self.active_points < self.dynamic_points
            || self.dynamic_points < self.no_evid_points
        {
            return Err(ValidationError::NonMonotonicPoints);
        }
        Ok(())
    }
}

/// One materialized score for `(benchmark, context, vendor, rule version)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredResult {
    pub id: Uuid,
    pub benchmark_id: BenchmarkId,
    pub context_id: ContextId,
    pub vendor_id: VendorId,
    pub scoring_version: String,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub score_percentage: f64,
    pub active_count: u32,
    pub dynamic_count: u32,
    pub no_evid_count: u32,
    pub calculation_metadata: Option<serde_json::Value>,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::ScoringRule;
    use crate::model::ValidationError;

    #[test]
    fn default_linear_scale_is_valid() {
        assert!(ScoringRule::new("v1.0", 2.0, 1.0, 0.0).validate().is_ok());
    }

    #[test]
    fn rejects_dynamic_above_active() {
        let rule = ScoringRule::new("v2", 1.0, 2.0, 0.0);
        assert_eq!(rule.validate(), Err(ValidationError::NonMonotonicPoints));
    }

    #[test]
    fn rejects_zero_active_points() {
        let rule = ScoringRule::new("v0", 0.0, 0.0, 0.0);
        assert_eq!(rule.validate(), Err(ValidationError::NonMonotonicPoints));
    }
}
