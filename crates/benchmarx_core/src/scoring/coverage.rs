//! Category coverage and risk classification.

use crate::model::catalog::CategoryId;
use crate::model::detection::{DetectionState, ScoredDetection};
use crate::scoring::engine::round2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// How much of one attack category a vendor detected.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCoverage {
    pub category_id: CategoryId,
    pub category_name: String,
    pub total_attacks: u32,
    pub active_detections: u32,
    pub dynamic_detections: u32,
    pub no_evidence: u32,
    /// `(active + dynamic) / total × 100`, rounded to 2 decimals.
    pub coverage_percentage: f64,
}

/// Groups detections per category, ordered by category name.
pub fn category_coverage(detections: &[ScoredDetection]) -> Vec<CategoryCoverage> {
    let mut grouped: BTreeMap<(String, CategoryId), CategoryCoverage> = BTreeMap::new();

    for detection in detections {
        let entry = grouped
            .entry((
                detection.category_name.to_lowercase(),
                detection.category_id,
            ))
            .or_insert_with(|| CategoryCoverage {
                category_id: detection.category_id,
                category_name: detection.category_name.clone(),
                total_attacks: 0,
                active_detections: 0,
                dynamic_detections: 0,
                no_evidence: 0,
                coverage_percentage: 0.0,
            });
        entry.total_attacks += 1;
        match detection.state {
            DetectionState::Active => entry.active_detections += 1,
            DetectionState::Dynamic => entry.dynamic_detections += 1,
            DetectionState::NoEvidence => entry.no_evidence += 1,
        }
    }

    grouped
        .into_values()
        .map(|mut coverage| {
            let detected = coverage.active_detections + coverage.dynamic_detections;
            coverage.coverage_percentage =
                round2(f64::from(detected) / f64::from(coverage.total_attacks) * 100.0);
            coverage
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn classify(coverage_percentage: f64, no_evidence: u32, thresholds: &RiskThresholds) -> Self {
        if coverage_percentage >= thresholds.low_coverage && no_evidence <= thresholds.low_max_gaps
        {
            Self::Low
        } else if coverage_percentage >= thresholds.medium_coverage
            && no_evidence <= thresholds.medium_max_gaps
        {
            Self::Medium
        } else if coverage_percentage >= thresholds.high_coverage {
            Self::High
        } else {
            Self::Critical
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cut-offs for [`RiskLevel::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskThresholds {
    pub low_coverage: f64,
    pub low_max_gaps: u32,
    pub medium_coverage: f64,
    pub medium_max_gaps: u32,
    pub high_coverage: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_coverage: 90.0,
            low_max_gaps: 1,
            medium_coverage: 75.0,
            medium_max_gaps: 3,
            high_coverage: 50.0,
        }
    }
}

impl RiskThresholds {
    /// Coverage cut-offs must fall from LOW to HIGH within `0..=100` and gap
    /// allowances must not shrink from LOW to MEDIUM.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |value: f64| (0.0..=100.0).contains(&value);
        if !(in_range(self.low_coverage)
            && in_range(self.medium_coverage)
            && in_range(self.high_coverage))
        {
            return Err("risk coverage thresholds must be within 0..=100".to_string());
        }
        if self.low_coverage < self.medium_coverage || self.medium_coverage < self.high_coverage {
            return Err(format!(
                "risk coverage thresholds must satisfy low >= medium >= high, got {} / {} / {}",
                self.low_coverage, self.medium_coverage, self.high_coverage
            ));
        }
        if self.low_max_gaps > self.medium_max_gaps {
            return Err(format!(
                "low_max_gaps ({}) must not exceed medium_max_gaps ({})",
                self.low_max_gaps, self.medium_max_gaps
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{category_coverage, RiskLevel, RiskThresholds};
    use crate::model::detection::{DetectionState, ScoredDetection};
    use uuid::Uuid;

    #[test]
    fn coverage_counts_active_and_dynamic_as_detected() {
        let category = Uuid::new_v4();
        let detections: Vec<_> = [
            DetectionState::Active,
            DetectionState::Dynamic,
            DetectionState::NoEvidence,
            DetectionState::Active,
        ]
        .into_iter()
        .enumerate()
        .map(|(index, state)| ScoredDetection {
            attack_id: Uuid::new_v4(),
            attack_name: format!("attack-{index}"),
            category_id: category,
            category_name: "Defense Evasion".to_string(),
            state,
        })
        .collect();

        let coverage = category_coverage(&detections);
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].total_attacks, 4);
        assert_eq!(coverage[0].active_detections, 2);
        assert_eq!(coverage[0].no_evidence, 1);
        assert_eq!(coverage[0].coverage_percentage, 75.0);
    }

    #[test]
    fn risk_levels_follow_default_thresholds() {
        let thresholds = RiskThresholds::default();
        assert_eq!(RiskLevel::classify(95.0, 1, &thresholds), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(95.0, 2, &thresholds), RiskLevel::Medium);
        assert_eq!(RiskLevel::classify(80.0, 4, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::classify(50.0, 10, &thresholds), RiskLevel::High);
        assert_eq!(RiskLevel::classify(49.99, 0, &thresholds), RiskLevel::Critical);
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let thresholds = RiskThresholds {
            low_coverage: 60.0,
            medium_coverage: 75.0,
            ..RiskThresholds::default()
        };
        assert!(thresholds.validate().is_err());
        assert!(RiskThresholds::default().validate().is_ok());
    }
}
