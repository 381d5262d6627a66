//! Weighted-sum score computation.

use crate::model::catalog::{AttackId, CategoryId};
use crate::model::context::{ContextWeight, WeightTarget};
use crate::model::detection::{DetectionState, ScoredDetection};
use crate::model::rule::ScoringRule;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Multiplier applied when a context has no weight for a detection.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Points per detection state, taken from the active scoring rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointScale {
    pub active: f64,
    pub dynamic: f64,
    pub no_evid: f64,
}

impl PointScale {
    pub fn points(&self, state: DetectionState) -> f64 {
        match state {
            DetectionState::Active => self.active,
            DetectionState::Dynamic => self.dynamic,
            DetectionState::NoEvidence => self.no_evid,
        }
    }
}

impl From<&ScoringRule> for PointScale {
    fn from(rule: &ScoringRule) -> Self {
        Self {
            active: rule.active_points,
            dynamic: rule.dynamic_points,
            no_evid: rule.no_evid_points,
        }
    }
}

/// Resolved weights of one context.
///
/// Lookup order: attack override, category weight, [`DEFAULT_WEIGHT`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    categories: HashMap<CategoryId, f64>,
    attacks: HashMap<AttackId, f64>,
}

impl WeightTable {
    pub fn from_weights(weights: &[ContextWeight]) -> Self {
        let mut table = Self::default();
        for weight in weights {
            match weight.target {
                WeightTarget::Category(id) => {
                    table.categories.insert(id, weight.weight);
                }
                WeightTarget::Attack(id) => {
                    table.attacks.insert(id, weight.weight);
                }
            }
        }
        table
    }

    /// Returns a copy with category weights replaced by `overrides`.
    ///
    /// Attack-level overrides of the base table are dropped for attacks whose
    /// category is overridden, so a simulated category weight always applies
    /// to the whole category.
    pub fn with_category_overrides(
        &self,
        overrides: &HashMap<CategoryId, f64>,
        attack_categories: &HashMap<AttackId, CategoryId>,
    ) -> Self {
        let mut table = self.clone();
        for (category_id, weight) in overrides {
            table.set_category(*category_id, *weight);
        }
        table.attacks.retain(|attack_id, _| {
            attack_categories
                .get(attack_id)
                .map_or(true, |category_id| !overrides.contains_key(category_id))
        });
        table
    }

    fn set_category(&mut self, category_id: CategoryId, weight: f64) {
        self.categories.insert(category_id, weight);
    }

    pub fn category_weight(&self, category_id: CategoryId) -> f64 {
        self.categories
            .get(&category_id)
            .copied()
            .unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn weight_for(&self, detection: &ScoredDetection) -> f64 {
        self.attacks
            .get(&detection.attack_id)
            .copied()
            .unwrap_or_else(|| self.category_weight(detection.category_id))
    }
}

/// Per-category slice of a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryContribution {
    pub category_id: CategoryId,
    pub category_name: String,
    pub detections: u32,
    pub earned: f64,
    pub possible: f64,
}

/// Result of scoring one vendor's detections.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub total_score: f64,
    pub max_possible_score: f64,
    pub score_percentage: f64,
    pub active_count: u32,
    pub dynamic_count: u32,
    pub no_evid_count: u32,
    pub categories: Vec<CategoryContribution>,
}

impl ScoreBreakdown {
    pub fn detection_count(&self) -> u32 {
        self.active_count + self.dynamic_count + self.no_evid_count
    }
}

/// Scores `detections` under `scale` and `weights`.
///
/// `total = Σ points(state) × weight`, `max = Σ active × weight`,
/// `percentage = total / max × 100` (0 when `max` is 0). Reported values are
/// rounded to 2 decimals after the percentage is computed.
pub fn score_detections(
    scale: &PointScale,
    weights: &WeightTable,
    detections: &[ScoredDetection],
) -> ScoreBreakdown {
    let mut total = 0.0_f64;
    let mut max = 0.0_f64;
    let mut breakdown = ScoreBreakdown::default();
    let mut per_category: BTreeMap<(String, CategoryId), CategoryContribution> = BTreeMap::new();

    for detection in detections {
        let weight = weights.weight_for(detection);
        let earned = scale.points(detection.state) * weight;
        let possible = scale.active * weight;
        total += earned;
        max += possible;

        match detection.state {
            DetectionState::Active => breakdown.active_count += 1,
            DetectionState::Dynamic => breakdown.dynamic_count += 1,
            DetectionState::NoEvidence => breakdown.no_evid_count += 1,
        }

        let entry = per_category
            .entry((
                detection.category_name.to_lowercase(),
                detection.category_id,
            ))
            .or_insert_with(|| CategoryContribution {
                category_id: detection.category_id,
                category_name: detection.category_name.clone(),
                detections: 0,
                earned: 0.0,
                possible: 0.0,
            });
        entry.detections += 1;
        entry.earned += earned;
        entry.possible += possible;
    }

    let percentage = if max > 0.0 { total / max * 100.0 } else { 0.0 };
    breakdown.total_score = round2(total);
    breakdown.max_possible_score = round2(max);
    breakdown.score_percentage = round2(percentage);
    breakdown.categories = per_category
        .into_values()
        .map(|mut contribution| {
            contribution.earned = round2(contribution.earned);
            contribution.possible = round2(contribution.possible);
            contribution
        })
        .collect();
    breakdown
}

/// Rounds half away from zero to 2 decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::{round2, score_detections, PointScale, WeightTable};
    use crate::model::catalog::{AttackId, CategoryId};
    use crate::model::context::{ContextWeight, WeightTarget};
    use crate::model::detection::{DetectionState, ScoredDetection};
    use std::collections::HashMap;
    use uuid::Uuid;

    const SCALE: PointScale = PointScale {
        active: 2.0,
        dynamic: 1.0,
        no_evid: 0.0,
    };

    fn detection(category: CategoryId, name: &str, state: DetectionState) -> ScoredDetection {
        ScoredDetection {
            attack_id: Uuid::new_v4(),
            attack_name: format!("{name}-attack"),
            category_id: category,
            category_name: name.to_string(),
            state,
        }
    }

    fn weight(target: WeightTarget, value: f64) -> ContextWeight {
        ContextWeight {
            context_id: Uuid::new_v4(),
            target,
            target_name: "target".to_string(),
            weight: value,
            rationale: None,
        }
    }

    #[test]
    fn unweighted_score_is_linear_in_states() {
        let execution = Uuid::new_v4();
        let detections = vec![
            detection(execution, "Execution", DetectionState::Active),
            detection(execution, "Execution", DetectionState::Dynamic),
            detection(execution, "Execution", DetectionState::NoEvidence),
        ];

        let score = score_detections(&SCALE, &WeightTable::default(), &detections);
        assert_eq!(score.total_score, 3.0);
        assert_eq!(score.max_possible_score, 6.0);
        assert_eq!(score.score_percentage, 50.0);
        assert_eq!(
            (score.active_count, score.dynamic_count, score.no_evid_count),
            (1, 1, 1)
        );
    }

    #[test]
    fn category_weight_scales_both_earned_and_possible() {
        let execution = Uuid::new_v4();
        let persistence = Uuid::new_v4();
        let detections = vec![
            detection(execution, "Execution", DetectionState::Active),
            detection(persistence, "Persistence", DetectionState::NoEvidence),
        ];
        let weights = WeightTable::from_weights(&[weight(WeightTarget::Category(persistence), 3.0)]);

        let score = score_detections(&SCALE, &weights, &detections);
        assert_eq!(score.total_score, 2.0);
        assert_eq!(score.max_possible_score, 8.0);
        assert_eq!(score.score_percentage, 25.0);
        assert_eq!(score.categories.len(), 2);
        assert_eq!(score.categories[0].category_name, "Execution");
        assert_eq!(score.categories[1].possible, 6.0);
    }

    #[test]
    fn attack_override_beats_category_weight() {
        let execution = Uuid::new_v4();
        let target = detection(execution, "Execution", DetectionState::Dynamic);
        let weights = WeightTable::from_weights(&[
            weight(WeightTarget::Category(execution), 2.0),
            weight(WeightTarget::Attack(target.attack_id), 0.5),
        ]);

        assert_eq!(weights.weight_for(&target), 0.5);
        let other = detection(execution, "Execution", DetectionState::Active);
        assert_eq!(weights.weight_for(&other), 2.0);
    }

    #[test]
    fn zero_weights_yield_zero_percentage() {
        let execution = Uuid::new_v4();
        let detections = vec![detection(execution, "Execution", DetectionState::Active)];
        let weights = WeightTable::from_weights(&[weight(WeightTarget::Category(execution), 0.0)]);

        let score = score_detections(&SCALE, &weights, &detections);
        assert_eq!(score.max_possible_score, 0.0);
        assert_eq!(score.score_percentage, 0.0);
    }

    #[test]
    fn empty_detections_score_zero() {
        let score = score_detections(&SCALE, &WeightTable::default(), &[]);
        assert_eq!(score.score_percentage, 0.0);
        assert_eq!(score.detection_count(), 0);
        assert!(score.categories.is_empty());
    }

    #[test]
    fn category_override_drops_attack_overrides_in_that_category() {
        let execution = Uuid::new_v4();
        let target = detection(execution, "Execution", DetectionState::Active);
        let base = WeightTable::from_weights(&[weight(WeightTarget::Attack(target.attack_id), 4.0)]);

        let attack_categories: HashMap<AttackId, CategoryId> =
            HashMap::from([(target.attack_id, execution)]);
        let simulated =
            base.with_category_overrides(&HashMap::from([(execution, 1.5)]), &attack_categories);

        assert_eq!(base.weight_for(&target), 4.0);
        assert_eq!(simulated.weight_for(&target), 1.5);
    }

    #[test]
    fn category_override_replaces_only_the_named_category() {
        let execution = Uuid::new_v4();
        let persistence = Uuid::new_v4();
        let base = WeightTable::from_weights(&[
            weight(WeightTarget::Category(execution), 3.0),
            weight(WeightTarget::Category(persistence), 2.0),
        ]);

        let simulated =
            base.with_category_overrides(&HashMap::from([(execution, 0.0)]), &HashMap::new());

        assert_eq!(simulated.category_weight(execution), 0.0);
        assert_eq!(simulated.category_weight(persistence), 2.0);
        assert_eq!(simulated.category_weight(Uuid::new_v4()), 1.0);
        assert_eq!(base.category_weight(execution), 3.0);
    }

    #[test]
    fn percentage_is_rounded_after_division() {
        let execution = Uuid::new_v4();
        let detections = vec![
            detection(execution, "Execution", DetectionState::Active),
            detection(execution, "Execution", DetectionState::NoEvidence),
            detection(execution, "Execution", DetectionState::NoEvidence),
        ];
        let score = score_detections(&SCALE, &WeightTable::default(), &detections);
        assert_eq!(score.score_percentage, 33.33);
        assert_eq!(round2(2.0 / 3.0), 0.67);
    }
}
