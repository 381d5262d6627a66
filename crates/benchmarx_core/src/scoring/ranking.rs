//! Ranking and ranking comparison.

use crate::model::vendor::{VendorId, VendorType};
use crate::scoring::engine::{round2, ScoreBreakdown};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One vendor's score waiting to be ranked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankEntry {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub vendor_type: VendorType,
    pub score: ScoreBreakdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedVendor {
    /// 1-based, sequential; ties are broken, never shared.
    pub rank: u32,
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub vendor_type: VendorType,
    #[serde(flatten)]
    pub score: ScoreBreakdown,
}

/// Orders by percentage DESC, total DESC, name ASC (case-insensitive), id ASC.
pub fn rank_scores(mut entries: Vec<RankEntry>) -> Vec<RankedVendor> {
    entries.sort_by(compare_entries);
    entries
        .into_iter()
        .zip(1_u32..)
        .map(|(entry, rank)| RankedVendor {
            rank,
            vendor_id: entry.vendor_id,
            vendor_name: entry.vendor_name,
            vendor_type: entry.vendor_type,
            score: entry.score,
        })
        .collect()
}

fn compare_entries(left: &RankEntry, right: &RankEntry) -> Ordering {
    right
        .score
        .score_percentage
        .total_cmp(&left.score.score_percentage)
        .then_with(|| right.score.total_score.total_cmp(&left.score.total_score))
        .then_with(|| {
            left.vendor_name
                .to_lowercase()
                .cmp(&right.vendor_name.to_lowercase())
        })
        .then_with(|| left.vendor_id.cmp(&right.vendor_id))
}

/// A vendor whose position or score moved between two rankings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankChange {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub original_rank: u32,
    pub simulated_rank: u32,
    /// Positive when the vendor moved up.
    pub rank_change: i64,
    pub original_percentage: f64,
    pub simulated_percentage: f64,
    pub score_change: f64,
}

/// Lists vendors whose rank changed or whose percentage moved by more than
/// `min_score_delta`, in original rank order.
///
/// Vendors missing from `simulated` are skipped.
pub fn diff_rankings(
    original: &[RankedVendor],
    simulated: &[RankedVendor],
    min_score_delta: f64,
) -> Vec<RankChange> {
    let simulated_by_id: HashMap<VendorId, &RankedVendor> = simulated
        .iter()
        .map(|ranked| (ranked.vendor_id, ranked))
        .collect();

    original
        .iter()
        .filter_map(|before| {
            let after = simulated_by_id.get(&before.vendor_id)?;
            let rank_change = i64::from(before.rank) - i64::from(after.rank);
            let score_change =
                round2(after.score.score_percentage - before.score.score_percentage);
            if rank_change == 0 && score_change.abs() <= min_score_delta {
                return None;
            }
            Some(RankChange {
                vendor_id: before.vendor_id,
                vendor_name: before.vendor_name.clone(),
                original_rank: before.rank,
                simulated_rank: after.rank,
                rank_change,
                original_percentage: before.score.score_percentage,
                simulated_percentage: after.score.score_percentage,
                score_change,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{diff_rankings, rank_scores, RankEntry};
    use crate::model::vendor::VendorType;
    use crate::scoring::engine::ScoreBreakdown;
    use uuid::Uuid;

    fn entry(name: &str, percentage: f64, total: f64) -> RankEntry {
        RankEntry {
            vendor_id: Uuid::new_v4(),
            vendor_name: name.to_string(),
            vendor_type: VendorType::Edr,
            score: ScoreBreakdown {
                total_score: total,
                max_possible_score: 100.0,
                score_percentage: percentage,
                ..ScoreBreakdown::default()
            },
        }
    }

    #[test]
    fn ranks_by_percentage_descending() {
        let ranked = rank_scores(vec![
            entry("Bravo", 40.0, 40.0),
            entry("Alpha", 90.0, 90.0),
            entry("Charlie", 65.5, 65.5),
        ]);
        let names: Vec<_> = ranked.iter().map(|r| r.vendor_name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Charlie", "Bravo"]);
        let ranks: Vec<_> = ranked.iter().map(|r| r.rank).collect();
        assert_eq!(ranks, [1, 2, 3]);
    }

    #[test]
    fn ties_break_on_total_then_name() {
        let ranked = rank_scores(vec![
            entry("zeta", 50.0, 10.0),
            entry("Beta", 50.0, 10.0),
            entry("Gamma", 50.0, 20.0),
        ]);
        let names: Vec<_> = ranked.iter().map(|r| r.vendor_name.as_str()).collect();
        assert_eq!(names, ["Gamma", "Beta", "zeta"]);
    }

    #[test]
    fn diff_reports_rank_moves_and_score_shifts() {
        let alpha = entry("Alpha", 80.0, 80.0);
        let bravo = entry("Bravo", 70.0, 70.0);
        let charlie = entry("Charlie", 10.0, 10.0);
        let original = rank_scores(vec![alpha.clone(), bravo.clone(), charlie.clone()]);

        let mut alpha_sim = alpha;
        alpha_sim.score.score_percentage = 60.0;
        let mut charlie_sim = charlie;
        charlie_sim.score.score_percentage = 10.05;
        let simulated = rank_scores(vec![alpha_sim, bravo, charlie_sim]);

        let changes = diff_rankings(&original, &simulated, 0.1);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].vendor_name, "Alpha");
        assert_eq!(changes[0].rank_change, -1);
        assert_eq!(changes[0].score_change, -20.0);
        assert_eq!(changes[1].vendor_name, "Bravo");
        assert_eq!(changes[1].rank_change, 1);
    }

    #[test]
    fn diff_of_identical_rankings_is_empty() {
        let ranked = rank_scores(vec![entry("Alpha", 80.0, 80.0), entry("Bravo", 70.0, 70.0)]);
        assert!(diff_rankings(&ranked, &ranked, 0.1).is_empty());
    }
}
