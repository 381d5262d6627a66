//! Pure scoring engine.
//!
//! # Responsibility
//! - Turn detection states into weighted vendor scores.
//! - Rank scored vendors and diff two rankings.
//! - Summarize per-category coverage and classify risk.
//!
//! # Invariants
//! - No I/O; every function is deterministic for the same input.
//! - `max_possible_score` uses active points for every weighted detection, so
//!   `0 <= score_percentage <= 100` whenever points are non-negative.

pub mod coverage;
pub mod engine;
pub mod ranking;

pub use coverage::{category_coverage, CategoryCoverage, RiskLevel, RiskThresholds};
pub use engine::{
    round2, score_detections, CategoryContribution, PointScale, ScoreBreakdown, WeightTable,
    DEFAULT_WEIGHT,
};
pub use ranking::{diff_rankings, rank_scores, RankChange, RankEntry, RankedVendor};
