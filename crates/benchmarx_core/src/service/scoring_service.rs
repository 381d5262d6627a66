//! Scoring, ranking and simulation use-cases.
//!
//! # Responsibility
//! - Resolve the active benchmark and scoring rule for every computation.
//! - Score, rank and compare vendors under a context profile's weights.
//! - Materialize scores for trend comparisons across benchmarks.
//! - Run what-if simulations that never touch storage.
//!
//! # Invariants
//! - An omitted benchmark always means the active benchmark.
//! - Materialization writes every context × vendor row in one transaction.
//! - Simulations only read; their results are never persisted.

use crate::config::ScoringConfig;
use crate::model::benchmark::{Benchmark, BenchmarkId};
use crate::model::catalog::{AttackId, CategoryId};
use crate::model::context::{
    validate_weight, CompanySize, ContextId, ContextProfile, SecurityMaturity,
};
use crate::model::detection::ScoredDetection;
use crate::model::rule::{ScoredResult, ScoringRule};
use crate::model::vendor::{Vendor, VendorId, VendorType};
use crate::repo::benchmark_repo::{BenchmarkRepository, SqliteBenchmarkRepository};
use crate::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use crate::repo::context_repo::{ContextRepository, SqliteContextRepository};
use crate::repo::score_repo::{ScoreRepository, SqliteScoreRepository};
use crate::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use crate::repo::RepoError;
use crate::scoring::{
    category_coverage, diff_rankings, rank_scores, round2, score_detections, CategoryCoverage,
    PointScale, RankChange, RankEntry, RankedVendor, RiskLevel, RiskThresholds, ScoreBreakdown,
    WeightTable, DEFAULT_WEIGHT,
};
use log::{debug, error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

pub type ScoringResult<T> = Result<T, ScoringError>;

/// Service error for scoring use-cases.
#[derive(Debug)]
pub enum ScoringError {
    NoActiveBenchmark,
    NoActiveScoringRule,
    BenchmarkNotFound(BenchmarkId),
    VendorNotFound(VendorId),
    ContextNotFound(ContextId),
    CategoryNotFound(CategoryId),
    /// Nothing has been materialized yet for `(vendor, context)`.
    NoScoredResults {
        vendor_id: VendorId,
        context_id: ContextId,
    },
    /// Simulated weight outside the configured slider range.
    WeightOutOfRange {
        category_id: CategoryId,
        weight: f64,
        min: f64,
        max: f64,
    },
    Repo(RepoError),
}

impl Display for ScoringError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActiveBenchmark => write!(f, "no active benchmark; activate one first"),
            Self::NoActiveScoringRule => write!(f, "no active scoring rule; activate one first"),
            Self::BenchmarkNotFound(id) => write!(f, "benchmark not found: {id}"),
            Self::VendorNotFound(id) => write!(f, "vendor not found: {id}"),
            Self::ContextNotFound(id) => write!(f, "context profile not found: {id}"),
            Self::CategoryNotFound(id) => write!(f, "attack category not found: {id}"),
            Self::NoScoredResults {
                vendor_id,
                context_id,
            } => write!(
                f,
                "no materialized score for vendor {vendor_id} in context {context_id}"
            ),
            Self::WeightOutOfRange {
                category_id,
                weight,
                min,
                max,
            } => write!(
                f,
                "weight {weight} for category {category_id} is outside {min}..={max}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ScoringError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ScoringError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for ScoringError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Live score of one vendor under one context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorScore {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub vendor_type: VendorType,
    pub context_id: ContextId,
    pub context_name: String,
    pub benchmark_id: BenchmarkId,
    pub scoring_version: String,
    #[serde(flatten)]
    pub score: ScoreBreakdown,
}

/// Materialized score plus the names needed to read it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreExplanation {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub context_id: ContextId,
    pub context_name: String,
    pub benchmark_id: BenchmarkId,
    /// `None` when the benchmark row is gone.
    pub benchmark_name: Option<String>,
    pub scoring_version: String,
    /// Points of the rule the row was computed with, when still stored.
    pub points: Option<PointScale>,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub score_percentage: f64,
    pub active_count: u32,
    pub dynamic_count: u32,
    pub no_evid_count: u32,
    pub calculation_metadata: Option<serde_json::Value>,
    pub calculated_at: i64,
}

/// Side-by-side entry for vendor comparisons.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorComparison {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub vendor_type: VendorType,
    pub score: ScoreBreakdown,
    pub coverage: Vec<CategoryCoverage>,
}

/// One benchmark in a vendor's score history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkTrendPoint {
    pub benchmark_id: BenchmarkId,
    pub benchmark_name: String,
    pub source: String,
    pub report_date: chrono::NaiveDate,
    /// Rank among vendors materialized for the same benchmark and context.
    pub rank: u32,
    pub vendor_count: u32,
    pub total_score: f64,
    pub score_percentage: f64,
    /// Percentage change against the previous benchmark; `None` for the first.
    pub score_change: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    #[serde(flatten)]
    pub coverage: CategoryCoverage,
    pub risk_level: RiskLevel,
}

/// Per-category risk view of one vendor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskHeatmap {
    pub vendor_id: VendorId,
    pub vendor_name: String,
    pub benchmark_id: BenchmarkId,
    pub benchmark_name: String,
    pub cells: Vec<HeatmapCell>,
}

/// Category weight as seen by a simulation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightOverride {
    pub category_id: CategoryId,
    pub category_name: String,
    pub original_weight: f64,
    pub simulated_weight: f64,
}

/// Original and simulated rankings with the vendors that moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub context_id: ContextId,
    pub benchmark_id: BenchmarkId,
    pub scoring_version: String,
    pub overrides: Vec<WeightOverride>,
    pub original: Vec<RankedVendor>,
    pub simulated: Vec<RankedVendor>,
    pub changes: Vec<RankChange>,
}

/// One vendor's standing under one context profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextPerformance {
    pub context_id: ContextId,
    pub context_name: String,
    pub industry: String,
    pub company_size: CompanySize,
    pub security_maturity: SecurityMaturity,
    pub rank: u32,
    /// Vendors ranked under this context.
    pub vendor_count: u32,
    pub total_score: f64,
    pub max_possible_score: f64,
    pub score_percentage: f64,
}

/// Store-wide counts for the overview screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub vendor_count: u32,
    pub category_count: u32,
    pub attack_count: u32,
    pub benchmark_count: u32,
    pub context_count: u32,
    pub detection_count: u32,
    pub scored_result_count: u32,
    pub active_benchmark: Option<Benchmark>,
    pub active_rule: Option<ScoringRule>,
}

/// Everything a ranking over one benchmark needs, loaded once.
struct RankingInputs {
    benchmark: Benchmark,
    rule: ScoringRule,
    base_weights: WeightTable,
    detections: BTreeMap<VendorId, Vec<ScoredDetection>>,
    vendors: HashMap<VendorId, Vendor>,
}

impl RankingInputs {
    fn rank(&self, weights: &WeightTable) -> Vec<RankedVendor> {
        let scale = PointScale::from(&self.rule);
        let entries = self
            .detections
            .iter()
            .filter_map(|(vendor_id, detections)| {
                let vendor = self.vendors.get(vendor_id)?;
                Some(RankEntry {
                    vendor_id: *vendor_id,
                    vendor_name: vendor.name.clone(),
                    vendor_type: vendor.vendor_type,
                    score: score_detections(&scale, weights, detections),
                })
            })
            .collect();
        rank_scores(entries)
    }

    fn attack_categories(&self) -> HashMap<AttackId, CategoryId> {
        self.detections
            .values()
            .flatten()
            .map(|detection| (detection.attack_id, detection.category_id))
            .collect()
    }
}

/// Scoring facade over the SQLite repositories.
pub struct ScoringService<'conn> {
    conn: &'conn Connection,
    vendors: SqliteVendorRepository<'conn>,
    catalog: SqliteCatalogRepository<'conn>,
    benchmarks: SqliteBenchmarkRepository<'conn>,
    contexts: SqliteContextRepository<'conn>,
    scores: SqliteScoreRepository<'conn>,
    settings: ScoringConfig,
    risk: RiskThresholds,
}

impl<'conn> ScoringService<'conn> {
    /// Creates a service with default settings over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ScoringResult<Self> {
        Ok(Self {
            conn,
            vendors: SqliteVendorRepository::try_new(conn)?,
            catalog: SqliteCatalogRepository::try_new(conn)?,
            benchmarks: SqliteBenchmarkRepository::try_new(conn)?,
            contexts: SqliteContextRepository::try_new(conn)?,
            scores: SqliteScoreRepository::try_new(conn)?,
            settings: ScoringConfig::default(),
            risk: RiskThresholds::default(),
        })
    }

    pub fn with_settings(mut self, settings: ScoringConfig, risk: RiskThresholds) -> Self {
        self.settings = settings;
        self.risk = risk;
        self
    }

    /// Scores one vendor on one benchmark under a context's weights.
    pub fn calculate_vendor_score(
        &self,
        vendor_id: VendorId,
        context_id: ContextId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<VendorScore> {
        let vendor = self.require_vendor(vendor_id)?;
        let context = self.require_context(context_id)?;
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let rule = self.require_active_rule()?;

        let weights = self.context_weights(context.id)?;
        let detections = self.benchmarks.vendor_detections(vendor.id, benchmark.id)?;
        let score = score_detections(&PointScale::from(&rule), &weights, &detections);

        Ok(VendorScore {
            vendor_id: vendor.id,
            vendor_name: vendor.name,
            vendor_type: vendor.vendor_type,
            context_id: context.id,
            context_name: context.name,
            benchmark_id: benchmark.id,
            scoring_version: rule.version,
            score,
        })
    }

    /// Ranks every vendor with at least one detection in the benchmark.
    pub fn vendor_ranking(
        &self,
        context_id: ContextId,
        benchmark_id: Option<BenchmarkId>,
        limit: Option<usize>,
    ) -> ScoringResult<Vec<RankedVendor>> {
        self.require_context(context_id)?;
        let inputs = self.ranking_inputs(context_id, benchmark_id)?;
        let mut ranking = inputs.rank(&inputs.base_weights);
        if let Some(limit) = limit {
            ranking.truncate(limit);
        }
        Ok(ranking)
    }

    /// Rank and score of one vendor under every context profile.
    ///
    /// Detections are loaded once and re-ranked with each context's weights.
    /// A vendor without detections in the benchmark yields an empty list.
    pub fn vendor_context_performance(
        &self,
        vendor_id: VendorId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<Vec<ContextPerformance>> {
        let vendor = self.require_vendor(vendor_id)?;
        let inputs = self.benchmark_inputs(benchmark_id, WeightTable::default())?;
        if !inputs.detections.contains_key(&vendor.id) {
            return Ok(Vec::new());
        }

        let mut rows = Vec::new();
        for context in self.contexts.list_contexts()? {
            let ranking = inputs.rank(&self.context_weights(context.id)?);
            let vendor_count = u32::try_from(ranking.len()).unwrap_or(u32::MAX);
            let Some(ranked) = ranking.into_iter().find(|ranked| ranked.vendor_id == vendor.id)
            else {
                continue;
            };
            rows.push(ContextPerformance {
                context_id: context.id,
                context_name: context.name,
                industry: context.industry,
                company_size: context.company_size,
                security_maturity: context.security_maturity,
                rank: ranked.rank,
                vendor_count,
                total_score: ranked.score.total_score,
                max_possible_score: ranked.score.max_possible_score,
                score_percentage: ranked.score.score_percentage,
            });
        }
        debug!(
            "event=vendor_profile module=service status=ok vendor_id={} benchmark_id={} contexts={}",
            vendor.id,
            inputs.benchmark.id,
            rows.len()
        );
        Ok(rows)
    }

    /// Per-category detection coverage of one vendor.
    pub fn category_coverage(
        &self,
        vendor_id: VendorId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<Vec<CategoryCoverage>> {
        let vendor = self.require_vendor(vendor_id)?;
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let detections = self.benchmarks.vendor_detections(vendor.id, benchmark.id)?;
        Ok(category_coverage(&detections))
    }

    /// Coverage per category classified into risk levels.
    pub fn risk_heatmap(
        &self,
        vendor_id: VendorId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<RiskHeatmap> {
        let vendor = self.require_vendor(vendor_id)?;
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let detections = self.benchmarks.vendor_detections(vendor.id, benchmark.id)?;

        let cells = category_coverage(&detections)
            .into_iter()
            .map(|coverage| HeatmapCell {
                risk_level: RiskLevel::classify(
                    coverage.coverage_percentage,
                    coverage.no_evidence,
                    &self.risk,
                ),
                coverage,
            })
            .collect();

        Ok(RiskHeatmap {
            vendor_id: vendor.id,
            vendor_name: vendor.name,
            benchmark_id: benchmark.id,
            benchmark_name: benchmark.name,
            cells,
        })
    }

    /// Writes a scored row for every context × vendor of the benchmark under
    /// the active rule, replacing earlier rows of the same rule version.
    ///
    /// Returns the number of rows written.
    pub fn materialize_scores(&self, benchmark_id: Option<BenchmarkId>) -> ScoringResult<usize> {
        let started_at = Instant::now();
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let rule = self.require_active_rule()?;

        match self.write_scored_results(&benchmark, &rule) {
            Ok(written) => {
                info!(
                    "event=scores_materialize module=service status=ok benchmark_id={} scoring_version={} rows={} duration_ms={}",
                    benchmark.id,
                    rule.version,
                    written,
                    started_at.elapsed().as_millis()
                );
                Ok(written)
            }
            Err(err) => {
                error!(
                    "event=scores_materialize module=service status=error benchmark_id={} scoring_version={} duration_ms={} error={}",
                    benchmark.id,
                    rule.version,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn write_scored_results(
        &self,
        benchmark: &Benchmark,
        rule: &ScoringRule,
    ) -> ScoringResult<usize> {
        let scale = PointScale::from(rule);
        let contexts = self.contexts.list_contexts()?;
        let detections = self.benchmarks.benchmark_detections(benchmark.id)?;
        let created_at = chrono::Utc::now().timestamp_millis();

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut written = 0;
        for context in &contexts {
            let weights = self.context_weights(context.id)?;
            for (vendor_id, vendor_detections) in &detections {
                let score = score_detections(&scale, &weights, vendor_detections);
                let metadata = calculation_metadata(benchmark, rule, &weights, &score);
                self.scores.replace_scored_result(&ScoredResult {
                    id: Uuid::new_v4(),
                    benchmark_id: benchmark.id,
                    context_id: context.id,
                    vendor_id: *vendor_id,
                    scoring_version: rule.version.clone(),
                    total_score: score.total_score,
                    max_possible_score: score.max_possible_score,
                    score_percentage: score.score_percentage,
                    active_count: score.active_count,
                    dynamic_count: score.dynamic_count,
                    no_evid_count: score.no_evid_count,
                    calculation_metadata: Some(metadata),
                    created_at,
                })?;
                written += 1;
            }
        }
        tx.commit()?;
        Ok(written)
    }

    /// Reads back the most recent materialized score of `(vendor, context)`.
    pub fn explain_score(
        &self,
        vendor_id: VendorId,
        context_id: ContextId,
    ) -> ScoringResult<ScoreExplanation> {
        let vendor = self.require_vendor(vendor_id)?;
        let context = self.require_context(context_id)?;
        let result = self
            .scores
            .latest_scored_result(context.id, vendor.id)?
            .ok_or(ScoringError::NoScoredResults {
                vendor_id,
                context_id,
            })?;
        let points = self
            .scores
            .get_rule(&result.scoring_version)?
            .map(|rule| PointScale::from(&rule));
        let benchmark_name = self
            .benchmarks
            .get_benchmark(result.benchmark_id)?
            .map(|benchmark| benchmark.name);

        Ok(ScoreExplanation {
            vendor_id: vendor.id,
            vendor_name: vendor.name,
            context_id: context.id,
            context_name: context.name,
            benchmark_id: result.benchmark_id,
            benchmark_name,
            scoring_version: result.scoring_version,
            points,
            total_score: result.total_score,
            max_possible_score: result.max_possible_score,
            score_percentage: result.score_percentage,
            active_count: result.active_count,
            dynamic_count: result.dynamic_count,
            no_evid_count: result.no_evid_count,
            calculation_metadata: result.calculation_metadata,
            calculated_at: result.created_at,
        })
    }

    /// Scores and coverage of the given vendors, best first.
    ///
    /// Unknown and repeated vendor ids are skipped.
    pub fn compare_vendors(
        &self,
        vendor_ids: &[VendorId],
        context_id: ContextId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<Vec<VendorComparison>> {
        self.require_context(context_id)?;
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let rule = self.require_active_rule()?;
        let scale = PointScale::from(&rule);
        let weights = self.context_weights(context_id)?;

        let mut seen = HashSet::new();
        let mut comparisons = Vec::new();
        for vendor_id in vendor_ids {
            if !seen.insert(*vendor_id) {
                continue;
            }
            let Some(vendor) = self.vendors.get_vendor(*vendor_id)? else {
                debug!(
                    "event=vendor_compare module=service status=skipped vendor_id={}",
                    vendor_id
                );
                continue;
            };
            let detections = self.benchmarks.vendor_detections(vendor.id, benchmark.id)?;
            comparisons.push(VendorComparison {
                vendor_id: vendor.id,
                vendor_name: vendor.name,
                vendor_type: vendor.vendor_type,
                score: score_detections(&scale, &weights, &detections),
                coverage: category_coverage(&detections),
            });
        }

        comparisons.sort_by(|left, right| {
            right
                .score
                .score_percentage
                .total_cmp(&left.score.score_percentage)
                .then_with(|| {
                    left.vendor_name
                        .to_lowercase()
                        .cmp(&right.vendor_name.to_lowercase())
                })
        });
        Ok(comparisons)
    }

    /// Materialized history of one vendor, oldest benchmark first.
    ///
    /// Only rows of the active rule version are considered. `benchmark_filter`
    /// restricts the history to the listed benchmarks.
    pub fn compare_vendor_across_benchmarks(
        &self,
        vendor_id: VendorId,
        context_id: ContextId,
        benchmark_filter: Option<&[BenchmarkId]>,
    ) -> ScoringResult<Vec<BenchmarkTrendPoint>> {
        self.require_vendor(vendor_id)?;
        self.require_context(context_id)?;
        let rule = self.require_active_rule()?;

        let mut rows_by_benchmark: HashMap<BenchmarkId, Vec<ScoredResult>> = HashMap::new();
        for row in self
            .scores
            .scored_results_for_context(context_id, &rule.version)?
        {
            if benchmark_filter.map_or(true, |ids| ids.contains(&row.benchmark_id)) {
                rows_by_benchmark
                    .entry(row.benchmark_id)
                    .or_default()
                    .push(row);
            }
        }

        let vendors = self.vendor_map()?;
        let mut benchmarks = self.benchmarks.list_benchmarks()?;
        benchmarks.sort_by(|left, right| {
            left.report_date
                .cmp(&right.report_date)
                .then_with(|| left.name.to_lowercase().cmp(&right.name.to_lowercase()))
        });

        let mut history: Vec<BenchmarkTrendPoint> = Vec::new();
        for benchmark in benchmarks {
            let Some(rows) = rows_by_benchmark.remove(&benchmark.id) else {
                continue;
            };
            let ranking = rank_materialized(rows, &vendors);
            let Some(entry) = ranking.iter().find(|ranked| ranked.vendor_id == vendor_id) else {
                continue;
            };
            let score_change = history
                .last()
                .map(|previous| round2(entry.score.score_percentage - previous.score_percentage));
            history.push(BenchmarkTrendPoint {
                benchmark_id: benchmark.id,
                benchmark_name: benchmark.name,
                source: benchmark.source,
                report_date: benchmark.report_date,
                rank: entry.rank,
                vendor_count: u32::try_from(ranking.len()).unwrap_or(u32::MAX),
                total_score: entry.score.total_score,
                score_percentage: entry.score.score_percentage,
                score_change,
            });
        }
        Ok(history)
    }

    /// Ranks the benchmark with category weights replaced by `overrides`.
    ///
    /// Read-only. Overrides must name existing categories and stay within the
    /// configured weight range.
    pub fn simulate_ranking(
        &self,
        context_id: ContextId,
        overrides: &HashMap<CategoryId, f64>,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<Vec<RankedVendor>> {
        Ok(self
            .simulate_with_diff(context_id, overrides, benchmark_id)?
            .simulated)
    }

    /// Runs a simulation and reports both rankings and the vendors that moved.
    pub fn simulate_with_diff(
        &self,
        context_id: ContextId,
        overrides: &HashMap<CategoryId, f64>,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<SimulationReport> {
        let started_at = Instant::now();
        self.require_context(context_id)?;
        let override_rows = self.check_overrides(context_id, overrides)?;
        let inputs = self.ranking_inputs(context_id, benchmark_id)?;

        let simulated_weights = inputs
            .base_weights
            .with_category_overrides(overrides, &inputs.attack_categories());
        let original = inputs.rank(&inputs.base_weights);
        let simulated = inputs.rank(&simulated_weights);
        let changes = diff_rankings(&original, &simulated, self.settings.min_score_delta);

        info!(
            "event=ranking_simulate module=service status=ok context_id={} benchmark_id={} overrides={} vendors={} changes={} duration_ms={}",
            context_id,
            inputs.benchmark.id,
            overrides.len(),
            simulated.len(),
            changes.len(),
            started_at.elapsed().as_millis()
        );

        Ok(SimulationReport {
            context_id,
            benchmark_id: inputs.benchmark.id,
            scoring_version: inputs.rule.version,
            overrides: override_rows,
            original,
            simulated,
            changes,
        })
    }

    /// Counts and active selections for the overview screen.
    pub fn dashboard_summary(&self) -> ScoringResult<DashboardSummary> {
        Ok(DashboardSummary {
            vendor_count: self.vendors.count_vendors()?,
            category_count: u32::try_from(self.catalog.list_categories()?.len())
                .unwrap_or(u32::MAX),
            attack_count: self.catalog.count_attacks()?,
            benchmark_count: u32::try_from(self.benchmarks.list_benchmarks()?.len())
                .unwrap_or(u32::MAX),
            context_count: self.contexts.count_contexts()?,
            detection_count: self.benchmarks.count_detections()?,
            scored_result_count: self.scores.count_scored_results()?,
            active_benchmark: self.benchmarks.active_benchmark()?,
            active_rule: self.scores.active_rule()?,
        })
    }

    fn resolve_benchmark(&self, benchmark_id: Option<BenchmarkId>) -> ScoringResult<Benchmark> {
        match benchmark_id {
            Some(id) => self
                .benchmarks
                .get_benchmark(id)?
                .ok_or(ScoringError::BenchmarkNotFound(id)),
            None => self
                .benchmarks
                .active_benchmark()?
                .ok_or(ScoringError::NoActiveBenchmark),
        }
    }

    fn require_active_rule(&self) -> ScoringResult<ScoringRule> {
        self.scores
            .active_rule()?
            .ok_or(ScoringError::NoActiveScoringRule)
    }

    fn require_vendor(&self, vendor_id: VendorId) -> ScoringResult<Vendor> {
        self.vendors
            .get_vendor(vendor_id)?
            .ok_or(ScoringError::VendorNotFound(vendor_id))
    }

    fn require_context(&self, context_id: ContextId) -> ScoringResult<ContextProfile> {
        self.contexts
            .get_context(context_id)?
            .ok_or(ScoringError::ContextNotFound(context_id))
    }

    fn context_weights(&self, context_id: ContextId) -> ScoringResult<WeightTable> {
        Ok(WeightTable::from_weights(
            &self.contexts.list_weights(context_id)?,
        ))
    }

    fn vendor_map(&self) -> ScoringResult<HashMap<VendorId, Vendor>> {
        Ok(self
            .vendors
            .list_vendors()?
            .into_iter()
            .map(|vendor| (vendor.id, vendor))
            .collect())
    }

    fn ranking_inputs(
        &self,
        context_id: ContextId,
        benchmark_id: Option<BenchmarkId>,
    ) -> ScoringResult<RankingInputs> {
        let base_weights = self.context_weights(context_id)?;
        self.benchmark_inputs(benchmark_id, base_weights)
    }

    fn benchmark_inputs(
        &self,
        benchmark_id: Option<BenchmarkId>,
        base_weights: WeightTable,
    ) -> ScoringResult<RankingInputs> {
        let benchmark = self.resolve_benchmark(benchmark_id)?;
        let rule = self.require_active_rule()?;
        Ok(RankingInputs {
            base_weights,
            detections: self.benchmarks.benchmark_detections(benchmark.id)?,
            vendors: self.vendor_map()?,
            benchmark,
            rule,
        })
    }

    fn check_overrides(
        &self,
        context_id: ContextId,
        overrides: &HashMap<CategoryId, f64>,
    ) -> ScoringResult<Vec<WeightOverride>> {
        let (min, max) = (self.settings.weight_min, self.settings.weight_max);
        let mut rows = Vec::with_capacity(overrides.len());
        for (category_id, weight) in overrides {
            validate_weight(*weight).map_err(RepoError::from)?;
            if *weight < min || *weight > max {
                return Err(ScoringError::WeightOutOfRange {
                    category_id: *category_id,
                    weight: *weight,
                    min,
                    max,
                });
            }
            let category = self
                .catalog
                .get_category(*category_id)?
                .ok_or(ScoringError::CategoryNotFound(*category_id))?;
            let original_weight = self
                .contexts
                .category_weight(context_id, *category_id)?
                .unwrap_or(DEFAULT_WEIGHT);
            rows.push(WeightOverride {
                category_id: *category_id,
                category_name: category.name,
                original_weight,
                simulated_weight: *weight,
            });
        }
        rows.sort_by(|left, right| {
            left.category_name
                .to_lowercase()
                .cmp(&right.category_name.to_lowercase())
        });
        Ok(rows)
    }
}

/// Ranks materialized rows of one benchmark with the live ranking order.
fn rank_materialized(
    rows: Vec<ScoredResult>,
    vendors: &HashMap<VendorId, Vendor>,
) -> Vec<RankedVendor> {
    let entries = rows
        .into_iter()
        .map(|row| {
            let (vendor_name, vendor_type) = vendors
                .get(&row.vendor_id)
                .map(|vendor| (vendor.name.clone(), vendor.vendor_type))
                .unwrap_or_else(|| (row.vendor_id.to_string(), VendorType::Other));
            RankEntry {
                vendor_id: row.vendor_id,
                vendor_name,
                vendor_type,
                score: ScoreBreakdown {
                    total_score: row.total_score,
                    max_possible_score: row.max_possible_score,
                    score_percentage: row.score_percentage,
                    active_count: row.active_count,
                    dynamic_count: row.dynamic_count,
                    no_evid_count: row.no_evid_count,
                    categories: Vec::new(),
                },
            }
        })
        .collect();
    rank_scores(entries)
}

fn calculation_metadata(
    benchmark: &Benchmark,
    rule: &ScoringRule,
    weights: &WeightTable,
    score: &ScoreBreakdown,
) -> serde_json::Value {
    let categories: Vec<serde_json::Value> = score
        .categories
        .iter()
        .map(|contribution| {
            json!({
                "category_id": contribution.category_id,
                "category_name": contribution.category_name,
                "category_weight": weights.category_weight(contribution.category_id),
                "detections": contribution.detections,
                "earned": contribution.earned,
                "possible": contribution.possible,
            })
        })
        .collect();

    json!({
        "benchmark": {
            "id": benchmark.id,
            "name": benchmark.name,
            "report_date": benchmark.report_date,
        },
        "scoring_version": rule.version,
        "points": {
            "active": rule.active_points,
            "dynamic": rule.dynamic_points,
            "no_evid": rule.no_evid_points,
        },
        "categories": categories,
    })
}
