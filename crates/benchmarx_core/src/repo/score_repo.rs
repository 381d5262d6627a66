//! Scoring rule and materialized score repository.
//!
//! # Invariants
//! - At most one scoring rule is active.
//! - A scored row is unique per `(benchmark, context, vendor, rule version)`;
//!   re-materializing replaces the previous row.

use crate::model::benchmark::BenchmarkId;
use crate::model::context::ContextId;
use crate::model::rule::{ScoredResult, ScoringRule};
use crate::model::vendor::VendorId;
use crate::repo::{
    bool_to_int, count_u32, ensure_connection_ready, int_to_bool, parse_json, parse_uuid,
    RepoError, RepoResult,
};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};

const RULE_SELECT_SQL: &str = "SELECT
    version,
    detection_active_points,
    detection_dynamic_points,
    detection_no_evid_points,
    description,
    created_by,
    is_active
FROM scoring_rules";

const SCORED_SELECT_SQL: &str = "SELECT
    id,
    benchmark_id,
    context_profile_id,
    vendor_id,
    scoring_version,
    total_score,
    max_possible_score,
    score_percentage,
    detection_active_count,
    detection_dynamic_count,
    detection_no_evid_count,
    calculation_metadata,
    created_at
FROM scored_results";

pub trait ScoreRepository {
    /// Inserts a rule. The stored row always starts inactive.
    fn create_rule(&self, rule: &ScoringRule) -> RepoResult<()>;
    fn get_rule(&self, version: &str) -> RepoResult<Option<ScoringRule>>;
    fn list_rules(&self) -> RepoResult<Vec<ScoringRule>>;
    fn active_rule(&self) -> RepoResult<Option<ScoringRule>>;
    fn activate_rule(&self, version: &str) -> RepoResult<()>;
    /// Writes `result`, replacing any row with the same natural key.
    fn replace_scored_result(&self, result: &ScoredResult) -> RepoResult<()>;
    /// Most recent materialized row for `(context, vendor)` across benchmarks.
    ///
    /// Rows stamped in the same millisecond fall back to write order.
    fn latest_scored_result(
        &self,
        context_id: ContextId,
        vendor_id: VendorId,
    ) -> RepoResult<Option<ScoredResult>>;
    /// Rows of one context and rule version, ordered by percentage DESC.
    fn scored_results_for_context(
        &self,
        context_id: ContextId,
        scoring_version: &str,
    ) -> RepoResult<Vec<ScoredResult>>;
    fn scored_results_for_benchmark(
        &self,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<Vec<ScoredResult>>;
    fn count_scored_results(&self) -> RepoResult<u32>;
}

pub struct SqliteScoreRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteScoreRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["scoring_rules", "scored_results"])?;
        Ok(Self { conn })
    }

    fn query_rules(&self, sql: &str, key: Option<&str>) -> RepoResult<Vec<ScoringRule>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key])?,
            None => stmt.query([])?,
        };
        let mut rules = Vec::new();
        while let Some(row) = rows.next()? {
            rules.push(parse_rule_row(row)?);
        }
        Ok(rules)
    }

    fn query_scored(&self, sql: &str, keys: &[String]) -> RepoResult<Vec<ScoredResult>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(keys.iter()))?;
        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            results.push(parse_scored_row(row)?);
        }
        Ok(results)
    }
}

impl ScoreRepository for SqliteScoreRepository<'_> {
    fn create_rule(&self, rule: &ScoringRule) -> RepoResult<()> {
        rule.validate()?;

        self.conn.execute(
            "INSERT INTO scoring_rules (
                version,
                detection_active_points,
                detection_dynamic_points,
                detection_no_evid_points,
                description,
                created_by,
                is_active
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0);",
            params![
                rule.version.trim(),
                rule.active_points,
                rule.dynamic_points,
                rule.no_evid_points,
                rule.description.as_deref(),
                rule.created_by.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn get_rule(&self, version: &str) -> RepoResult<Option<ScoringRule>> {
        let mut rules = self.query_rules(
            &format!("{RULE_SELECT_SQL} WHERE version = ?1;"),
            Some(version.trim()),
        )?;
        Ok(rules.pop())
    }

    fn list_rules(&self) -> RepoResult<Vec<ScoringRule>> {
        self.query_rules(
            &format!("{RULE_SELECT_SQL} ORDER BY created_at DESC, version ASC;"),
            None,
        )
    }

    fn active_rule(&self) -> RepoResult<Option<ScoringRule>> {
        let mut rules =
            self.query_rules(&format!("{RULE_SELECT_SQL} WHERE is_active = 1 LIMIT 1;"), None)?;
        Ok(rules.pop())
    }

    fn activate_rule(&self, version: &str) -> RepoResult<()> {
        let version = version.trim();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM scoring_rules WHERE version = ?1);",
            [version],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("scoring rule", version));
        }

        tx.execute("UPDATE scoring_rules SET is_active = 0 WHERE is_active = 1;", [])?;
        tx.execute(
            "UPDATE scoring_rules SET is_active = ?2 WHERE version = ?1;",
            params![version, bool_to_int(true)],
        )?;
        tx.commit()?;

        info!("event=rule_activate module=repo status=ok version={version}");
        Ok(())
    }

    fn replace_scored_result(&self, result: &ScoredResult) -> RepoResult<()> {
        let metadata = result
            .calculation_metadata
            .as_ref()
            .map(serde_json::Value::to_string);
        self.conn.execute(
            "INSERT OR REPLACE INTO scored_results (
                id,
                benchmark_id,
                context_profile_id,
                vendor_id,
                scoring_version,
                total_score,
                max_possible_score,
                score_percentage,
                detection_active_count,
                detection_dynamic_count,
                detection_no_evid_count,
                calculation_metadata,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13);",
            params![
                result.id.to_string(),
                result.benchmark_id.to_string(),
                result.context_id.to_string(),
                result.vendor_id.to_string(),
                result.scoring_version.as_str(),
                result.total_score,
                result.max_possible_score,
                result.score_percentage,
                result.active_count,
                result.dynamic_count,
                result.no_evid_count,
                metadata,
                result.created_at,
            ],
        )?;
        Ok(())
    }

    fn latest_scored_result(
        &self,
        context_id: ContextId,
        vendor_id: VendorId,
    ) -> RepoResult<Option<ScoredResult>> {
        let mut results = self.query_scored(
            &format!(
                "{SCORED_SELECT_SQL}
                 WHERE context_profile_id = ?1
                   AND vendor_id = ?2
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT 1;"
            ),
            &[context_id.to_string(), vendor_id.to_string()],
        )?;
        Ok(results.pop())
    }

    fn scored_results_for_context(
        &self,
        context_id: ContextId,
        scoring_version: &str,
    ) -> RepoResult<Vec<ScoredResult>> {
        self.query_scored(
            &format!(
                "{SCORED_SELECT_SQL}
                 WHERE context_profile_id = ?1
                   AND scoring_version = ?2
                 ORDER BY score_percentage DESC, vendor_id ASC;"
            ),
            &[context_id.to_string(), scoring_version.to_string()],
        )
    }

    fn scored_results_for_benchmark(
        &self,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<Vec<ScoredResult>> {
        self.query_scored(
            &format!(
                "{SCORED_SELECT_SQL}
                 WHERE benchmark_id = ?1
                 ORDER BY context_profile_id ASC, score_percentage DESC, vendor_id ASC;"
            ),
            &[benchmark_id.to_string()],
        )
    }

    fn count_scored_results(&self) -> RepoResult<u32> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM scored_results;", [], |row| row.get(0))?;
        count_u32(count, "scored_results")
    }
}

fn parse_rule_row(row: &Row<'_>) -> RepoResult<ScoringRule> {
    let rule = ScoringRule {
        version: row.get("version")?,
        active_points: row.get("detection_active_points")?,
        dynamic_points: row.get("detection_dynamic_points")?,
        no_evid_points: row.get("detection_no_evid_points")?,
        description: row.get("description")?,
        created_by: row.get("created_by")?,
        is_active: int_to_bool(row.get("is_active")?, "scoring_rules.is_active")?,
    };
    rule.validate()?;
    Ok(rule)
}

fn parse_scored_row(row: &Row<'_>) -> RepoResult<ScoredResult> {
    let id_text: String = row.get("id")?;
    let benchmark_text: String = row.get("benchmark_id")?;
    let context_text: String = row.get("context_profile_id")?;
    let vendor_text: String = row.get("vendor_id")?;

    Ok(ScoredResult {
        id: parse_uuid(&id_text, "scored_results.id")?,
        benchmark_id: parse_uuid(&benchmark_text, "scored_results.benchmark_id")?,
        context_id: parse_uuid(&context_text, "scored_results.context_profile_id")?,
        vendor_id: parse_uuid(&vendor_text, "scored_results.vendor_id")?,
        scoring_version: row.get("scoring_version")?,
        total_score: row.get("total_score")?,
        max_possible_score: row.get("max_possible_score")?,
        score_percentage: row.get("score_percentage")?,
        active_count: count_u32(row.get("detection_active_count")?, "detection_active_count")?,
        dynamic_count: count_u32(
            row.get("detection_dynamic_count")?,
            "detection_dynamic_count",
        )?,
        no_evid_count: count_u32(
            row.get("detection_no_evid_count")?,
            "detection_no_evid_count",
        )?,
        calculation_metadata: parse_json(
            row.get("calculation_metadata")?,
            "scored_results.calculation_metadata",
        )?,
        created_at: row.get("created_at")?,
    })
}
