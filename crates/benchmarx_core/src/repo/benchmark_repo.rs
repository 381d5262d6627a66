//! Benchmark and detection result repository.
//!
//! # Responsibility
//! - Persist benchmark metadata and the per-attack detection rows.
//! - Serve the joined detection shape consumed by the scoring engine.
//!
//! # Invariants
//! - `set_active_benchmark` leaves exactly one active benchmark.
//! - Detection rows are unique per `(benchmark, vendor, attack)`; writes upsert.

use crate::model::benchmark::{Benchmark, BenchmarkId, BenchmarkStats};
use crate::model::detection::{DetectionResult, DetectionState, ScoredDetection};
use crate::model::vendor::VendorId;
use crate::repo::{
    bool_to_int, count_u32, ensure_connection_ready, int_to_bool, parse_date, parse_json,
    parse_uuid, RepoError, RepoResult,
};
use log::info;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;

const BENCHMARK_SELECT_SQL: &str = "SELECT
    id,
    name,
    source,
    report_date,
    description,
    imported_at,
    imported_by,
    is_active,
    metadata
FROM benchmarks";

const DETECTION_SELECT_SQL: &str = "SELECT
    dr.vendor_id AS vendor_id,
    dr.attack_id AS attack_id,
    dr.detection_state AS detection_state,
    a.name AS attack_name,
    a.category_id AS category_id,
    c.name AS category_name
FROM detection_results dr
INNER JOIN attacks a ON a.id = dr.attack_id
INNER JOIN attack_categories c ON c.id = a.category_id";

pub trait BenchmarkRepository {
    /// Inserts a benchmark. The stored row always starts inactive.
    fn create_benchmark(&self, benchmark: &Benchmark) -> RepoResult<BenchmarkId>;
    fn get_benchmark(&self, id: BenchmarkId) -> RepoResult<Option<Benchmark>>;
    fn find_benchmark_by_name(&self, name: &str) -> RepoResult<Option<Benchmark>>;
    /// Lists benchmarks by `report_date DESC, name ASC`.
    fn list_benchmarks(&self) -> RepoResult<Vec<Benchmark>>;
    fn active_benchmark(&self) -> RepoResult<Option<Benchmark>>;
    fn set_active_benchmark(&self, id: BenchmarkId) -> RepoResult<()>;
    fn benchmark_stats(&self, id: BenchmarkId) -> RepoResult<BenchmarkStats>;
    fn upsert_detection(&self, detection: &DetectionResult) -> RepoResult<()>;
    /// Detections for one vendor, ordered by category then attack name.
    fn vendor_detections(
        &self,
        vendor_id: VendorId,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<Vec<ScoredDetection>>;
    /// All detections of a benchmark grouped by vendor in a single query.
    fn benchmark_detections(
        &self,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<BTreeMap<VendorId, Vec<ScoredDetection>>>;
    fn count_detections(&self) -> RepoResult<u32>;
}

pub struct SqliteBenchmarkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBenchmarkRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["benchmarks", "detection_results"])?;
        Ok(Self { conn })
    }

    fn query_benchmarks(&self, sql: &str, key: Option<&str>) -> RepoResult<Vec<Benchmark>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = match key {
            Some(key) => stmt.query([key])?,
            None => stmt.query([])?,
        };
        let mut benchmarks = Vec::new();
        while let Some(row) = rows.next()? {
            benchmarks.push(parse_benchmark_row(row)?);
        }
        Ok(benchmarks)
    }
}

impl BenchmarkRepository for SqliteBenchmarkRepository<'_> {
    fn create_benchmark(&self, benchmark: &Benchmark) -> RepoResult<BenchmarkId> {
        benchmark.validate()?;

        let metadata = benchmark
            .metadata
            .as_ref()
            .map(serde_json::Value::to_string);
        self.conn.execute(
            "INSERT INTO benchmarks (
                id,
                name,
                source,
                report_date,
                description,
                imported_by,
                is_active,
                metadata
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7);",
            params![
                benchmark.id.to_string(),
                benchmark.name.trim(),
                benchmark.source.trim(),
                benchmark.report_date.to_string(),
                benchmark.description.as_deref(),
                benchmark.imported_by.as_deref(),
                metadata,
            ],
        )?;

        info!(
            "event=benchmark_create module=repo status=ok benchmark_id={}",
            benchmark.id
        );
        Ok(benchmark.id)
    }

    fn get_benchmark(&self, id: BenchmarkId) -> RepoResult<Option<Benchmark>> {
        let id_text = id.to_string();
        let mut benchmarks = self.query_benchmarks(
            &format!("{BENCHMARK_SELECT_SQL} WHERE id = ?1;"),
            Some(id_text.as_str()),
        )?;
        Ok(benchmarks.pop())
    }

    fn find_benchmark_by_name(&self, name: &str) -> RepoResult<Option<Benchmark>> {
        let mut benchmarks = self.query_benchmarks(
            &format!("{BENCHMARK_SELECT_SQL} WHERE name = ?1 COLLATE NOCASE;"),
            Some(name.trim()),
        )?;
        Ok(benchmarks.pop())
    }

    fn list_benchmarks(&self) -> RepoResult<Vec<Benchmark>> {
        self.query_benchmarks(
            &format!(
                "{BENCHMARK_SELECT_SQL} ORDER BY report_date DESC, name COLLATE NOCASE ASC;"
            ),
            None,
        )
    }

    fn active_benchmark(&self) -> RepoResult<Option<Benchmark>> {
        let mut benchmarks = self.query_benchmarks(
            &format!("{BENCHMARK_SELECT_SQL} WHERE is_active = 1 LIMIT 1;"),
            None,
        )?;
        Ok(benchmarks.pop())
    }

    fn set_active_benchmark(&self, id: BenchmarkId) -> RepoResult<()> {
        let id_text = id.to_string();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let exists: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM benchmarks WHERE id = ?1);",
            [id_text.as_str()],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::not_found("benchmark", id));
        }

        tx.execute("UPDATE benchmarks SET is_active = 0 WHERE is_active = 1;", [])?;
        tx.execute(
            "UPDATE benchmarks SET is_active = ?2 WHERE id = ?1;",
            params![id_text.as_str(), bool_to_int(true)],
        )?;
        tx.commit()?;

        info!(
            "event=benchmark_activate module=repo status=ok benchmark_id={}",
            id
        );
        Ok(())
    }

    fn benchmark_stats(&self, id: BenchmarkId) -> RepoResult<BenchmarkStats> {
        if self.get_benchmark(id)?.is_none() {
            return Err(RepoError::not_found("benchmark", id));
        }

        let (vendors, attacks, detections, active, dynamic, no_evid): (
            i64,
            i64,
            i64,
            i64,
            i64,
            i64,
        ) = self.conn.query_row(
            "SELECT
                COUNT(DISTINCT vendor_id),
                COUNT(DISTINCT attack_id),
                COUNT(*),
                COALESCE(SUM(CASE WHEN detection_state = 'ACTIVE' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN detection_state = 'DYNAMIC' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN detection_state = 'NO_EVID' THEN 1 ELSE 0 END), 0)
             FROM detection_results
             WHERE benchmark_id = ?1;",
            [id.to_string()],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )?;

        Ok(BenchmarkStats {
            vendor_count: count_u32(vendors, "vendor_count")?,
            attack_count: count_u32(attacks, "attack_count")?,
            detection_count: count_u32(detections, "detection_count")?,
            active_count: count_u32(active, "active_count")?,
            dynamic_count: count_u32(dynamic, "dynamic_count")?,
            no_evid_count: count_u32(no_evid, "no_evid_count")?,
        })
    }

    fn upsert_detection(&self, detection: &DetectionResult) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO detection_results (
                id,
                benchmark_id,
                vendor_id,
                attack_id,
                detection_state,
                notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (benchmark_id, vendor_id, attack_id)
            DO UPDATE SET
                detection_state = excluded.detection_state,
                notes = excluded.notes;",
            params![
                detection.id.to_string(),
                detection.benchmark_id.to_string(),
                detection.vendor_id.to_string(),
                detection.attack_id.to_string(),
                detection.state.as_str(),
                detection.notes.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn vendor_detections(
        &self,
        vendor_id: VendorId,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<Vec<ScoredDetection>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DETECTION_SELECT_SQL}
             WHERE dr.vendor_id = ?1
               AND dr.benchmark_id = ?2
             ORDER BY c.name COLLATE NOCASE ASC, a.name COLLATE NOCASE ASC;"
        ))?;
        let mut rows = stmt.query([vendor_id.to_string(), benchmark_id.to_string()])?;
        let mut detections = Vec::new();
        while let Some(row) = rows.next()? {
            detections.push(parse_detection_row(row)?.1);
        }
        Ok(detections)
    }

    fn benchmark_detections(
        &self,
        benchmark_id: BenchmarkId,
    ) -> RepoResult<BTreeMap<VendorId, Vec<ScoredDetection>>> {
        let mut stmt = self.conn.prepare(&format!(
            "{DETECTION_SELECT_SQL}
             WHERE dr.benchmark_id = ?1
             ORDER BY dr.vendor_id ASC, c.name COLLATE NOCASE ASC, a.name COLLATE NOCASE ASC;"
        ))?;
        let mut rows = stmt.query([benchmark_id.to_string()])?;
        let mut grouped: BTreeMap<VendorId, Vec<ScoredDetection>> = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let (vendor_id, detection) = parse_detection_row(row)?;
            grouped.entry(vendor_id).or_default().push(detection);
        }
        Ok(grouped)
    }

    fn count_detections(&self) -> RepoResult<u32> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM detection_results;", [], |row| {
                    row.get(0)
                })?;
        count_u32(count, "detection_results")
    }
}

fn parse_benchmark_row(row: &Row<'_>) -> RepoResult<Benchmark> {
    let id_text: String = row.get("id")?;
    let date_text: String = row.get("report_date")?;
    let benchmark = Benchmark {
        id: parse_uuid(&id_text, "benchmarks.id")?,
        name: row.get("name")?,
        source: row.get("source")?,
        report_date: parse_date(&date_text, "benchmarks.report_date")?,
        description: row.get("description")?,
        imported_at: row.get("imported_at")?,
        imported_by: row.get("imported_by")?,
        is_active: int_to_bool(row.get("is_active")?, "benchmarks.is_active")?,
        metadata: parse_json(row.get("metadata")?, "benchmarks.metadata")?,
    };
    benchmark.validate()?;
    Ok(benchmark)
}

fn parse_detection_row(row: &Row<'_>) -> RepoResult<(VendorId, ScoredDetection)> {
    let vendor_text: String = row.get("vendor_id")?;
    let attack_text: String = row.get("attack_id")?;
    let category_text: String = row.get("category_id")?;
    let state_text: String = row.get("detection_state")?;
    let state = DetectionState::parse(&state_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid detection state `{state_text}` in detection_results.detection_state"
        ))
    })?;

    Ok((
        parse_uuid(&vendor_text, "detection_results.vendor_id")?,
        ScoredDetection {
            attack_id: parse_uuid(&attack_text, "detection_results.attack_id")?,
            attack_name: row.get("attack_name")?,
            category_id: parse_uuid(&category_text, "attacks.category_id")?,
            category_name: row.get("category_name")?,
            state,
        },
    ))
}
