//! Shared benchmark fixture.
//!
//! Two categories with two attacks each and three vendors. Under the default
//! `2 / 1 / 0` rule and unit weights the active benchmark scores
//! Bravo 62.5%, Alpha 50%, Charlie 37.5%.

#![allow(dead_code)]

use benchmarx_core::model::context::{CompanySize, ContextId, ContextProfile, SecurityMaturity};
use benchmarx_core::repo::benchmark_repo::{BenchmarkRepository, SqliteBenchmarkRepository};
use benchmarx_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use benchmarx_core::repo::context_repo::{ContextRepository, SqliteContextRepository};
use benchmarx_core::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use benchmarx_core::{
    open_db_in_memory, Attack, AttackCategory, AttackId, Benchmark, BenchmarkId, CategoryId,
    DetectionResult, DetectionState, Severity, Vendor, VendorId, VendorType, WeightTarget,
};
use chrono::NaiveDate;
use rusqlite::Connection;

use DetectionState::{Active as A, Dynamic as D, NoEvidence as N};

pub struct Fixture {
    pub conn: Connection,
    pub execution: CategoryId,
    pub persistence: CategoryId,
    pub e1: AttackId,
    pub e2: AttackId,
    pub p1: AttackId,
    pub p2: AttackId,
    pub alpha: VendorId,
    pub bravo: VendorId,
    pub charlie: VendorId,
    /// Active benchmark dated 2024-06-30.
    pub benchmark: BenchmarkId,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = open_db_in_memory().unwrap();
        let (execution, persistence, e1, e2, p1, p2) = {
            let catalog = SqliteCatalogRepository::try_new(&conn).unwrap();
            let mut execution = AttackCategory::new("Execution");
            execution.mitre_tactic = Some("TA0002".to_string());
            let execution = catalog.create_category(&execution).unwrap();
            let persistence = catalog
                .create_category(&AttackCategory::new("Persistence"))
                .unwrap();

            let mut e1 = Attack::new("PowerShell Dropper", execution, Severity::High);
            e1.mitre_technique_id = Some("T1059.001".to_string());
            let e1 = catalog.create_attack(&e1).unwrap();
            let e2 = catalog
                .create_attack(&Attack::new("Malicious Macro", execution, Severity::Medium))
                .unwrap();
            let p1 = catalog
                .create_attack(&Attack::new("Registry Run Key", persistence, Severity::High))
                .unwrap();
            let p2 = catalog
                .create_attack(&Attack::new("Scheduled Task", persistence, Severity::Low))
                .unwrap();
            (execution, persistence, e1, e2, p1, p2)
        };

        let (alpha, bravo, charlie) = {
            let vendors = SqliteVendorRepository::try_new(&conn).unwrap();
            (
                vendors
                    .create_vendor(&Vendor::new("Alpha", VendorType::Edr))
                    .unwrap(),
                vendors
                    .create_vendor(&Vendor::new("Bravo", VendorType::Xdr))
                    .unwrap(),
                vendors
                    .create_vendor(&Vendor::new("Charlie", VendorType::Edr))
                    .unwrap(),
            )
        };

        let mut fixture = Self {
            conn,
            execution,
            persistence,
            e1,
            e2,
            p1,
            p2,
            alpha,
            bravo,
            charlie,
            benchmark: BenchmarkId::nil(),
        };

        let benchmark = fixture.add_benchmark(
            "AVLab EDR 2024-06",
            date(2024, 6, 30),
            &[
                (alpha, [A, A, N, N]),
                (bravo, [N, D, A, A]),
                (charlie, [D, D, D, N]),
            ],
        );
        fixture.activate(benchmark);
        fixture.benchmark = benchmark;
        fixture
    }

    /// Adds an inactive benchmark; detection states are in `e1, e2, p1, p2` order.
    pub fn add_benchmark(
        &self,
        name: &str,
        report_date: NaiveDate,
        rows: &[(VendorId, [DetectionState; 4])],
    ) -> BenchmarkId {
        let benchmarks = SqliteBenchmarkRepository::try_new(&self.conn).unwrap();
        let id = benchmarks
            .create_benchmark(&Benchmark::new(name, "AVLab", report_date))
            .unwrap();
        let attacks = [self.e1, self.e2, self.p1, self.p2];
        for (vendor_id, states) in rows {
            for (attack_id, state) in attacks.iter().zip(states) {
                benchmarks
                    .upsert_detection(&DetectionResult::new(id, *vendor_id, *attack_id, *state))
                    .unwrap();
            }
        }
        id
    }

    pub fn activate(&self, benchmark_id: BenchmarkId) {
        SqliteBenchmarkRepository::try_new(&self.conn)
            .unwrap()
            .set_active_benchmark(benchmark_id)
            .unwrap();
    }

    pub fn add_context(&self, name: &str) -> ContextId {
        SqliteContextRepository::try_new(&self.conn)
            .unwrap()
            .create_context(&ContextProfile::new(
                name,
                "Finance",
                CompanySize::Enterprise,
                SecurityMaturity::Advanced,
            ))
            .unwrap()
    }

    pub fn set_weight(&self, context_id: ContextId, target: WeightTarget, weight: f64) {
        SqliteContextRepository::try_new(&self.conn)
            .unwrap()
            .set_weight(context_id, target, weight, None)
            .unwrap();
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
