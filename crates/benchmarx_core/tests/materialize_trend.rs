mod common;

use benchmarx_core::repo::score_repo::{ScoreRepository, SqliteScoreRepository};
use benchmarx_core::{
    BenchmarkId, DetectionState, RepoError, ScoredResult, ScoringError, ScoringRule,
    ScoringService, ValidationError, WeightTarget,
};
use common::{date, Fixture};
use uuid::Uuid;

use DetectionState::{Active as A, NoEvidence as N};

struct Scenario {
    fixture: Fixture,
    baseline: Uuid,
    finance: Uuid,
    older: BenchmarkId,
}

fn scenario() -> Scenario {
    let fixture = Fixture::new();
    let baseline = fixture.add_context("Baseline");
    let finance = fixture.add_context("Finance");
    fixture.set_weight(finance, WeightTarget::Category(fixture.execution), 3.0);
    let older = fixture.add_benchmark(
        "AVLab EDR 2024-01",
        date(2024, 1, 15),
        &[(fixture.alpha, [A, A, A, A]), (fixture.bravo, [N, N, N, N])],
    );
    Scenario {
        fixture,
        baseline,
        finance,
        older,
    }
}

fn scored_rows(scenario: &Scenario) -> u32 {
    SqliteScoreRepository::try_new(&scenario.fixture.conn)
        .unwrap()
        .count_scored_results()
        .unwrap()
}

#[test]
fn materialize_writes_every_context_and_vendor() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();

    assert_eq!(service.materialize_scores(Some(scenario.older)).unwrap(), 4);
    assert_eq!(service.materialize_scores(None).unwrap(), 6);
    assert_eq!(scored_rows(&scenario), 10);

    let rows = SqliteScoreRepository::try_new(&scenario.fixture.conn)
        .unwrap()
        .scored_results_for_benchmark(scenario.fixture.benchmark)
        .unwrap();
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|row| row.scoring_version == "v1.0"));
}

#[test]
fn rematerializing_replaces_rows_of_the_same_rule_version() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();

    service.materialize_scores(None).unwrap();
    service.materialize_scores(None).unwrap();
    assert_eq!(scored_rows(&scenario), 6);
}

#[test]
fn materialize_without_active_rule_writes_nothing() {
    let scenario = scenario();
    scenario
        .fixture
        .conn
        .execute("UPDATE scoring_rules SET is_active = 0;", [])
        .unwrap();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();

    let err = service.materialize_scores(None).unwrap_err();
    assert!(matches!(err, ScoringError::NoActiveScoringRule));
    assert_eq!(scored_rows(&scenario), 0);
}

#[test]
fn explain_reads_back_materialized_score_with_metadata() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();
    service.materialize_scores(None).unwrap();

    let explanation = service
        .explain_score(scenario.fixture.alpha, scenario.finance)
        .unwrap();

    assert_eq!(explanation.vendor_name, "Alpha");
    assert_eq!(explanation.context_name, "Finance");
    assert_eq!(explanation.benchmark_name.as_deref(), Some("AVLab EDR 2024-06"));
    assert_eq!(explanation.scoring_version, "v1.0");
    assert_eq!(explanation.total_score, 12.0);
    assert_eq!(explanation.max_possible_score, 16.0);
    assert_eq!(explanation.score_percentage, 75.0);
    assert_eq!(explanation.points.unwrap().active, 2.0);

    let metadata = explanation.calculation_metadata.unwrap();
    assert_eq!(metadata["points"]["active"], 2.0);
    assert_eq!(metadata["scoring_version"], "v1.0");
    assert_eq!(metadata["categories"][0]["category_name"], "Execution");
    assert_eq!(metadata["categories"][0]["category_weight"], 3.0);
    assert_eq!(metadata["categories"][1]["category_weight"], 1.0);
}

#[test]
fn explain_follows_the_most_recent_materialization() {
    for _ in 0..50 {
        let scenario = scenario();
        let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();

        service.materialize_scores(Some(scenario.older)).unwrap();
        service.materialize_scores(None).unwrap();
        let explanation = service
            .explain_score(scenario.fixture.alpha, scenario.baseline)
            .unwrap();
        assert_eq!(explanation.benchmark_id, scenario.fixture.benchmark);

        service.materialize_scores(Some(scenario.older)).unwrap();
        let explanation = service
            .explain_score(scenario.fixture.alpha, scenario.baseline)
            .unwrap();
        assert_eq!(explanation.benchmark_id, scenario.older);
    }
}

#[test]
fn latest_scored_result_breaks_timestamp_ties_by_write_order() {
    let scenario = scenario();
    let repo = SqliteScoreRepository::try_new(&scenario.fixture.conn).unwrap();
    let row = |benchmark_id: BenchmarkId| ScoredResult {
        id: Uuid::new_v4(),
        benchmark_id,
        context_id: scenario.baseline,
        vendor_id: scenario.fixture.alpha,
        scoring_version: "v1.0".to_string(),
        total_score: 4.0,
        max_possible_score: 8.0,
        score_percentage: 50.0,
        active_count: 2,
        dynamic_count: 0,
        no_evid_count: 2,
        calculation_metadata: None,
        created_at: 1_700_000_000_000,
    };

    for (first, second) in [
        (scenario.older, scenario.fixture.benchmark),
        (scenario.fixture.benchmark, scenario.older),
    ] {
        repo.replace_scored_result(&row(first)).unwrap();
        repo.replace_scored_result(&row(second)).unwrap();
        let latest = repo
            .latest_scored_result(scenario.baseline, scenario.fixture.alpha)
            .unwrap()
            .unwrap();
        assert_eq!(latest.benchmark_id, second);
    }
}

#[test]
fn explain_without_materialized_rows_is_an_error() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();

    let err = service
        .explain_score(scenario.fixture.alpha, scenario.baseline)
        .unwrap_err();
    assert!(matches!(err, ScoringError::NoScoredResults { .. }));
}

#[test]
fn trend_lists_benchmarks_oldest_first_with_rank_and_change() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();
    service.materialize_scores(Some(scenario.older)).unwrap();
    service.materialize_scores(None).unwrap();

    let trend = service
        .compare_vendor_across_benchmarks(scenario.fixture.alpha, scenario.baseline, None)
        .unwrap();

    let rows: Vec<(&str, u32, u32, f64, Option<f64>)> = trend
        .iter()
        .map(|point| {
            (
                point.benchmark_name.as_str(),
                point.rank,
                point.vendor_count,
                point.score_percentage,
                point.score_change,
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("AVLab EDR 2024-01", 1, 2, 100.0, None),
            ("AVLab EDR 2024-06", 2, 3, 50.0, Some(-50.0)),
        ]
    );
    assert_eq!(trend[0].report_date, date(2024, 1, 15));
}

#[test]
fn trend_filter_and_missing_vendor_rows() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();
    service.materialize_scores(Some(scenario.older)).unwrap();
    service.materialize_scores(None).unwrap();

    let filtered = service
        .compare_vendor_across_benchmarks(
            scenario.fixture.alpha,
            scenario.baseline,
            Some(&[scenario.fixture.benchmark]),
        )
        .unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].score_change, None);

    let charlie = service
        .compare_vendor_across_benchmarks(scenario.fixture.charlie, scenario.baseline, None)
        .unwrap();
    assert_eq!(charlie.len(), 1);
    assert_eq!(charlie[0].rank, 3);
}

#[test]
fn trend_only_uses_the_active_rule_version() {
    let scenario = scenario();
    let service = ScoringService::try_new(&scenario.fixture.conn).unwrap();
    service.materialize_scores(Some(scenario.older)).unwrap();
    service.materialize_scores(None).unwrap();

    let scores = SqliteScoreRepository::try_new(&scenario.fixture.conn).unwrap();
    scores
        .create_rule(&ScoringRule::new("v2.0", 3.0, 1.0, 0.0))
        .unwrap();
    scores.activate_rule("v2.0").unwrap();
    assert_eq!(service.materialize_scores(None).unwrap(), 6);
    assert_eq!(scored_rows(&scenario), 16);

    let trend = service
        .compare_vendor_across_benchmarks(scenario.fixture.bravo, scenario.baseline, None)
        .unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0].score_percentage, 58.33);
    assert_eq!(trend[0].rank, 1);
}

#[test]
fn rule_management_validates_and_switches_active_version() {
    let fixture = Fixture::new();
    let scores = SqliteScoreRepository::try_new(&fixture.conn).unwrap();

    let err = scores
        .create_rule(&ScoringRule::new("broken", 1.0, 2.0, 0.0))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::NonMonotonicPoints)
    ));

    let err = scores
        .create_rule(&ScoringRule::new("v1.0", 2.0, 1.0, 0.0))
        .unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));

    let err = scores.activate_rule("v9").unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
    assert_eq!(scores.active_rule().unwrap().unwrap().version, "v1.0");

    scores
        .create_rule(&ScoringRule::new("v1.1", 2.0, 1.5, 0.0))
        .unwrap();
    scores.activate_rule("v1.1").unwrap();
    let rules = scores.list_rules().unwrap();
    assert_eq!(rules.len(), 2);
    assert_eq!(
        rules
            .iter()
            .filter(|rule| rule.is_active)
            .map(|rule| rule.version.as_str())
            .collect::<Vec<_>>(),
        vec!["v1.1"]
    );
}
