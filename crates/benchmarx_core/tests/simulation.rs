mod common;

use benchmarx_core::config::ScoringConfig;
use benchmarx_core::repo::context_repo::{ContextRepository, SqliteContextRepository};
use benchmarx_core::scoring::RiskThresholds;
use benchmarx_core::{RepoError, ScoringError, ScoringService, ValidationError, WeightTarget};
use common::Fixture;
use std::collections::HashMap;
use uuid::Uuid;

fn finance(fixture: &Fixture) -> Uuid {
    let context = fixture.add_context("Finance");
    fixture.set_weight(context, WeightTarget::Category(fixture.execution), 3.0);
    context
}

#[test]
fn zeroing_a_category_reorders_the_ranking() {
    let fixture = Fixture::new();
    let context = finance(&fixture);
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let overrides = HashMap::from([(fixture.execution, 0.0)]);
    let report = service
        .simulate_with_diff(context, &overrides, None)
        .unwrap();

    let original: Vec<&str> = report
        .original
        .iter()
        .map(|ranked| ranked.vendor_name.as_str())
        .collect();
    let simulated: Vec<(&str, f64)> = report
        .simulated
        .iter()
        .map(|ranked| (ranked.vendor_name.as_str(), ranked.score.score_percentage))
        .collect();
    assert_eq!(original, vec!["Alpha", "Bravo", "Charlie"]);
    assert_eq!(
        simulated,
        vec![("Bravo", 100.0), ("Charlie", 25.0), ("Alpha", 0.0)]
    );

    let changes: Vec<(&str, u32, u32, i64, f64)> = report
        .changes
        .iter()
        .map(|change| {
            (
                change.vendor_name.as_str(),
                change.original_rank,
                change.simulated_rank,
                change.rank_change,
                change.score_change,
            )
        })
        .collect();
    assert_eq!(
        changes,
        vec![
            ("Alpha", 1, 3, -2, -75.0),
            ("Bravo", 2, 1, 1, 56.25),
            ("Charlie", 3, 2, 1, -18.75),
        ]
    );

    assert_eq!(report.benchmark_id, fixture.benchmark);
    assert_eq!(report.scoring_version, "v1.0");
    assert_eq!(report.overrides.len(), 1);
    assert_eq!(report.overrides[0].category_name, "Execution");
    assert_eq!(report.overrides[0].original_weight, 3.0);
    assert_eq!(report.overrides[0].simulated_weight, 0.0);
}

#[test]
fn simulate_ranking_returns_the_simulated_side() {
    let fixture = Fixture::new();
    let context = finance(&fixture);
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let overrides = HashMap::from([(fixture.execution, 0.0)]);
    let simulated = service
        .simulate_ranking(context, &overrides, None)
        .unwrap();
    assert_eq!(simulated[0].vendor_name, "Bravo");
    assert_eq!(simulated[0].rank, 1);
}

#[test]
fn simulation_never_persists_weights() {
    let fixture = Fixture::new();
    let context = finance(&fixture);
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let overrides = HashMap::from([(fixture.execution, 0.5), (fixture.persistence, 4.0)]);
    service
        .simulate_with_diff(context, &overrides, None)
        .unwrap();

    let contexts = SqliteContextRepository::try_new(&fixture.conn).unwrap();
    assert_eq!(
        contexts.category_weight(context, fixture.execution).unwrap(),
        Some(3.0)
    );
    assert_eq!(
        contexts
            .category_weight(context, fixture.persistence)
            .unwrap(),
        None
    );
    let scored: i64 = fixture
        .conn
        .query_row("SELECT COUNT(*) FROM scored_results;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(scored, 0);
}

#[test]
fn unchanged_weights_produce_no_changes() {
    let fixture = Fixture::new();
    let context = fixture.add_context("Baseline");
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let overrides = HashMap::from([(fixture.execution, 1.0)]);
    let report = service
        .simulate_with_diff(context, &overrides, None)
        .unwrap();

    assert_eq!(report.original, report.simulated);
    assert!(report.changes.is_empty());
}

#[test]
fn category_override_replaces_attack_level_weights() {
    let fixture = Fixture::new();
    let retail = fixture.add_context("Retail");
    fixture.set_weight(retail, WeightTarget::Category(fixture.persistence), 2.0);
    fixture.set_weight(retail, WeightTarget::Attack(fixture.p1), 4.0);
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let overrides = HashMap::from([(fixture.persistence, 1.0)]);
    let simulated = service
        .simulate_ranking(retail, &overrides, None)
        .unwrap();

    let alpha = simulated
        .iter()
        .find(|ranked| ranked.vendor_id == fixture.alpha)
        .unwrap();
    assert_eq!(alpha.score.total_score, 4.0);
    assert_eq!(alpha.score.max_possible_score, 8.0);
    assert_eq!(alpha.score.score_percentage, 50.0);
}

#[test]
fn weights_outside_the_slider_range_are_rejected() {
    let fixture = Fixture::new();
    let context = finance(&fixture);
    let service = ScoringService::try_new(&fixture.conn).unwrap();

    let err = service
        .simulate_ranking(context, &HashMap::from([(fixture.execution, 6.0)]), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ScoringError::WeightOutOfRange { weight, max, .. } if weight == 6.0 && max == 5.0
    ));

    let err = service
        .simulate_ranking(context, &HashMap::from([(fixture.execution, -1.0)]), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ScoringError::Repo(RepoError::Validation(ValidationError::InvalidWeight(_)))
    ));

    let err = service
        .simulate_ranking(context, &HashMap::from([(Uuid::new_v4(), 1.0)]), None)
        .unwrap_err();
    assert!(matches!(err, ScoringError::CategoryNotFound(_)));
}

#[test]
fn configured_weight_range_is_honored() {
    let fixture = Fixture::new();
    let context = finance(&fixture);
    let settings = ScoringConfig {
        min_score_delta: 0.1,
        weight_min: 0.0,
        weight_max: 10.0,
    };
    let service = ScoringService::try_new(&fixture.conn)
        .unwrap()
        .with_settings(settings, RiskThresholds::default());

    let simulated = service
        .simulate_ranking(context, &HashMap::from([(fixture.execution, 8.0)]), None)
        .unwrap();
    assert_eq!(simulated[0].vendor_name, "Alpha");
}
