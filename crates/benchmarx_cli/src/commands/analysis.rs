//! Scoring, ranking, coverage and simulation reports.

use super::App;
use crate::cli::OutputFormat;
use crate::output::{count, emit_record, emit_rows, new_table, number, optional};
use anyhow::Result;
use benchmarx_core::scoring::{CategoryCoverage, RankChange, RankedVendor};
use benchmarx_core::service::scoring_service::{
    BenchmarkTrendPoint, ContextPerformance, DashboardSummary, ScoreExplanation,
    SimulationReport, VendorScore,
};
use benchmarx_core::CategoryId;
use comfy_table::{Cell, Table};
use std::collections::HashMap;

pub fn status(app: &App, format: OutputFormat) -> Result<()> {
    let summary = app.service()?.dashboard_summary()?;
    emit_record(format, &summary, render_summary)
}

fn render_summary(summary: &DashboardSummary) -> Table {
    let mut table = new_table(&["Item", "Value"]);
    let rows = [
        ("Vendors", summary.vendor_count),
        ("Attack categories", summary.category_count),
        ("Attacks", summary.attack_count),
        ("Benchmarks", summary.benchmark_count),
        ("Context profiles", summary.context_count),
        ("Detection results", summary.detection_count),
        ("Scored results", summary.scored_result_count),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), count(value)]);
    }
    table.add_row(vec![
        Cell::new("Active benchmark"),
        optional(summary.active_benchmark.as_ref().map(|b| b.label()).as_deref()),
    ]);
    table.add_row(vec![
        Cell::new("Active scoring rule"),
        optional(summary.active_rule.as_ref().map(|r| r.version.as_str())),
    ]);
    table
}

pub fn score(
    app: &App,
    vendor: &str,
    context: &str,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let context = app.context(context)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let score = app
        .service()?
        .calculate_vendor_score(vendor.id, context.id, benchmark_id)?;
    emit_record(format, &score, render_score)
}

fn render_score(score: &VendorScore) -> Table {
    let mut table = new_table(&["Category", "Detections", "Earned", "Possible"]);
    for category in &score.score.categories {
        table.add_row(vec![
            Cell::new(&category.category_name),
            count(category.detections),
            number(category.earned),
            number(category.possible),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!(
            "{} / {} ({})",
            score.vendor_name, score.context_name, score.scoring_version
        )),
        count(score.score.detection_count()),
        number(score.score.total_score),
        number(score.score.max_possible_score),
    ]);
    table.add_row(vec![
        Cell::new("Score %"),
        Cell::new(""),
        number(score.score.score_percentage),
        Cell::new(""),
    ]);
    table
}

pub fn rank(
    app: &App,
    context: &str,
    benchmark: Option<&str>,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let context = app.context(context)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let ranking = app
        .service()?
        .vendor_ranking(context.id, benchmark_id, limit)?;
    emit_rows(format, &ranking, render_ranking)
}

fn render_ranking(rows: &[RankedVendor]) -> Table {
    let mut table = new_table(&[
        "Rank", "Vendor", "Type", "Score", "Max", "Score %", "ACTIVE", "DYNAMIC", "NO_EVID",
    ]);
    for row in rows {
        table.add_row(vec![
            count(row.rank),
            Cell::new(&row.vendor_name),
            Cell::new(row.vendor_type.as_str()),
            number(row.score.total_score),
            number(row.score.max_possible_score),
            number(row.score.score_percentage),
            count(row.score.active_count),
            count(row.score.dynamic_count),
            count(row.score.no_evid_count),
        ]);
    }
    table
}

pub fn profile(
    app: &App,
    vendor: &str,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let rows = app
        .service()?
        .vendor_context_performance(vendor.id, benchmark_id)?;
    if rows.is_empty() && format == OutputFormat::Table {
        println!("`{}` has no detections in this benchmark", vendor.name);
        return Ok(());
    }
    emit_rows(format, &rows, render_profile)
}

fn render_profile(rows: &[ContextPerformance]) -> Table {
    let mut table = new_table(&[
        "Context", "Industry", "Size", "Maturity", "Rank", "Score", "Max", "Score %",
    ]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.context_name),
            Cell::new(&row.industry),
            Cell::new(row.company_size.as_str()),
            Cell::new(row.security_maturity.as_str()),
            Cell::new(format!("{}/{}", row.rank, row.vendor_count)),
            number(row.total_score),
            number(row.max_possible_score),
            number(row.score_percentage),
        ]);
    }
    table
}

pub fn coverage(
    app: &App,
    vendor: &str,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let coverage = app.service()?.category_coverage(vendor.id, benchmark_id)?;
    emit_rows(format, &coverage, |rows| {
        let mut table = coverage_table(&[]);
        for row in rows {
            table.add_row(coverage_cells(row));
        }
        table
    })
}

fn coverage_table(extra: &[&str]) -> Table {
    let mut header = vec!["Category", "Attacks", "ACTIVE", "DYNAMIC", "NO_EVID", "Coverage %"];
    header.extend_from_slice(extra);
    new_table(&header)
}

fn coverage_cells(row: &CategoryCoverage) -> Vec<Cell> {
    vec![
        Cell::new(&row.category_name),
        count(row.total_attacks),
        count(row.active_detections),
        count(row.dynamic_detections),
        count(row.no_evidence),
        number(row.coverage_percentage),
    ]
}

pub fn heatmap(
    app: &App,
    vendor: &str,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let heatmap = app.service()?.risk_heatmap(vendor.id, benchmark_id)?;
    if format == OutputFormat::Json {
        return emit_record(format, &heatmap, |_| Table::new());
    }
    emit_rows(format, &heatmap.cells, |rows| {
        let mut table = coverage_table(&["Risk"]);
        for row in rows {
            let mut cells = coverage_cells(&row.coverage);
            cells.push(Cell::new(row.risk_level.as_str()));
            table.add_row(cells);
        }
        table
    })
}

pub fn materialize(app: &App, benchmark: Option<&str>) -> Result<()> {
    let benchmark_id = app.benchmark_id(benchmark)?;
    let written = app.service()?.materialize_scores(benchmark_id)?;
    println!("materialized {written} scored results");
    Ok(())
}

pub fn explain(app: &App, vendor: &str, context: &str, format: OutputFormat) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let context = app.context(context)?;
    let explanation = app.service()?.explain_score(vendor.id, context.id)?;
    emit_record(format, &explanation, render_explanation)
}

fn render_explanation(explanation: &ScoreExplanation) -> Table {
    let mut table = new_table(&["Field", "Value"]);
    let points = explanation
        .points
        .map(|p| format!("ACTIVE={} DYNAMIC={} NO_EVID={}", p.active, p.dynamic, p.no_evid));
    let rows: Vec<(&str, Cell)> = vec![
        ("Vendor", Cell::new(&explanation.vendor_name)),
        ("Context", Cell::new(&explanation.context_name)),
        (
            "Benchmark",
            optional(explanation.benchmark_name.as_deref()),
        ),
        ("Scoring version", Cell::new(&explanation.scoring_version)),
        ("Points", optional(points.as_deref())),
        ("Total score", number(explanation.total_score)),
        ("Max possible", number(explanation.max_possible_score)),
        ("Score %", number(explanation.score_percentage)),
        ("ACTIVE", count(explanation.active_count)),
        ("DYNAMIC", count(explanation.dynamic_count)),
        ("NO_EVID", count(explanation.no_evid_count)),
    ];
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), value]);
    }
    table
}

pub fn compare(
    app: &App,
    vendors: &[String],
    context: &str,
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let vendor_ids = vendors
        .iter()
        .map(|selector| app.vendor(selector).map(|vendor| vendor.id))
        .collect::<Result<Vec<_>>>()?;
    let context = app.context(context)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let comparison = app
        .service()?
        .compare_vendors(&vendor_ids, context.id, benchmark_id)?;
    emit_rows(format, &comparison, |rows| {
        let mut table = new_table(&["Vendor", "Score %", "Score", "Max", "Weakest category"]);
        for row in rows {
            let weakest = row
                .coverage
                .iter()
                .min_by(|a, b| a.coverage_percentage.total_cmp(&b.coverage_percentage))
                .map(|c| format!("{} ({:.2}%)", c.category_name, c.coverage_percentage));
            table.add_row(vec![
                Cell::new(&row.vendor_name),
                number(row.score.score_percentage),
                number(row.score.total_score),
                number(row.score.max_possible_score),
                optional(weakest.as_deref()),
            ]);
        }
        table
    })
}

pub fn trend(
    app: &App,
    vendor: &str,
    context: &str,
    benchmarks: &[String],
    format: OutputFormat,
) -> Result<()> {
    let vendor = app.vendor(vendor)?;
    let context = app.context(context)?;
    let filter = benchmarks
        .iter()
        .map(|selector| app.benchmark(selector).map(|benchmark| benchmark.id))
        .collect::<Result<Vec<_>>>()?;
    let filter = (!filter.is_empty()).then_some(filter.as_slice());
    let points = app
        .service()?
        .compare_vendor_across_benchmarks(vendor.id, context.id, filter)?;
    if points.is_empty() && format == OutputFormat::Table {
        println!("no materialized scores for `{}`; run `benchmarx materialize` first", vendor.name);
        return Ok(());
    }
    emit_rows(format, &points, render_trend)
}

fn render_trend(rows: &[BenchmarkTrendPoint]) -> Table {
    let mut table = new_table(&["Benchmark", "Source", "Report date", "Rank", "Score", "Score %", "Change"]);
    for row in rows {
        table.add_row(vec![
            Cell::new(&row.benchmark_name),
            Cell::new(&row.source),
            Cell::new(row.report_date),
            Cell::new(format!("{}/{}", row.rank, row.vendor_count)),
            number(row.total_score),
            number(row.score_percentage),
            row.score_change.map(number).unwrap_or_else(|| Cell::new("-")),
        ]);
    }
    table
}

pub fn simulate(
    app: &App,
    context: &str,
    weights: &[(String, f64)],
    benchmark: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let context = app.context(context)?;
    let benchmark_id = app.benchmark_id(benchmark)?;
    let mut overrides: HashMap<CategoryId, f64> = HashMap::new();
    for (category, weight) in weights {
        overrides.insert(app.category(category)?.id, *weight);
    }

    let report = app
        .service()?
        .simulate_with_diff(context.id, &overrides, benchmark_id)?;
    match format {
        OutputFormat::Table => {
            print_simulation(&report);
            Ok(())
        }
        OutputFormat::Json => emit_record(format, &report, |_| Table::new()),
        OutputFormat::Csv => emit_rows(format, &report.changes, render_changes),
    }
}

fn print_simulation(report: &SimulationReport) {
    if !report.overrides.is_empty() {
        let mut table = new_table(&["Category", "Current weight", "Simulated weight"]);
        for row in &report.overrides {
            table.add_row(vec![
                Cell::new(&row.category_name),
                number(row.original_weight),
                number(row.simulated_weight),
            ]);
        }
        println!("{table}");
    }
    println!("{}", render_side_by_side(report));
    if report.changes.is_empty() {
        println!("no ranking changes");
    } else {
        println!("{}", render_changes(&report.changes));
    }
}

fn render_side_by_side(report: &SimulationReport) -> Table {
    let before: HashMap<_, _> = report
        .original
        .iter()
        .map(|row| (row.vendor_id, row))
        .collect();
    let mut table = new_table(&[
        "Rank", "Vendor", "Score % after", "Rank before", "Score % before",
    ]);
    for row in &report.simulated {
        let original = before.get(&row.vendor_id);
        table.add_row(vec![
            count(row.rank),
            Cell::new(&row.vendor_name),
            number(row.score.score_percentage),
            original.map_or_else(|| Cell::new("-"), |original| count(original.rank)),
            original.map_or_else(
                || Cell::new("-"),
                |original| number(original.score.score_percentage),
            ),
        ]);
    }
    table
}

fn render_changes(rows: &[RankChange]) -> Table {
    let mut table = new_table(&["Vendor", "Rank", "Move", "Score % before", "Score % after", "Delta"]);
    for row in rows {
        let movement = match row.rank_change {
            0 => "=".to_string(),
            up if up > 0 => format!("+{up}"),
            down => down.to_string(),
        };
        table.add_row(vec![
            Cell::new(&row.vendor_name),
            Cell::new(format!("{} -> {}", row.original_rank, row.simulated_rank)),
            Cell::new(movement),
            number(row.original_percentage),
            number(row.simulated_percentage),
            number(row.score_change),
        ]);
    }
    table
}
