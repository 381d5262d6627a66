//! Store administration: init, import and reference-data management.

use super::App;
use crate::cli::{BenchmarkCommand, ContextCommand, OutputFormat, RuleCommand};
use crate::output::{count, emit_record, new_table, number, optional};
use anyhow::{bail, Context, Result};
use benchmarx_core::db::migrations::latest_version;
use benchmarx_core::import::{import_benchmark, parse_import};
use benchmarx_core::repo::benchmark_repo::{BenchmarkRepository, SqliteBenchmarkRepository};
use benchmarx_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use benchmarx_core::repo::context_repo::{ContextRepository, SqliteContextRepository};
use benchmarx_core::repo::score_repo::{ScoreRepository, SqliteScoreRepository};
use benchmarx_core::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use benchmarx_core::{Benchmark, ContextProfile, ContextWeight, ScoringRule, WeightTarget};
use comfy_table::Cell;
use std::path::Path;

pub fn init(app: &App) -> Result<()> {
    println!(
        "database `{}` ready at schema version {}",
        app.db_path.display(),
        latest_version()
    );
    Ok(())
}

pub fn import(app: &App, file: &Path, activate: bool) -> Result<()> {
    let contents = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    let mut document = parse_import(&contents)
        .with_context(|| format!("invalid import document `{}`", file.display()))?;
    document.benchmark.activate |= activate;

    let summary = import_benchmark(&app.conn, &document)?;
    let verb = if summary.benchmark_created {
        "created"
    } else {
        "updated"
    };
    println!("{verb} benchmark `{}` ({})", summary.benchmark_name, summary.benchmark_id);
    println!(
        "vendors: {} new, {} updated; categories: {} new; attacks: {} new; detections written: {}",
        summary.vendors_created,
        summary.vendors_updated,
        summary.categories_created,
        summary.attacks_created,
        summary.detections_written
    );
    if summary.activated {
        println!("benchmark is now active");
    }
    Ok(())
}

pub fn vendors(app: &App, format: OutputFormat) -> Result<()> {
    let vendors = SqliteVendorRepository::try_new(&app.conn)?.list_vendors()?;
    emit_record(format, vendors.as_slice(), |rows| {
        let mut table = new_table(&["Name", "Type", "Test version", "Test date", "Id"]);
        for vendor in rows {
            table.add_row(vec![
                Cell::new(&vendor.name),
                Cell::new(vendor.vendor_type.as_str()),
                optional(vendor.test_version.as_deref()),
                optional(vendor.test_date.map(|date| date.to_string()).as_deref()),
                Cell::new(vendor.id),
            ]);
        }
        table
    })
}

pub fn categories(app: &App, format: OutputFormat) -> Result<()> {
    let categories = SqliteCatalogRepository::try_new(&app.conn)?.list_categories()?;
    emit_record(format, categories.as_slice(), |rows| {
        let mut table = new_table(&["Name", "MITRE tactic", "Description"]);
        for category in rows {
            table.add_row(vec![
                Cell::new(&category.name),
                optional(category.mitre_tactic.as_deref()),
                optional(category.description.as_deref()),
            ]);
        }
        table
    })
}

pub fn attacks(app: &App, format: OutputFormat) -> Result<()> {
    let attacks = SqliteCatalogRepository::try_new(&app.conn)?.list_attacks()?;
    emit_record(format, attacks.as_slice(), |rows| {
        let mut table = new_table(&["Category", "Attack", "Technique", "Severity"]);
        for listing in rows {
            table.add_row(vec![
                Cell::new(&listing.category_name),
                Cell::new(&listing.attack.name),
                optional(listing.attack.mitre_technique_id.as_deref()),
                Cell::new(listing.attack.severity.as_str()),
            ]);
        }
        table
    })
}

pub fn benchmarks(app: &App, command: BenchmarkCommand) -> Result<()> {
    let repo = SqliteBenchmarkRepository::try_new(&app.conn)?;
    match command {
        BenchmarkCommand::List { output } => {
            let benchmarks = repo.list_benchmarks()?;
            emit_record(output.format, benchmarks.as_slice(), |rows| {
                let mut table = new_table(&["", "Name", "Source", "Report date", "Imported by"]);
                for benchmark in rows {
                    table.add_row(vec![
                        Cell::new(if benchmark.is_active { "*" } else { "" }),
                        Cell::new(&benchmark.name),
                        Cell::new(&benchmark.source),
                        Cell::new(benchmark.report_date),
                        optional(benchmark.imported_by.as_deref()),
                    ]);
                }
                table
            })
        }
        BenchmarkCommand::Create {
            name,
            source,
            report_date,
            description,
            imported_by,
            activate,
        } => {
            let mut benchmark = Benchmark::new(name, source, report_date);
            benchmark.description = description;
            benchmark.imported_by = imported_by;
            let id = repo.create_benchmark(&benchmark)?;
            if activate {
                repo.set_active_benchmark(id)?;
            }
            println!("created benchmark `{}` ({id})", benchmark.label());
            Ok(())
        }
        BenchmarkCommand::Activate { benchmark } => {
            let benchmark = app.benchmark(&benchmark)?;
            repo.set_active_benchmark(benchmark.id)?;
            println!("active benchmark: {}", benchmark.label());
            Ok(())
        }
        BenchmarkCommand::Stats { benchmark, output } => {
            let benchmark = match benchmark {
                Some(selector) => app.benchmark(&selector)?,
                None => repo
                    .active_benchmark()?
                    .context("no active benchmark; pass a benchmark name or activate one")?,
            };
            let stats = repo.benchmark_stats(benchmark.id)?;
            emit_record(output.format, &stats, |stats| {
                let mut table = new_table(&["Benchmark", "Vendors", "Attacks", "Detections", "ACTIVE", "DYNAMIC", "NO_EVID"]);
                table.add_row(vec![
                    Cell::new(benchmark.label()),
                    count(stats.vendor_count),
                    count(stats.attack_count),
                    count(stats.detection_count),
                    count(stats.active_count),
                    count(stats.dynamic_count),
                    count(stats.no_evid_count),
                ]);
                table
            })
        }
    }
}

pub fn contexts(app: &App, command: ContextCommand) -> Result<()> {
    let repo = SqliteContextRepository::try_new(&app.conn)?;
    match command {
        ContextCommand::List { output } => {
            let contexts = repo.list_contexts()?;
            emit_record(output.format, contexts.as_slice(), |rows| {
                let mut table = new_table(&["Name", "Industry", "Size", "Maturity", "Description"]);
                for context in rows {
                    table.add_row(vec![
                        Cell::new(&context.name),
                        Cell::new(&context.industry),
                        Cell::new(context.company_size.as_str()),
                        Cell::new(context.security_maturity.as_str()),
                        optional(context.description.as_deref()),
                    ]);
                }
                table
            })
        }
        ContextCommand::Create {
            name,
            industry,
            size,
            maturity,
            description,
        } => {
            let mut context = ContextProfile::new(name, industry, size, maturity);
            context.description = description;
            let id = repo.create_context(&context)?;
            println!("created context profile `{}` ({id})", context.name);
            Ok(())
        }
        ContextCommand::Weights { context, output } => {
            let context = app.context(&context)?;
            let weights = repo.list_weights(context.id)?;
            emit_record(output.format, weights.as_slice(), render_weights)
        }
        ContextCommand::SetWeight {
            context,
            category,
            attack,
            weight,
            rationale,
        } => {
            let context = app.context(&context)?;
            let (target, label) = weight_target(app, category.as_deref(), attack.as_deref())?;
            if weight < app.config.scoring.weight_min || weight > app.config.scoring.weight_max {
                bail!(
                    "weight {weight} for `{label}` is outside [{}, {}]",
                    app.config.scoring.weight_min,
                    app.config.scoring.weight_max
                );
            }
            repo.set_weight(context.id, target, weight, rationale.as_deref())?;
            println!("`{}`: {label} weight set to {weight}", context.name);
            Ok(())
        }
        ContextCommand::UnsetWeight {
            context,
            category,
            attack,
        } => {
            let context = app.context(&context)?;
            let (target, label) = weight_target(app, category.as_deref(), attack.as_deref())?;
            if repo.remove_weight(context.id, target)? {
                println!("`{}`: {label} weight removed", context.name);
            } else {
                println!("`{}`: {label} has no weight; nothing to remove", context.name);
            }
            Ok(())
        }
    }
}

fn weight_target(
    app: &App,
    category: Option<&str>,
    attack: Option<&str>,
) -> Result<(WeightTarget, String)> {
    match (category, attack) {
        (Some(category), None) => {
            let category = app.category(category)?;
            Ok((WeightTarget::Category(category.id), format!("category {}", category.name)))
        }
        (None, Some(attack)) => {
            let listing = app.attack(attack)?;
            Ok((WeightTarget::Attack(listing.attack.id), format!("attack {}", listing.attack.name)))
        }
        _ => bail!("pass exactly one of --category or --attack"),
    }
}

fn render_weights(rows: &[ContextWeight]) -> comfy_table::Table {
    let mut table = new_table(&["Target", "Kind", "Weight", "Rationale"]);
    for weight in rows {
        let kind = match weight.target {
            WeightTarget::Category(_) => "category",
            WeightTarget::Attack(_) => "attack",
        };
        table.add_row(vec![
            Cell::new(&weight.target_name),
            Cell::new(kind),
            number(weight.weight),
            optional(weight.rationale.as_deref()),
        ]);
    }
    table
}

pub fn rules(app: &App, command: RuleCommand) -> Result<()> {
    let repo = SqliteScoreRepository::try_new(&app.conn)?;
    match command {
        RuleCommand::List { output } => {
            let rules = repo.list_rules()?;
            emit_record(output.format, rules.as_slice(), |rows| {
                let mut table = new_table(&["", "Version", "ACTIVE", "DYNAMIC", "NO_EVID", "Description"]);
                for rule in rows {
                    table.add_row(vec![
                        Cell::new(if rule.is_active { "*" } else { "" }),
                        Cell::new(&rule.version),
                        number(rule.active_points),
                        number(rule.dynamic_points),
                        number(rule.no_evid_points),
                        optional(rule.description.as_deref()),
                    ]);
                }
                table
            })
        }
        RuleCommand::Create {
            version,
            active_points,
            dynamic_points,
            no_evid_points,
            description,
            created_by,
            activate,
        } => {
            let mut rule = ScoringRule::new(version, active_points, dynamic_points, no_evid_points);
            rule.description = description;
            rule.created_by = created_by;
            repo.create_rule(&rule)?;
            if activate {
                repo.activate_rule(&rule.version)?;
            }
            println!("created scoring rule {}", rule.version);
            Ok(())
        }
        RuleCommand::Activate { version } => {
            repo.activate_rule(&version)?;
            println!("active scoring rule: {version}");
            Ok(())
        }
    }
}
