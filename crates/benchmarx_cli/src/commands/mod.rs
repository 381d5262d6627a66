//! Command dispatch and entity selectors.
//!
//! # Invariants
//! - Entities are selected by UUID first, then by case-insensitive name.
//! - Logging is only initialized when a log directory is configured.

mod analysis;
mod catalog;

use crate::cli::{Cli, Commands};
use anyhow::{anyhow, Context, Result};
use benchmarx_core::config::BenchmarxConfig;
use benchmarx_core::repo::benchmark_repo::{BenchmarkRepository, SqliteBenchmarkRepository};
use benchmarx_core::repo::catalog_repo::{CatalogRepository, SqliteCatalogRepository};
use benchmarx_core::repo::context_repo::{ContextRepository, SqliteContextRepository};
use benchmarx_core::repo::vendor_repo::{SqliteVendorRepository, VendorRepository};
use benchmarx_core::{
    init_logging, load_config, open_db, AttackCategory, AttackListing, Benchmark, BenchmarkId,
    ContextProfile, ScoringService, Vendor,
};
use log::debug;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Open store plus effective configuration.
pub struct App {
    pub conn: Connection,
    pub config: BenchmarxConfig,
    pub db_path: PathBuf,
}

pub fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    start_logging(&cli, &config)?;

    let db_path = cli
        .db
        .clone()
        .unwrap_or_else(|| config.database.path.clone());
    let conn = open_db(&db_path)
        .with_context(|| format!("failed to open database `{}`", db_path.display()))?;
    debug!(
        "event=cli_start module=cli status=ok db_path={}",
        db_path.display()
    );
    let app = App {
        conn,
        config,
        db_path,
    };

    match cli.command {
        Commands::Init => catalog::init(&app),
        Commands::Status { output } => analysis::status(&app, output.format),
        Commands::Import { file, activate } => catalog::import(&app, &file, activate),
        Commands::Vendors { output } => catalog::vendors(&app, output.format),
        Commands::Categories { output } => catalog::categories(&app, output.format),
        Commands::Attacks { output } => catalog::attacks(&app, output.format),
        Commands::Benchmarks(command) => catalog::benchmarks(&app, command),
        Commands::Contexts(command) => catalog::contexts(&app, command),
        Commands::Rules(command) => catalog::rules(&app, command),
        Commands::Score {
            vendor,
            context,
            benchmark,
            output,
        } => analysis::score(&app, &vendor, &context, benchmark.as_deref(), output.format),
        Commands::Rank {
            context,
            benchmark,
            limit,
            output,
        } => analysis::rank(&app, &context, benchmark.as_deref(), limit, output.format),
        Commands::Profile {
            vendor,
            benchmark,
            output,
        } => analysis::profile(&app, &vendor, benchmark.as_deref(), output.format),
        Commands::Coverage {
            vendor,
            benchmark,
            output,
        } => analysis::coverage(&app, &vendor, benchmark.as_deref(), output.format),
        Commands::Heatmap {
            vendor,
            benchmark,
            output,
        } => analysis::heatmap(&app, &vendor, benchmark.as_deref(), output.format),
        Commands::Materialize { benchmark } => analysis::materialize(&app, benchmark.as_deref()),
        Commands::Explain {
            vendor,
            context,
            output,
        } => analysis::explain(&app, &vendor, &context, output.format),
        Commands::Compare {
            vendors,
            context,
            benchmark,
            output,
        } => analysis::compare(&app, &vendors, &context, benchmark.as_deref(), output.format),
        Commands::Trend {
            vendor,
            context,
            benchmarks,
            output,
        } => analysis::trend(&app, &vendor, &context, &benchmarks, output.format),
        Commands::Simulate {
            context,
            weights,
            benchmark,
            output,
        } => analysis::simulate(&app, &context, &weights, benchmark.as_deref(), output.format),
    }
}

fn start_logging(cli: &Cli, config: &BenchmarxConfig) -> Result<()> {
    let Some(dir) = cli.log_dir.as_ref().or(config.logging.dir.as_ref()) else {
        return Ok(());
    };
    let dir = absolute(dir)?;
    let level = cli
        .log_level
        .as_deref()
        .unwrap_or(config.logging.level.as_str());
    init_logging(level, &dir).map_err(|message| anyhow!(message))?;
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("failed to resolve working directory")?;
    Ok(cwd.join(path))
}

impl App {
    pub fn service(&self) -> Result<ScoringService<'_>> {
        Ok(ScoringService::try_new(&self.conn)?
            .with_settings(self.config.scoring, self.config.risk))
    }

    pub fn vendor(&self, selector: &str) -> Result<Vendor> {
        let repo = SqliteVendorRepository::try_new(&self.conn)?;
        if let Some(id) = parse_id(selector) {
            if let Some(vendor) = repo.get_vendor(id)? {
                return Ok(vendor);
            }
        }
        repo.find_vendor_by_name(selector)?
            .ok_or_else(|| anyhow!("vendor `{selector}` not found"))
    }

    pub fn context(&self, selector: &str) -> Result<ContextProfile> {
        let repo = SqliteContextRepository::try_new(&self.conn)?;
        if let Some(id) = parse_id(selector) {
            if let Some(context) = repo.get_context(id)? {
                return Ok(context);
            }
        }
        repo.find_context_by_name(selector)?
            .ok_or_else(|| anyhow!("context profile `{selector}` not found"))
    }

    pub fn benchmark(&self, selector: &str) -> Result<Benchmark> {
        let repo = SqliteBenchmarkRepository::try_new(&self.conn)?;
        if let Some(id) = parse_id(selector) {
            if let Some(benchmark) = repo.get_benchmark(id)? {
                return Ok(benchmark);
            }
        }
        repo.find_benchmark_by_name(selector)?
            .ok_or_else(|| anyhow!("benchmark `{selector}` not found"))
    }

    /// `None` selects the active benchmark inside the service.
    pub fn benchmark_id(&self, selector: Option<&str>) -> Result<Option<BenchmarkId>> {
        selector
            .map(|value| self.benchmark(value).map(|benchmark| benchmark.id))
            .transpose()
    }

    pub fn category(&self, selector: &str) -> Result<AttackCategory> {
        let repo = SqliteCatalogRepository::try_new(&self.conn)?;
        if let Some(id) = parse_id(selector) {
            if let Some(category) = repo.get_category(id)? {
                return Ok(category);
            }
        }
        repo.find_category_by_name(selector)?
            .ok_or_else(|| anyhow!("attack category `{selector}` not found"))
    }

    pub fn attack(&self, selector: &str) -> Result<AttackListing> {
        let repo = SqliteCatalogRepository::try_new(&self.conn)?;
        if let Some(id) = parse_id(selector) {
            if let Some(attack) = repo.get_attack(id)? {
                return Ok(attack);
            }
        }
        repo.find_attack_by_name(selector)?
            .ok_or_else(|| anyhow!("attack `{selector}` not found"))
    }
}

fn parse_id(selector: &str) -> Option<Uuid> {
    Uuid::parse_str(selector.trim()).ok()
}
