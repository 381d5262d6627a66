use benchmarx_core::model::benchmark::parse_report_date;
use benchmarx_core::{CompanySize, SecurityMaturity};
use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "benchmarx")]
#[command(about = "Context-weighted EDR/XDR vendor ranking from benchmark results", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to $BENCHMARX_CONFIG, then ./benchmarx.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database path, overrides `[database] path`
    #[arg(long, global = true, env = "BENCHMARX_DB")]
    pub db: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Directory for rolling log files; logging is off unless set here or in config
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct FormatArg {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create or migrate the database
    Init,
    /// Show store counts, active benchmark and active scoring rule
    Status {
        #[command(flatten)]
        output: FormatArg,
    },
    /// Import a benchmark report from a JSON document
    Import {
        file: PathBuf,
        /// Activate the benchmark after importing
        #[arg(long)]
        activate: bool,
    },
    /// List vendors
    Vendors {
        #[command(flatten)]
        output: FormatArg,
    },
    /// List attack categories
    Categories {
        #[command(flatten)]
        output: FormatArg,
    },
    /// List attacks with their categories
    Attacks {
        #[command(flatten)]
        output: FormatArg,
    },
    /// Manage benchmarks
    #[command(subcommand)]
    Benchmarks(BenchmarkCommand),
    /// Manage context profiles and their weights
    #[command(subcommand)]
    Contexts(ContextCommand),
    /// Manage scoring rules
    #[command(subcommand)]
    Rules(RuleCommand),
    /// Score one vendor under a context
    Score {
        /// Vendor name or id
        vendor: String,
        /// Context profile name or id
        #[arg(long)]
        context: String,
        /// Benchmark name or id (defaults to the active benchmark)
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Rank vendors under a context
    Rank {
        /// Context profile name or id
        #[arg(long)]
        context: String,
        #[arg(long)]
        benchmark: Option<String>,
        /// Show only the top N vendors
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Rank and score of one vendor under every context profile
    Profile {
        vendor: String,
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Per-category detection coverage of a vendor
    Coverage {
        vendor: String,
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Per-category risk levels of a vendor
    Heatmap {
        vendor: String,
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Store scores of every context and vendor for a benchmark
    Materialize {
        #[arg(long)]
        benchmark: Option<String>,
    },
    /// Explain the latest materialized score of a vendor
    Explain {
        vendor: String,
        #[arg(long)]
        context: String,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Compare vendors side by side
    Compare {
        /// Vendor names or ids
        #[arg(required = true, num_args = 1.., value_delimiter = ',')]
        vendors: Vec<String>,
        #[arg(long)]
        context: String,
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Materialized score history of a vendor across benchmarks
    Trend {
        vendor: String,
        #[arg(long)]
        context: String,
        /// Restrict to these benchmarks (repeatable)
        #[arg(long = "benchmark")]
        benchmarks: Vec<String>,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Re-rank with temporary category weights; nothing is saved
    Simulate {
        #[arg(long)]
        context: String,
        /// Category weight override as CATEGORY=VALUE (repeatable)
        #[arg(long = "weight", value_parser = parse_weight_override)]
        weights: Vec<(String, f64)>,
        #[arg(long)]
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum BenchmarkCommand {
    /// List benchmarks, newest first
    List {
        #[command(flatten)]
        output: FormatArg,
    },
    /// Register an empty benchmark
    Create {
        name: String,
        /// Test laboratory
        #[arg(long)]
        source: String,
        /// Report date as YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        report_date: NaiveDate,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        imported_by: Option<String>,
        #[arg(long)]
        activate: bool,
    },
    /// Make a benchmark the active one
    Activate { benchmark: String },
    /// Detection counts of a benchmark (defaults to the active one)
    Stats {
        benchmark: Option<String>,
        #[command(flatten)]
        output: FormatArg,
    },
}

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// List context profiles
    List {
        #[command(flatten)]
        output: FormatArg,
    },
    /// Create a context profile
    Create {
        name: String,
        #[arg(long)]
        industry: String,
        /// Small, Medium or Enterprise
        #[arg(long, value_parser = parse_company_size)]
        size: CompanySize,
        /// Basic, Intermediate or Advanced
        #[arg(long, value_parser = parse_maturity)]
        maturity: SecurityMaturity,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show the weights of a context profile
    Weights {
        context: String,
        #[command(flatten)]
        output: FormatArg,
    },
    /// Set a category or attack weight
    #[command(group(ArgGroup::new("target").required(true).args(["category", "attack"])))]
    SetWeight {
        context: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        attack: Option<String>,
        #[arg(long)]
        weight: f64,
        #[arg(long)]
        rationale: Option<String>,
    },
    /// Remove a category or attack weight
    #[command(group(ArgGroup::new("target").required(true).args(["category", "attack"])))]
    UnsetWeight {
        context: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        attack: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum RuleCommand {
    /// List scoring rules
    List {
        #[command(flatten)]
        output: FormatArg,
    },
    /// Create a scoring rule version
    Create {
        version: String,
        #[arg(long)]
        active_points: f64,
        #[arg(long)]
        dynamic_points: f64,
        #[arg(long, default_value = "0")]
        no_evid_points: f64,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        created_by: Option<String>,
        #[arg(long)]
        activate: bool,
    },
    /// Make a rule version the active one
    Activate { version: String },
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_report_date(value).ok_or_else(|| format!("invalid date `{value}`, expected YYYY-MM-DD"))
}

fn parse_company_size(value: &str) -> Result<CompanySize, String> {
    CompanySize::parse(value)
        .ok_or_else(|| format!("invalid company size `{value}`, expected Small|Medium|Enterprise"))
}

fn parse_maturity(value: &str) -> Result<SecurityMaturity, String> {
    SecurityMaturity::parse(value).ok_or_else(|| {
        format!("invalid security maturity `{value}`, expected Basic|Intermediate|Advanced")
    })
}

fn parse_weight_override(value: &str) -> Result<(String, f64), String> {
    let (category, weight) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("invalid override `{value}`, expected CATEGORY=VALUE"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("invalid override `{value}`, category is empty"));
    }
    let weight = weight
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid weight in `{value}`: {err}"))?;
    Ok((category.to_string(), weight))
}
