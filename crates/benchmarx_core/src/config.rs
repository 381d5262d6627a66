//! File-based configuration.
//!
//! # Responsibility
//! - Load `benchmarx.toml` (or an explicit/env-selected file) into typed settings.
//! - Reject inconsistent thresholds before any scoring runs.
//!
//! # Invariants
//! - Every section is optional; missing keys fall back to defaults.
//! - Unknown keys are rejected so typos do not silently change scoring.

use crate::logging::default_log_level;
use crate::scoring::RiskThresholds;
use log::debug;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "benchmarx.toml";
pub const CONFIG_ENV_VAR: &str = "BENCHMARX_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarxConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub scoring: ScoringConfig,
    pub risk: RiskThresholds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("benchmarx.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files. Logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

/// Knobs of the ranking simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Percentage movement below which an unranked vendor is not reported as changed.
    pub min_score_delta: f64,
    pub weight_min: f64,
    pub weight_max: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            min_score_delta: 0.1,
            weight_min: 0.0,
            weight_max: 5.0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        message: String,
    },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, message } => {
                write!(f, "failed to parse config `{}`: {message}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl BenchmarxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.risk.validate().map_err(ConfigError::Invalid)?;

        let scoring = &self.scoring;
        if !scoring.min_score_delta.is_finite() || scoring.min_score_delta < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scoring.min_score_delta must be >= 0, got {}",
                scoring.min_score_delta
            )));
        }
        if !(scoring.weight_min.is_finite() && scoring.weight_max.is_finite())
            || scoring.weight_min < 0.0
            || scoring.weight_min > scoring.weight_max
        {
            return Err(ConfigError::Invalid(format!(
                "scoring weight bounds must satisfy 0 <= weight_min <= weight_max, got {}..{}",
                scoring.weight_min, scoring.weight_max
            )));
        }
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Parses and validates TOML text. `origin` is only used in error messages.
pub fn parse_config(contents: &str, origin: &Path) -> Result<BenchmarxConfig, ConfigError> {
    let config = toml::from_str::<BenchmarxConfig>(contents).map_err(|err| ConfigError::Parse {
        path: origin.to_path_buf(),
        message: err.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// Loads configuration.
///
/// Lookup order: `explicit`, `$BENCHMARX_CONFIG`, `./benchmarx.toml`, defaults.
/// The first two must exist when given; the working-directory file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<BenchmarxConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        return load_from_path(Path::new(&path));
    }

    let local = Path::new(CONFIG_FILE_NAME);
    if local.is_file() {
        return load_from_path(local);
    }

    debug!("event=config_load module=config status=ok source=defaults");
    Ok(BenchmarxConfig::default())
}

fn load_from_path(path: &Path) -> Result<BenchmarxConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&contents, path)?;
    debug!(
        "event=config_load module=config status=ok source={}",
        path.display()
    );
    Ok(config)
}
