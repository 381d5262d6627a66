//! Domain model for benchmark-driven vendor ranking.
//!
//! # Responsibility
//! - Define canonical records shared by repositories, scoring and import.
//! - Own field-level validation so every write path enforces the same rules.
//!
//! # Invariants
//! - Every persisted record is identified by a non-nil UUID.
//! - Enum wire names are stable; they double as database values.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod benchmark;
pub mod catalog;
pub mod context;
pub mod detection;
pub mod rule;
pub mod vendor;

/// Field-level validation failure shared by all domain records.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NilId(&'static str),
    EmptyField(&'static str),
    InvalidTechniqueId(String),
    InvalidWeight(f64),
    InvalidPoints {
        field: &'static str,
        value: f64,
    },
    NonMonotonicPoints,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NilId(entity) => write!(f, "{entity} id must not be nil"),
            Self::EmptyField(field) => write!(f, "`{field}` must not be empty"),
            Self::InvalidTechniqueId(value) => {
                write!(f, "invalid MITRE technique id `{value}`, expected T#### or T####.###")
            }
            Self::InvalidWeight(value) => {
                write!(f, "weight must be a finite value >= 0, got {value}")
            }
            Self::InvalidPoints { field, value } => {
                write!(f, "`{field}` must be a finite value, got {value}")
            }
            Self::NonMonotonicPoints => write!(
                f,
                "scoring points must satisfy active > 0 and active >= dynamic >= no_evid"
            ),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

pub(crate) fn require_id(entity: &'static str, id: &uuid::Uuid) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::NilId(entity));
    }
    Ok(())
}
