//! Business context profiles and their risk weights.

use crate::model::catalog::{AttackId, CategoryId};
use crate::model::{require_id, require_text, ValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ContextId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompanySize {
    Small,
    Medium,
    Enterprise,
}

impl CompanySize {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Enterprise => "Enterprise",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SecurityMaturity {
    Basic,
    Intermediate,
    Advanced,
}

impl SecurityMaturity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }
}

/// Named business scenario used to weight attack categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextProfile {
    pub id: ContextId,
    pub name: String,
    pub industry: String,
    pub company_size: CompanySize,
    pub security_maturity: SecurityMaturity,
    pub description: Option<String>,
}

impl ContextProfile {
    pub fn new(
        name: impl Into<String>,
        industry: impl Into<String>,
        company_size: CompanySize,
        security_maturity: SecurityMaturity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            industry: industry.into(),
            company_size,
            security_maturity,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("context", &self.id)?;
        require_text("name", &self.name)?;
        require_text("industry", &self.industry)
    }
}

/// What a context weight applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WeightTarget {
    Category(CategoryId),
    /// Overrides the category weight for a single attack.
    Attack(AttackId),
}

/// Stored weight joined with the target's display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextWeight {
    pub context_id: ContextId,
    pub target: WeightTarget,
    pub target_name: String,
    pub weight: f64,
    pub rationale: Option<String>,
}

/// Validates a multiplier before it reaches storage or a simulation.
pub fn validate_weight(weight: f64) -> Result<(), ValidationError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(ValidationError::InvalidWeight(weight));
    }
    Ok(())
}
