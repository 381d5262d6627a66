//! Attack catalog: categories (MITRE tactics) and the attacks run against vendors.

use crate::model::{require_id, require_text, ValidationError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CategoryId = Uuid;
pub type AttackId = Uuid;

static TECHNIQUE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^T\d{4}(\.\d{3})?$").expect("valid technique id regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "LOW" => Some(Self::Low),
            "MEDIUM" => Some(Self::Medium),
            "HIGH" => Some(Self::High),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackCategory {
    pub id: CategoryId,
    pub name: String,
    pub mitre_tactic: Option<String>,
    pub description: Option<String>,
}

impl AttackCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mitre_tactic: None,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("category", &self.id)?;
        require_text("name", &self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attack {
    pub id: AttackId,
    pub name: String,
    pub category_id: CategoryId,
    pub mitre_technique_id: Option<String>,
    pub severity: Severity,
    pub description: Option<String>,
}

impl Attack {
    pub fn new(name: impl Into<String>, category_id: CategoryId, severity: Severity) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category_id,
            mitre_technique_id: None,
            severity,
            description: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_id("attack", &self.id)?;
        require_id("category", &self.category_id)?;
        require_text("name", &self.name)?;
        if let Some(technique) = self.mitre_technique_id.as_deref() {
            if !TECHNIQUE_ID_RE.is_match(technique) {
                return Err(ValidationError::InvalidTechniqueId(technique.to_string()));
            }
        }
        Ok(())
    }
}

/// Attack joined with its category name, as listed by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackListing {
    pub attack: Attack,
    pub category_name: String,
    pub mitre_tactic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Attack, AttackCategory, Severity};
    use crate::model::ValidationError;

    #[test]
    fn technique_id_accepts_sub_techniques() {
        let category = AttackCategory::new("Execution");
        let mut attack = Attack::new("PowerShell", category.id, Severity::High);
        attack.mitre_technique_id = Some("T1059.001".to_string());
        assert!(attack.validate().is_ok());

        attack.mitre_technique_id = Some("T1059".to_string());
        assert!(attack.validate().is_ok());
    }

    #[test]
    fn technique_id_rejects_free_text() {
        let category = AttackCategory::new("Execution");
        let mut attack = Attack::new("PowerShell", category.id, Severity::High);
        attack.mitre_technique_id = Some("powershell".to_string());
        assert_eq!(
            attack.validate(),
            Err(ValidationError::InvalidTechniqueId("powershell".to_string()))
        );
    }

    #[test]
    fn severity_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("critical"), Some(Severity::Critical));
        assert_eq!(Severity::parse("severe"), None);
    }
}
