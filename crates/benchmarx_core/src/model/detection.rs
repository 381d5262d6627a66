//! Per-attack detection outcomes.

use crate::model::benchmark::BenchmarkId;
use crate::model::catalog::{AttackId, CategoryId};
use crate::model::vendor::VendorId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Whether a vendor's product caught a simulated attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DetectionState {
    /// Blocked or alerted in real time.
    #[serde(rename = "ACTIVE")]
    Active,
    /// Detected only by post-execution telemetry.
    #[serde(rename = "DYNAMIC")]
    Dynamic,
    /// No evidence of detection.
    #[serde(rename = "NO_EVID")]
    NoEvidence,
}

impl DetectionState {
    pub const ALL: [Self; 3] = [Self::Active, Self::Dynamic, Self::NoEvidence];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Dynamic => "DYNAMIC",
            Self::NoEvidence => "NO_EVID",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "DYNAMIC" => Some(Self::Dynamic),
            "NO_EVID" | "NO_EVIDENCE" => Some(Self::NoEvidence),
            _ => None,
        }
    }

    /// `true` for states that count towards category coverage.
    pub fn is_detected(self) -> bool {
        !matches!(self, Self::NoEvidence)
    }
}

impl Display for DetectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored detection row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub id: Uuid,
    pub benchmark_id: BenchmarkId,
    pub vendor_id: VendorId,
    pub attack_id: AttackId,
    pub state: DetectionState,
    pub notes: Option<String>,
}

impl DetectionResult {
    pub fn new(
        benchmark_id: BenchmarkId,
        vendor_id: VendorId,
        attack_id: AttackId,
        state: DetectionState,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            benchmark_id,
            vendor_id,
            attack_id,
            state,
            notes: None,
        }
    }
}

/// Detection joined with the attack's category, the shape scoring consumes.
///
/// Category ids come from the join, so scoring never needs to look them up
/// per detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredDetection {
    pub attack_id: AttackId,
    pub attack_name: String,
    pub category_id: CategoryId,
    pub category_name: String,
    pub state: DetectionState,
}

#[cfg(test)]
mod tests {
    use super::DetectionState;

    #[test]
    fn parse_accepts_wire_names() {
        assert_eq!(DetectionState::parse("ACTIVE"), Some(DetectionState::Active));
        assert_eq!(DetectionState::parse("dynamic"), Some(DetectionState::Dynamic));
        assert_eq!(
            DetectionState::parse("NO_EVID"),
            Some(DetectionState::NoEvidence)
        );
        assert_eq!(DetectionState::parse("missed"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&DetectionState::NoEvidence).unwrap();
        assert_eq!(json, "\"NO_EVID\"");
    }
}
