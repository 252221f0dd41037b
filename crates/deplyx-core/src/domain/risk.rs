use serde::{Deserialize, Serialize};
use std::fmt;

/// Published risk level of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Score 0-30: auto-approved
    Low,
    /// Score above 30 up to 70: targeted approval
    Medium,
    /// Score above 70: full CAB
    High,
}

impl RiskLevel {
    /// Map a 0-100 risk score onto a level. Total over all floats.
    pub fn for_score(score: f64) -> Self {
        if score <= 30.0 {
            RiskLevel::Low
        } else if score <= 70.0 {
            RiskLevel::Medium
        } else {
            RiskLevel::High
        }
    }

    /// Whether this level bypasses human approval
    pub fn auto_approve(self) -> bool {
        matches!(self, RiskLevel::Low)
    }

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One traceable contribution to a risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Stable factor name
    pub name: String,

    /// Points this factor contributed
    pub score: f64,

    /// Human-readable explanation
    pub reason: String,
}

impl RiskFactor {
    /// Create a factor entry
    pub fn new(name: impl Into<String>, score: f64, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score,
            reason: reason.into(),
        }
    }
}

/// Result of scoring a change.
///
/// `risk_level` is a pure function of `risk_score`, and `auto_approve` holds
/// exactly when the level is low. `factors` is never empty: every nonzero
/// contribution to the score appears as exactly one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Final score, 0-100, one decimal
    pub risk_score: f64,

    /// Level derived from the score
    pub risk_level: RiskLevel,

    /// Whether the change bypasses human approval
    pub auto_approve: bool,

    /// Ordered, traceable contributions
    pub factors: Vec<RiskFactor>,

    /// Whether an AI severity set the base score
    pub llm_driven: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping_is_total() {
        let cases = [
            (0.0, RiskLevel::Low),
            (30.0, RiskLevel::Low),
            (30.1, RiskLevel::Medium),
            (70.0, RiskLevel::Medium),
            (70.1, RiskLevel::High),
            (100.0, RiskLevel::High),
        ];
        for (score, expected) in cases {
            assert_eq!(RiskLevel::for_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn test_auto_approve_only_low() {
        assert!(RiskLevel::Low.auto_approve());
        assert!(!RiskLevel::Medium.auto_approve());
        assert!(!RiskLevel::High.auto_approve());
    }

    #[test]
    fn test_level_serde_lowercase() {
        assert_eq!(serde_json::to_string(&RiskLevel::High).unwrap(), "\"high\"");
        let parsed: RiskLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, RiskLevel::Medium);
    }
}
