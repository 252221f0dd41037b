//! AI impact-analysis collaborator interfaces
//!
//! The core optionally augments its graph-based analysis with an external AI
//! assessment. The collaborator is fully degradable: every method tolerates
//! unavailability, and a failed analysis surfaces as `None`, never as an
//! error the caller must handle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::graph::{CriticalPath, TopologySnapshot};
use crate::model::{ChangeAction, Criticality};

/// Risk assessment produced by the AI collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiRiskAssessment {
    /// Severity verdict: critical | high | medium | low
    #[serde(default)]
    pub severity: String,

    /// Two to three sentence risk summary
    #[serde(default)]
    pub summary: String,

    /// Contributing risk factors, free text
    #[serde(default)]
    pub factors: Vec<String>,

    /// Suggested mitigations, free text
    #[serde(default)]
    pub mitigations: Vec<String>,
}

impl AiRiskAssessment {
    /// The severity parsed into the shared criticality scale.
    ///
    /// `None` when the AI returned something outside the four known values,
    /// which callers treat as "no usable AI severity".
    pub fn severity_level(&self) -> Option<Criticality> {
        Criticality::parse(&self.severity)
    }
}

/// Blast-radius summary produced by the AI collaborator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlastRadius {
    /// Total count of impacted nodes
    #[serde(default)]
    pub total_impacted: u64,

    /// Ids of critical services or applications at risk
    #[serde(default)]
    pub critical_services_at_risk: Vec<String>,

    /// Whether a failover path exists
    #[serde(default)]
    pub redundancy_available: bool,

    /// Explanation of the failover options
    #[serde(default)]
    pub redundancy_details: String,
}

/// The AI's reading of the change action itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionAnalysis {
    /// The change action analyzed
    #[serde(default)]
    pub action: String,

    /// The traversal strategy the AI considered appropriate
    #[serde(default)]
    pub traversal_strategy: String,

    /// Why that traversal fits this action
    #[serde(default)]
    pub explanation: String,
}

/// Structured result of an AI impact analysis.
///
/// Every field is optional: an absent `critical_paths` key keeps the
/// graph-built paths, while a present (even empty) list overrides them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiImpactAnalysis {
    /// Critical dependency paths identified by the AI
    #[serde(default)]
    pub critical_paths: Option<Vec<CriticalPath>>,

    /// Severity verdict with reasoning
    #[serde(default)]
    pub risk_assessment: Option<AiRiskAssessment>,

    /// Blast-radius summary
    #[serde(default)]
    pub blast_radius: Option<BlastRadius>,

    /// Action-level analysis
    #[serde(default)]
    pub action_analysis: Option<ActionAnalysis>,
}

/// Change details handed to the AI collaborator alongside the topology
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeContext {
    /// The proposed action, when it is in the known catalogue
    pub action: Option<ChangeAction>,

    /// Change type string (Firewall, Switch, ...)
    pub change_type: Option<String>,

    /// Target environment string (Prod, Preprod, ...)
    pub environment: Option<String>,

    /// Human-readable change title
    #[serde(default)]
    pub title: String,

    /// Explicit target node ids of the change
    #[serde(default)]
    pub target_node_ids: Vec<String>,
}

/// Contract for the AI impact-analysis collaborator.
#[async_trait]
pub trait AiAnalysisClient: Send + Sync {
    /// Contract: Cheap availability probe. When this returns `false` callers
    /// skip the AI step entirely.
    fn is_available(&self) -> bool;

    /// Contract: Analyzes a proposed change against a topology neighborhood.
    /// - Returns: `None` on any failure (unavailable, exhausted retries,
    ///   malformed output). Implementations must not panic or block
    ///   indefinitely; callers never see an error from this path.
    async fn analyze(
        &self,
        topology: &TopologySnapshot,
        change: &ChangeContext,
    ) -> Option<AiImpactAnalysis>;
}
