use chrono::{DateTime, Utc};
use deplyx_interfaces::ChangeAction;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::domain::risk::RiskLevel;

/// Value object: Change ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeId(pub String);

impl ChangeId {
    /// Generate a fresh change id
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ChangeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Change lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeStatus {
    /// Being drafted, not yet submitted
    Draft,

    /// Submitted, waiting for approvals
    Pending,

    /// Impact/risk analysis in progress
    Analyzing,

    /// Approved for execution
    Approved,

    /// Rejected by an approver or by timeout escalation
    Rejected,

    /// Execution in progress
    Executing,

    /// Executed successfully
    Completed,

    /// Executed and rolled back after an incident
    RolledBack,
}

impl ChangeStatus {
    /// Canonical status string
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeStatus::Draft => "Draft",
            ChangeStatus::Pending => "Pending",
            ChangeStatus::Analyzing => "Analyzing",
            ChangeStatus::Approved => "Approved",
            ChangeStatus::Rejected => "Rejected",
            ChangeStatus::Executing => "Executing",
            ChangeStatus::Completed => "Completed",
            ChangeStatus::RolledBack => "RolledBack",
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target environment of a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    /// Production
    Prod,
    /// Pre-production
    Preprod,
    /// Datacenter 1 lab
    #[serde(rename = "DC1")]
    Dc1,
    /// Datacenter 2 lab
    #[serde(rename = "DC2")]
    Dc2,
}

impl Environment {
    /// Whether this environment carries production risk weighting
    pub fn is_production(self) -> bool {
        matches!(self, Environment::Prod)
    }

    /// Canonical environment string
    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Prod => "Prod",
            Environment::Preprod => "Preprod",
            Environment::Dc1 => "DC1",
            Environment::Dc2 => "DC2",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of infrastructure a change touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    /// Firewall appliance or policy
    Firewall,
    /// Switch hardware or configuration
    Switch,
    /// VLAN definition
    #[serde(rename = "VLAN")]
    Vlan,
    /// Switch port
    Port,
    /// Rack-level physical work
    Rack,
    /// Cloud security group
    #[serde(rename = "CloudSG")]
    CloudSg,
    /// Anything outside the known categories
    #[serde(other)]
    Other,
}

impl ChangeType {
    /// Canonical change type string
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Firewall => "Firewall",
            ChangeType::Switch => "Switch",
            ChangeType::Vlan => "VLAN",
            ChangeType::Port => "Port",
            ChangeType::Rack => "Rack",
            ChangeType::CloudSg => "CloudSG",
            ChangeType::Other => "Other",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate: a proposed infrastructure change.
///
/// The risk core reads the descriptive fields and writes `risk_score`,
/// `risk_level`, and `status`; everything else belongs to the outer layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Unique identifier
    pub id: ChangeId,

    /// Human-readable title
    pub title: String,

    /// Category of infrastructure touched
    pub change_type: ChangeType,

    /// Target environment
    pub environment: Environment,

    /// Proposed action, when inside the known catalogue
    pub action: Option<ChangeAction>,

    /// Free-text description
    pub description: String,

    /// Execution plan
    pub execution_plan: String,

    /// Rollback plan; absence raises risk
    pub rollback_plan: Option<String>,

    /// Maintenance window start
    pub maintenance_window_start: Option<DateTime<Utc>>,

    /// Maintenance window end
    pub maintenance_window_end: Option<DateTime<Utc>>,

    /// Lifecycle status
    pub status: ChangeStatus,

    /// Published risk score, set by the risk engine
    pub risk_score: Option<f64>,

    /// Published risk level, set by the risk engine
    pub risk_level: Option<RiskLevel>,

    /// Reason recorded when the change is rejected
    pub reject_reason: Option<String>,

    /// Explicit target node ids in the dependency graph
    pub target_components: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl ChangeRecord {
    /// Create a draft change
    pub fn new(
        title: impl Into<String>,
        change_type: ChangeType,
        environment: Environment,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ChangeId::new(),
            title: title.into(),
            change_type,
            environment,
            action: None,
            description: String::new(),
            execution_plan: String::new(),
            rollback_plan: None,
            maintenance_window_start: None,
            maintenance_window_end: None,
            status: ChangeStatus::Draft,
            risk_score: None,
            risk_level: None,
            reject_reason: None,
            target_components: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the change to a new lifecycle status
    pub fn set_status(&mut self, status: ChangeStatus) {
        self.status = status;
        self.touch();
    }

    /// Update the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_creation_defaults() {
        let change = ChangeRecord::new("Replace core uplink", ChangeType::Switch, Environment::Prod);
        assert_eq!(change.status, ChangeStatus::Draft);
        assert!(change.risk_score.is_none());
        assert!(change.target_components.is_empty());
        assert!(!change.id.0.is_empty());
    }

    #[test]
    fn test_status_transition_touches_timestamp() {
        let mut change =
            ChangeRecord::new("Disable port", ChangeType::Port, Environment::Preprod);
        let before = change.updated_at;
        change.set_status(ChangeStatus::Pending);
        assert_eq!(change.status, ChangeStatus::Pending);
        assert!(change.updated_at >= before);
    }

    #[test]
    fn test_change_type_serde_names() {
        assert_eq!(
            serde_json::to_string(&ChangeType::CloudSg).unwrap(),
            "\"CloudSG\""
        );
        assert_eq!(serde_json::to_string(&ChangeType::Vlan).unwrap(), "\"VLAN\"");
        // Unknown types fall into the catch-all
        let parsed: ChangeType = serde_json::from_str("\"Loadbalancer\"").unwrap();
        assert_eq!(parsed, ChangeType::Other);
    }

    #[test]
    fn test_environment_production_flag() {
        assert!(Environment::Prod.is_production());
        assert!(!Environment::Preprod.is_production());
        assert!(!Environment::Dc1.is_production());
    }
}
