//! Risk scoring engine
//!
//! When the impact analysis carries a usable AI severity, that severity sets
//! the base score and rule-based modifiers adjust it. Without one, the engine
//! falls back to pure rule-based scoring with larger weights, normalized to
//! the same 0-100 scale.

use chrono::{DateTime, Utc};
use deplyx_interfaces::ChangeAction;
use tracing::info;

use crate::domain::change::{ChangeRecord, Environment};
use crate::domain::impact::ImpactResult;
use crate::domain::risk::{RiskAssessment, RiskFactor, RiskLevel};
use deplyx_interfaces::Criticality;

// AI severity -> base score
fn ai_base_score(severity: Criticality) -> f64 {
    match severity {
        Criticality::Critical => 80.0,
        Criticality::High => 60.0,
        Criticality::Medium => 40.0,
        Criticality::Low => 20.0,
    }
}

// Modifier weights applied on top of the AI base
const MOD_PROD_ENV: f64 = 8.0;
const MOD_CORE_DEVICE: f64 = 10.0;
const MOD_HIGH_DEPS: f64 = 5.0;
const MOD_NO_ROLLBACK: f64 = 7.0;
const MOD_MAINT_WINDOW: f64 = 8.0;
const MOD_INCIDENT_HIST: f64 = 5.0;

// Rule-based weights used when no AI severity is available
const RULE_PROD_ENV: f64 = 30.0;
const RULE_CORE_DEVICE: f64 = 40.0;
const RULE_HIGH_DEPS: f64 = 20.0;
const RULE_NO_ROLLBACK: f64 = 25.0;
const RULE_MAINT_WINDOW: f64 = 30.0;
const RULE_INCIDENT_HIST: f64 = 15.0;

// Maximum attainable raw sum across all rule-based factors. Preserved as-is:
// re-deriving it would silently shift historical risk levels.
const RULE_BASED_MAX_RAW: f64 = 215.0;

/// Inherent severity of an action in AI-assisted mode
fn action_modifier(action: ChangeAction) -> (f64, &'static str) {
    match action {
        ChangeAction::Decommission => (10.0, "Decommission permanently removes infrastructure"),
        ChangeAction::DeleteSg => (
            10.0,
            "Deleting security group removes all associated protections",
        ),
        ChangeAction::FirmwareUpgrade => (
            8.0,
            "Firmware upgrade requires device reboot and potential outage",
        ),
        ChangeAction::RebootDevice => (7.0, "Device reboot causes temporary service disruption"),
        ChangeAction::RemoveRule => (6.0, "Removing firewall rule may expose protected services"),
        ChangeAction::DisableRule => (6.0, "Disabling firewall rule may expose protected services"),
        ChangeAction::DeleteVlan => (7.0, "VLAN deletion disconnects all member devices"),
        ChangeAction::ShutdownInterface => (6.0, "Interface shutdown severs connectivity"),
        ChangeAction::DisablePort => (4.0, "Port disable may disrupt connected services"),
        ChangeAction::ModifyRule => (3.0, "Rule modification may change traffic flow"),
        ChangeAction::AddRule => (2.0, "New rule addition - low risk if properly scoped"),
        ChangeAction::EnablePort => (2.0, "Enabling port - low risk"),
        ChangeAction::ChangeVlan => (3.0, "VLAN change may move devices between segments"),
        ChangeAction::ModifyVlan => (3.0, "VLAN modification may affect member devices"),
        ChangeAction::ConfigChange => (3.0, "Configuration change - moderate risk"),
        ChangeAction::ModifySg => (4.0, "Security group modification may change access patterns"),
    }
}

/// Inherent severity of an action in rule-based mode
fn action_severity(action: ChangeAction) -> (f64, &'static str) {
    match action {
        ChangeAction::Decommission => (35.0, "Decommission permanently removes infrastructure"),
        ChangeAction::DeleteSg => (
            35.0,
            "Deleting security group removes all associated protections",
        ),
        ChangeAction::FirmwareUpgrade => (
            30.0,
            "Firmware upgrade requires device reboot and potential outage",
        ),
        ChangeAction::RebootDevice => (25.0, "Device reboot causes temporary service disruption"),
        ChangeAction::RemoveRule => (20.0, "Removing firewall rule may expose protected services"),
        ChangeAction::DisableRule => {
            (20.0, "Disabling firewall rule may expose protected services")
        }
        ChangeAction::DeleteVlan => (25.0, "VLAN deletion disconnects all member devices"),
        ChangeAction::ShutdownInterface => (20.0, "Interface shutdown severs connectivity"),
        ChangeAction::DisablePort => (15.0, "Port disable may disrupt connected services"),
        ChangeAction::ModifyRule => (10.0, "Rule modification may change traffic flow"),
        ChangeAction::AddRule => (5.0, "New rule addition - low risk if properly scoped"),
        ChangeAction::EnablePort => (5.0, "Enabling port - low risk"),
        ChangeAction::ChangeVlan => (10.0, "VLAN change may move devices between segments"),
        ChangeAction::ModifyVlan => (10.0, "VLAN modification may affect member devices"),
        ChangeAction::ConfigChange => (10.0, "Configuration change - moderate risk"),
        ChangeAction::ModifySg => (
            15.0,
            "Security group modification may change access patterns",
        ),
    }
}

/// The change attributes that drive risk scoring
#[derive(Debug, Clone)]
pub struct ChangeRiskInput {
    /// Target environment
    pub environment: Environment,

    /// Proposed action
    pub action: Option<ChangeAction>,

    /// Rollback plan; absent or blank raises risk
    pub rollback_plan: Option<String>,

    /// Maintenance window start
    pub maintenance_window_start: Option<DateTime<Utc>>,

    /// Maintenance window end
    pub maintenance_window_end: Option<DateTime<Utc>>,

    /// Planned execution instant; "now" is used when absent
    pub scheduled_start: Option<DateTime<Utc>>,

    /// Explicit target node ids
    pub target_components: Vec<String>,

    /// Distinct rolled-back changes that touched the same targets
    pub incident_history_count: usize,
}

impl ChangeRiskInput {
    /// Build the scoring input from a change record
    pub fn from_change(change: &ChangeRecord, incident_history_count: usize) -> Self {
        Self {
            environment: change.environment,
            action: change.action,
            rollback_plan: change.rollback_plan.clone(),
            maintenance_window_start: change.maintenance_window_start,
            maintenance_window_end: change.maintenance_window_end,
            scheduled_start: None,
            target_components: change.target_components.clone(),
            incident_history_count,
        }
    }
}

/// Converts impact data and change metadata into a scored, explainable risk
/// assessment
#[derive(Debug, Default)]
pub struct RiskEngine;

impl RiskEngine {
    /// Create the engine
    pub fn new() -> Self {
        Self
    }

    /// Score a change against its impact analysis
    pub fn evaluate_change(
        &self,
        input: &ChangeRiskInput,
        impact: Option<&ImpactResult>,
    ) -> RiskAssessment {
        self.evaluate_change_at(input, impact, Utc::now())
    }

    /// Score with an explicit evaluation instant
    pub fn evaluate_change_at(
        &self,
        input: &ChangeRiskInput,
        impact: Option<&ImpactResult>,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        match impact.and_then(ImpactResult::ai_severity) {
            Some(severity) => self.evaluate_ai_driven(input, impact, severity, now),
            None => self.evaluate_rule_based(input, impact, now),
        }
    }

    fn evaluate_ai_driven(
        &self,
        input: &ChangeRiskInput,
        impact: Option<&ImpactResult>,
        severity: Criticality,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let mut factors: Vec<RiskFactor> = Vec::new();
        let base = ai_base_score(severity);

        let summary: String = impact
            .and_then(|i| i.risk_assessment.as_ref())
            .map(|a| a.summary.chars().take(200).collect())
            .unwrap_or_default();
        factors.push(RiskFactor::new(
            "llm_risk_assessment",
            base,
            format!("AI assessed severity as {severity}: {summary}"),
        ));

        let mut modifier = 0.0;
        if input.environment.is_production() {
            modifier += MOD_PROD_ENV;
            factors.push(RiskFactor::new(
                "production_environment",
                MOD_PROD_ENV,
                "Change targets Production environment",
            ));
        }
        if is_core_target(&input.target_components, impact) {
            modifier += MOD_CORE_DEVICE;
            factors.push(RiskFactor::new(
                "core_network_device",
                MOD_CORE_DEVICE,
                "Change affects core/critical network device",
            ));
        }
        let dep_count = impact.map(|i| i.total_dependency_count).unwrap_or(0);
        if dep_count > 10 {
            modifier += MOD_HIGH_DEPS;
            factors.push(RiskFactor::new(
                "high_dependency_count",
                MOD_HIGH_DEPS,
                format!("{dep_count} dependencies affected (>10)"),
            ));
        }
        if rollback_plan_missing(input) {
            modifier += MOD_NO_ROLLBACK;
            factors.push(RiskFactor::new(
                "no_rollback_plan",
                MOD_NO_ROLLBACK,
                "No rollback plan provided",
            ));
        }
        if let Some(reason) = maintenance_window_risk(input, now) {
            modifier += MOD_MAINT_WINDOW;
            factors.push(RiskFactor::new("maintenance_window", MOD_MAINT_WINDOW, reason));
        }
        if input.incident_history_count > 0 {
            modifier += MOD_INCIDENT_HIST;
            factors.push(RiskFactor::new(
                "incident_history",
                MOD_INCIDENT_HIST,
                format!(
                    "{} previous rolled-back changes on impacted components",
                    input.incident_history_count
                ),
            ));
        }
        if let Some(action) = input.action {
            let (score, reason) = action_modifier(action);
            modifier += score;
            factors.push(RiskFactor::new("action_severity", score, reason));
        }

        let final_score = round1((base + modifier).clamp(0.0, 100.0));
        self.build_result(final_score, factors, true)
    }

    fn evaluate_rule_based(
        &self,
        input: &ChangeRiskInput,
        impact: Option<&ImpactResult>,
        now: DateTime<Utc>,
    ) -> RiskAssessment {
        let mut factors: Vec<RiskFactor> = Vec::new();
        let mut raw_score = 0.0;

        if input.environment.is_production() {
            raw_score += RULE_PROD_ENV;
            factors.push(RiskFactor::new(
                "production_environment",
                RULE_PROD_ENV,
                "Change targets Production environment",
            ));
        }
        if is_core_target(&input.target_components, impact) {
            raw_score += RULE_CORE_DEVICE;
            factors.push(RiskFactor::new(
                "core_network_device",
                RULE_CORE_DEVICE,
                "Change affects core/critical network device",
            ));
        }
        let dep_count = impact.map(|i| i.total_dependency_count).unwrap_or(0);
        if dep_count > 10 {
            raw_score += RULE_HIGH_DEPS;
            factors.push(RiskFactor::new(
                "high_dependency_count",
                RULE_HIGH_DEPS,
                format!("{dep_count} dependencies affected (>10)"),
            ));
        }
        if rollback_plan_missing(input) {
            raw_score += RULE_NO_ROLLBACK;
            factors.push(RiskFactor::new(
                "no_rollback_plan",
                RULE_NO_ROLLBACK,
                "No rollback plan provided",
            ));
        }
        if let Some(reason) = maintenance_window_risk(input, now) {
            raw_score += RULE_MAINT_WINDOW;
            factors.push(RiskFactor::new(
                "maintenance_window",
                RULE_MAINT_WINDOW,
                reason,
            ));
        }
        if input.incident_history_count > 0 {
            raw_score += RULE_INCIDENT_HIST;
            factors.push(RiskFactor::new(
                "incident_history",
                RULE_INCIDENT_HIST,
                format!(
                    "{} previous rolled-back changes on impacted components",
                    input.incident_history_count
                ),
            ));
        }
        if let Some(action) = input.action {
            let (score, reason) = action_severity(action);
            raw_score += score;
            factors.push(RiskFactor::new("action_severity", score, reason));
        }

        let normalized = round1((raw_score / RULE_BASED_MAX_RAW * 100.0).min(100.0));
        self.build_result(normalized, factors, false)
    }

    fn build_result(
        &self,
        score: f64,
        factors: Vec<RiskFactor>,
        llm_driven: bool,
    ) -> RiskAssessment {
        let risk_level = RiskLevel::for_score(score);
        let auto_approve = risk_level.auto_approve();
        info!(
            "Risk assessment: score={score:.1} level={risk_level} auto_approve={auto_approve} llm_driven={llm_driven}"
        );
        RiskAssessment {
            risk_score: score,
            risk_level,
            auto_approve,
            factors,
            llm_driven,
        }
    }
}

/// Core-infrastructure heuristic: id markers on the targets, or a directly
/// impacted node that is critical or a firewall/router
fn is_core_target(target_components: &[String], impact: Option<&ImpactResult>) -> bool {
    let id_match = target_components.iter().any(|c| {
        let upper = c.to_uppercase();
        upper.contains("CORE") || upper.starts_with("FW-")
    });
    if id_match {
        return true;
    }
    impact.is_some_and(|i| {
        i.directly_impacted.iter().any(|node| {
            node.criticality() == Criticality::Critical
                || matches!(node.property_str("type"), Some("firewall") | Some("router"))
        })
    })
}

fn rollback_plan_missing(input: &ChangeRiskInput) -> bool {
    match &input.rollback_plan {
        Some(plan) => plan.trim().is_empty(),
        None => true,
    }
}

/// Window risk reason, or `None` when the change falls inside its window.
///
/// The reference instant is the planned execution start when provided,
/// otherwise the evaluation instant; all comparisons are in UTC.
fn maintenance_window_risk(input: &ChangeRiskInput, now: DateTime<Utc>) -> Option<&'static str> {
    let (Some(start), Some(end)) = (
        input.maintenance_window_start,
        input.maintenance_window_end,
    ) else {
        return Some("No maintenance window defined");
    };
    let reference = input.scheduled_start.unwrap_or(now);
    if reference < start || reference > end {
        return Some("Change is outside defined maintenance window");
    }
    None
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::impact::ImpactResult;
    use chrono::Duration;
    use deplyx_interfaces::{
        AiRiskAssessment, GraphNode, NodeLabel, TraversalStrategy,
    };
    use pretty_assertions::assert_eq;

    fn empty_impact() -> ImpactResult {
        ImpactResult {
            directly_impacted: vec![],
            indirectly_impacted: vec![],
            affected_applications: vec![],
            affected_services: vec![],
            affected_vlans: vec![],
            total_dependency_count: 0,
            max_criticality: Criticality::Low,
            traversal_strategy: TraversalStrategy::GenericNeighborCrawl,
            critical_paths: vec![],
            risk_assessment: None,
            blast_radius: None,
            action_analysis: None,
            llm_powered: false,
        }
    }

    fn impact_with_severity(severity: &str, dep_count: usize) -> ImpactResult {
        let mut impact = empty_impact();
        impact.total_dependency_count = dep_count;
        impact.risk_assessment = Some(AiRiskAssessment {
            severity: severity.to_string(),
            summary: "AI summary".to_string(),
            ..Default::default()
        });
        impact.llm_powered = true;
        impact
    }

    fn quiet_input() -> ChangeRiskInput {
        let now = Utc::now();
        ChangeRiskInput {
            environment: Environment::Preprod,
            action: None,
            rollback_plan: Some("revert config".to_string()),
            maintenance_window_start: Some(now - Duration::hours(1)),
            maintenance_window_end: Some(now + Duration::hours(1)),
            scheduled_start: None,
            target_components: vec!["sw-edge-07".to_string()],
            incident_history_count: 0,
        }
    }

    #[test]
    fn test_ai_driven_worst_case_clamps_to_100() {
        let now = Utc::now();
        let input = ChangeRiskInput {
            environment: Environment::Prod,
            action: ChangeAction::parse("decommission"),
            rollback_plan: None,
            maintenance_window_start: None,
            maintenance_window_end: None,
            scheduled_start: None,
            target_components: vec!["FW-CORE-01".to_string()],
            incident_history_count: 1,
        };
        let impact = impact_with_severity("high", 12);

        let engine = RiskEngine::new();
        let result = engine.evaluate_change_at(&input, Some(&impact), now);

        // 60 + 8 + 10 + 5 + 7 + 8 + 5 + 10 = 113, clamped
        let factor_sum: f64 = result.factors.iter().map(|f| f.score).sum();
        assert_eq!(factor_sum, 113.0);
        assert_eq!(result.risk_score, 100.0);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert!(!result.auto_approve);
        assert!(result.llm_driven);
        assert_eq!(result.factors.len(), 8);
    }

    #[test]
    fn test_ai_driven_quiet_change_stays_at_base() {
        let input = quiet_input();
        let impact = impact_with_severity("low", 2);
        let result = RiskEngine::new().evaluate_change(&input, Some(&impact));

        assert_eq!(result.risk_score, 20.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.auto_approve);
        assert_eq!(result.factors.len(), 1);
        assert!(result.factors[0].reason.contains("AI summary"));
    }

    #[test]
    fn test_unusable_ai_severity_falls_back_to_rule_based() {
        let input = quiet_input();
        let impact = impact_with_severity("catastrophic", 2);
        let result = RiskEngine::new().evaluate_change(&input, Some(&impact));
        assert!(!result.llm_driven);
    }

    #[test]
    fn test_rule_based_production_only() {
        let now = Utc::now();
        let mut input = quiet_input();
        input.environment = Environment::Prod;
        let impact = empty_impact();

        let result = RiskEngine::new().evaluate_change_at(&input, Some(&impact), now);

        // 30 / 215 * 100 = 13.95..., published with one decimal
        assert_eq!(result.risk_score, 14.0);
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.auto_approve);
        assert!(!result.llm_driven);
        assert_eq!(result.factors.len(), 1);
        assert_eq!(result.factors[0].name, "production_environment");

        // The factor sum reproduces the score through the mode's transform
        let raw: f64 = result.factors.iter().map(|f| f.score).sum();
        assert_eq!(round1((raw / 215.0 * 100.0).min(100.0)), result.risk_score);
    }

    #[test]
    fn test_rule_based_all_factors_cap_at_100() {
        let now = Utc::now();
        let input = ChangeRiskInput {
            environment: Environment::Prod,
            action: ChangeAction::parse("decommission"),
            rollback_plan: Some("   ".to_string()),
            maintenance_window_start: None,
            maintenance_window_end: None,
            scheduled_start: None,
            target_components: vec!["CORE-RTR-01".to_string()],
            incident_history_count: 3,
        };
        let mut impact = empty_impact();
        impact.total_dependency_count = 25;

        let result = RiskEngine::new().evaluate_change_at(&input, Some(&impact), now);

        // 30+40+20+25+30+15+35 = 195 raw, 90.7 normalized
        let raw: f64 = result.factors.iter().map(|f| f.score).sum();
        assert_eq!(raw, 195.0);
        assert_eq!(result.risk_score, 90.7);
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.factors.len(), 7);
    }

    #[test]
    fn test_core_target_heuristics() {
        assert!(is_core_target(&["dc1-CORE-sw".to_string()], None));
        assert!(is_core_target(&["fw-edge-2".to_string()], None));
        assert!(!is_core_target(&["sw-access-9".to_string()], None));

        // Critical direct node triggers the heuristic even without id markers
        let mut impact = empty_impact();
        let mut node = GraphNode::new("sw-access-9", NodeLabel::Device);
        node.properties
            .insert("criticality".to_string(), serde_json::json!("critical"));
        impact.directly_impacted.push(node);
        assert!(is_core_target(&["sw-access-9".to_string()], Some(&impact)));

        // Firewall type triggers it too
        let mut impact = empty_impact();
        let mut node = GraphNode::new("edge-1", NodeLabel::Device);
        node.properties
            .insert("type".to_string(), serde_json::json!("firewall"));
        impact.directly_impacted.push(node);
        assert!(is_core_target(&["edge-1".to_string()], Some(&impact)));
    }

    #[test]
    fn test_maintenance_window_checks() {
        let now = Utc::now();
        let mut input = quiet_input();

        // Inside the window: no risk
        assert_eq!(maintenance_window_risk(&input, now), None);

        // Window boundaries are inclusive
        input.scheduled_start = input.maintenance_window_end;
        assert_eq!(maintenance_window_risk(&input, now), None);

        // Scheduled start outside the window
        input.scheduled_start = Some(now + Duration::hours(6));
        assert_eq!(
            maintenance_window_risk(&input, now),
            Some("Change is outside defined maintenance window")
        );

        // Missing window bounds
        input.maintenance_window_end = None;
        assert_eq!(
            maintenance_window_risk(&input, now),
            Some("No maintenance window defined")
        );
    }

    #[test]
    fn test_blank_rollback_plan_counts_as_missing() {
        let mut input = quiet_input();
        assert!(!rollback_plan_missing(&input));
        input.rollback_plan = Some("  \n".to_string());
        assert!(rollback_plan_missing(&input));
        input.rollback_plan = None;
        assert!(rollback_plan_missing(&input));
    }

    #[test]
    fn test_ai_base_table() {
        let cases = [
            ("critical", 80.0),
            ("high", 60.0),
            ("medium", 40.0),
            ("low", 20.0),
        ];
        for (severity, expected_base) in cases {
            let input = quiet_input();
            let impact = impact_with_severity(severity, 0);
            let result = RiskEngine::new().evaluate_change(&input, Some(&impact));
            assert_eq!(result.factors[0].score, expected_base, "severity {severity}");
        }
    }
}
