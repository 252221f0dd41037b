//! Approval workflow routing
//!
//! Routes a scored change to the right approval path, tracks completion of
//! the created approval records, and escalates records that outlive their
//! timeout. Approval records only ever move forward from Pending, so the
//! timeout sweep is safe to run concurrently with in-progress decisions.

use std::fmt;
use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::config::WorkflowConfig;
use crate::domain::approval::{
    Approval, ApprovalDecision, ApprovalId, ApprovalSummary, ApproverRole,
};
use crate::domain::change::{ChangeId, ChangeStatus, ChangeType};
use crate::domain::repository::{
    ApprovalRepository, AuditEntry, AuditLogRepository, ChangeRepository,
};
use crate::domain::risk::{RiskAssessment, RiskLevel};
use crate::CoreError;

/// The approval path a routed change was put on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NextStep {
    /// Low risk: approved without human sign-off
    AutoApprove,
    /// Medium risk: routed to the relevant role leads
    TargetedApproval,
    /// High risk: routed to the full change advisory board
    CabRequired,
}

impl NextStep {
    /// Canonical kebab-case name
    pub fn as_str(self) -> &'static str {
        match self {
            NextStep::AutoApprove => "auto-approve",
            NextStep::TargetedApproval => "targeted-approval",
            NextStep::CabRequired => "cab-required",
        }
    }
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of routing a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    /// The approval path taken
    pub next_step: NextStep,

    /// Number of approval records created
    pub approvals_created: usize,

    /// Roles whose sign-off is required; empty on auto-approve
    pub required_roles: Vec<ApproverRole>,
}

/// Routes changes through the approval workflow
pub struct WorkflowEngine {
    changes: Arc<dyn ChangeRepository>,
    approvals: Arc<dyn ApprovalRepository>,
    audit: Arc<dyn AuditLogRepository>,
    config: WorkflowConfig,
}

impl WorkflowEngine {
    /// Create the workflow engine
    pub fn new(
        changes: Arc<dyn ChangeRepository>,
        approvals: Arc<dyn ApprovalRepository>,
        audit: Arc<dyn AuditLogRepository>,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            changes,
            approvals,
            audit,
            config,
        }
    }

    /// Route a change based on its risk assessment, creating approval
    /// records as needed
    pub async fn route_change(
        &self,
        change_id: &ChangeId,
        risk: &RiskAssessment,
        actor_id: Option<&str>,
    ) -> Result<RoutingOutcome, CoreError> {
        let mut change = self
            .changes
            .find_by_id(change_id)
            .await?
            .ok_or_else(|| CoreError::ChangeNotFound(change_id.to_string()))?;

        if risk.auto_approve && risk.risk_level == RiskLevel::Low {
            change.set_status(ChangeStatus::Approved);
            self.changes.save(&change).await?;
            self.audit
                .append(AuditEntry::new(
                    change_id.clone(),
                    actor_id.map(str::to_string),
                    "auto_approved",
                    json!({
                        "risk_score": risk.risk_score,
                        "reason": "Low risk - auto-approved by workflow engine",
                    }),
                ))
                .await?;
            info!("Change {change_id} auto-approved (score={})", risk.risk_score);
            return Ok(RoutingOutcome {
                next_step: NextStep::AutoApprove,
                approvals_created: 0,
                required_roles: vec![],
            });
        }

        let required_roles = required_roles_for(change.change_type, risk.risk_level);
        let timeout_at = Utc::now() + Duration::hours(self.config.approval_timeout_hours);

        let mut approvals_created = 0;
        for role in &required_roles {
            self.approvals
                .create(Approval::pending(change_id.clone(), *role, timeout_at))
                .await?;
            approvals_created += 1;
        }

        change.set_status(ChangeStatus::Pending);
        self.changes.save(&change).await?;

        self.audit
            .append(AuditEntry::new(
                change_id.clone(),
                actor_id.map(str::to_string),
                "routed_for_approval",
                json!({
                    "risk_level": risk.risk_level,
                    "required_roles": required_roles,
                    "timeout_at": timeout_at.to_rfc3339(),
                }),
            ))
            .await?;

        let next_step = if risk.risk_level == RiskLevel::High {
            NextStep::CabRequired
        } else {
            NextStep::TargetedApproval
        };
        info!(
            "Change {change_id} routed for approval: {next_step}, roles={:?}",
            required_roles
        );
        Ok(RoutingOutcome {
            next_step,
            approvals_created,
            required_roles,
        })
    }

    /// Summarize the approval state of a change
    pub async fn check_approvals(&self, change_id: &ChangeId) -> Result<ApprovalSummary, CoreError> {
        let approvals = self.approvals.find_by_change(change_id).await?;
        Ok(ApprovalSummary::from_records(&approvals))
    }

    /// Apply an approver's decision and auto-transition the change once its
    /// approval state settles. A single rejection is terminal regardless of
    /// other records.
    pub async fn record_decision(
        &self,
        change_id: &ChangeId,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        approver_id: Option<&str>,
        comment: Option<String>,
    ) -> Result<Approval, CoreError> {
        let mut approval = self
            .approvals
            .find_by_id(change_id, approval_id)
            .await?
            .ok_or_else(|| CoreError::ApprovalNotFound(approval_id.to_string()))?;

        approval.decide(decision, approver_id, comment.clone(), Utc::now())?;
        self.approvals.save(&approval).await?;

        self.audit
            .append(AuditEntry::new(
                change_id.clone(),
                approver_id.map(str::to_string),
                format!("approval_{}", decision.as_str_lower()),
                json!({
                    "approval_id": approval_id.0,
                    "comment": comment,
                    "role": approval.role_required,
                }),
            ))
            .await?;

        let summary = self.check_approvals(change_id).await?;
        if summary.all_approved {
            if let Some(mut change) = self.changes.find_by_id(change_id).await? {
                change.set_status(ChangeStatus::Approved);
                self.changes.save(&change).await?;
            }
            self.audit
                .append(AuditEntry::new(
                    change_id.clone(),
                    approver_id.map(str::to_string),
                    "change_approved",
                    json!({"approved_by_workflow": true}),
                ))
                .await?;
        } else if summary.any_rejected {
            if let Some(mut change) = self.changes.find_by_id(change_id).await? {
                change.set_status(ChangeStatus::Rejected);
                change.reject_reason = Some("Rejected by approver".to_string());
                self.changes.save(&change).await?;
            }
        }

        Ok(approval)
    }

    /// Escalate every pending approval past its deadline. Returns the number
    /// of approvals escalated by this call; safe to run repeatedly.
    pub async fn handle_timeout(&self, change_id: &ChangeId) -> Result<usize, CoreError> {
        let now = Utc::now();
        let approvals = self.approvals.find_by_change(change_id).await?;

        let mut escalated = 0;
        for mut approval in approvals {
            if approval.expire(now) {
                self.approvals.save(&approval).await?;
                escalated += 1;
            }
        }

        if escalated > 0 {
            self.audit
                .append(AuditEntry::new(
                    change_id.clone(),
                    None,
                    "approval_timeout",
                    json!({"timed_out_count": escalated}),
                ))
                .await?;
            info!("Change {change_id}: escalated {escalated} timed-out approvals");
        }
        Ok(escalated)
    }
}

/// Which roles must sign off, by change type and risk level
fn required_roles_for(change_type: ChangeType, risk_level: RiskLevel) -> Vec<ApproverRole> {
    if risk_level == RiskLevel::High {
        // Full CAB
        return vec![
            ApproverRole::Network,
            ApproverRole::Security,
            ApproverRole::DcManager,
        ];
    }
    match change_type {
        ChangeType::Firewall => vec![ApproverRole::Security],
        ChangeType::Switch | ChangeType::Vlan | ChangeType::Port => vec![ApproverRole::Network],
        ChangeType::Rack => vec![ApproverRole::DcManager],
        ChangeType::CloudSg => vec![ApproverRole::Security, ApproverRole::Network],
        ChangeType::Other => vec![ApproverRole::Network],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::approval::ApprovalStatus;
    use crate::domain::change::{ChangeRecord, Environment};
    use crate::domain::risk::RiskFactor;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct MemChanges {
        records: RwLock<HashMap<String, ChangeRecord>>,
    }

    #[async_trait]
    impl ChangeRepository for MemChanges {
        async fn find_by_id(&self, id: &ChangeId) -> Result<Option<ChangeRecord>, CoreError> {
            Ok(self.records.read().await.get(&id.0).cloned())
        }

        async fn save(&self, change: &ChangeRecord) -> Result<(), CoreError> {
            self.records
                .write()
                .await
                .insert(change.id.0.clone(), change.clone());
            Ok(())
        }

        async fn list(
            &self,
            status: Option<ChangeStatus>,
        ) -> Result<Vec<ChangeRecord>, CoreError> {
            Ok(self
                .records
                .read()
                .await
                .values()
                .filter(|c| status.map_or(true, |s| c.status == s))
                .cloned()
                .collect())
        }

        async fn incident_history_count(
            &self,
            _target_components: &[String],
            _exclude: Option<&ChangeId>,
        ) -> Result<usize, CoreError> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct MemApprovals {
        records: RwLock<Vec<Approval>>,
    }

    #[async_trait]
    impl ApprovalRepository for MemApprovals {
        async fn create(&self, mut approval: Approval) -> Result<Approval, CoreError> {
            let mut records = self.records.write().await;
            approval.id = ApprovalId(records.len() as i64 + 1);
            records.push(approval.clone());
            Ok(approval)
        }

        async fn find_by_id(
            &self,
            change_id: &ChangeId,
            approval_id: ApprovalId,
        ) -> Result<Option<Approval>, CoreError> {
            Ok(self
                .records
                .read()
                .await
                .iter()
                .find(|a| a.change_id == *change_id && a.id == approval_id)
                .cloned())
        }

        async fn find_by_change(&self, change_id: &ChangeId) -> Result<Vec<Approval>, CoreError> {
            Ok(self
                .records
                .read()
                .await
                .iter()
                .filter(|a| a.change_id == *change_id)
                .cloned()
                .collect())
        }

        async fn save(&self, approval: &Approval) -> Result<(), CoreError> {
            let mut records = self.records.write().await;
            if let Some(slot) = records.iter_mut().find(|a| a.id == approval.id) {
                *slot = approval.clone();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemAudit {
        entries: RwLock<Vec<AuditEntry>>,
    }

    #[async_trait]
    impl AuditLogRepository for MemAudit {
        async fn append(&self, entry: AuditEntry) -> Result<(), CoreError> {
            self.entries.write().await.push(entry);
            Ok(())
        }

        async fn find_by_change(
            &self,
            change_id: &ChangeId,
        ) -> Result<Vec<AuditEntry>, CoreError> {
            Ok(self
                .entries
                .read()
                .await
                .iter()
                .filter(|e| e.change_id == *change_id)
                .cloned()
                .collect())
        }
    }

    struct Fixture {
        changes: Arc<MemChanges>,
        approvals: Arc<MemApprovals>,
        audit: Arc<MemAudit>,
        engine: WorkflowEngine,
    }

    fn fixture() -> Fixture {
        let changes = Arc::new(MemChanges::default());
        let approvals = Arc::new(MemApprovals::default());
        let audit = Arc::new(MemAudit::default());
        let engine = WorkflowEngine::new(
            changes.clone(),
            approvals.clone(),
            audit.clone(),
            WorkflowConfig::default(),
        );
        Fixture {
            changes,
            approvals,
            audit,
            engine,
        }
    }

    async fn seed_change(fixture: &Fixture, change_type: ChangeType) -> ChangeId {
        let change = ChangeRecord::new("test change", change_type, Environment::Prod);
        let id = change.id.clone();
        fixture.changes.save(&change).await.unwrap();
        id
    }

    fn risk(level: RiskLevel) -> RiskAssessment {
        let score = match level {
            RiskLevel::Low => 12.0,
            RiskLevel::Medium => 55.0,
            RiskLevel::High => 88.0,
        };
        RiskAssessment {
            risk_score: score,
            risk_level: level,
            auto_approve: level.auto_approve(),
            factors: vec![RiskFactor::new("test", score, "test factor")],
            llm_driven: false,
        }
    }

    #[tokio::test]
    async fn test_low_risk_auto_approves_with_zero_records() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::Switch).await;

        let outcome = fx
            .engine
            .route_change(&change_id, &risk(RiskLevel::Low), Some("user-1"))
            .await
            .unwrap();

        assert_eq!(outcome.next_step, NextStep::AutoApprove);
        assert_eq!(outcome.approvals_created, 0);
        let change = fx.changes.find_by_id(&change_id).await.unwrap().unwrap();
        assert_eq!(change.status, ChangeStatus::Approved);
        let audit = fx.audit.find_by_change(&change_id).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "auto_approved");
    }

    #[tokio::test]
    async fn test_high_risk_routes_to_full_board() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::Firewall).await;

        let outcome = fx
            .engine
            .route_change(&change_id, &risk(RiskLevel::High), None)
            .await
            .unwrap();

        assert_eq!(outcome.next_step, NextStep::CabRequired);
        assert_eq!(outcome.approvals_created, 3);
        assert_eq!(
            outcome.required_roles,
            vec![
                ApproverRole::Network,
                ApproverRole::Security,
                ApproverRole::DcManager
            ]
        );
        let change = fx.changes.find_by_id(&change_id).await.unwrap().unwrap();
        assert_eq!(change.status, ChangeStatus::Pending);
        let records = fx.approvals.find_by_change(&change_id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|a| a.status == ApprovalStatus::Pending));
    }

    #[tokio::test]
    async fn test_medium_risk_role_table() {
        let cases = [
            (ChangeType::Firewall, vec![ApproverRole::Security]),
            (ChangeType::Switch, vec![ApproverRole::Network]),
            (ChangeType::Vlan, vec![ApproverRole::Network]),
            (ChangeType::Port, vec![ApproverRole::Network]),
            (ChangeType::Rack, vec![ApproverRole::DcManager]),
            (
                ChangeType::CloudSg,
                vec![ApproverRole::Security, ApproverRole::Network],
            ),
            (ChangeType::Other, vec![ApproverRole::Network]),
        ];
        for (change_type, expected) in cases {
            let fx = fixture();
            let change_id = seed_change(&fx, change_type).await;
            let outcome = fx
                .engine
                .route_change(&change_id, &risk(RiskLevel::Medium), None)
                .await
                .unwrap();
            assert_eq!(outcome.next_step, NextStep::TargetedApproval);
            assert_eq!(outcome.required_roles, expected, "type {change_type}");
        }
    }

    #[tokio::test]
    async fn test_check_approvals_mixed_decisions() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::CloudSg).await;
        fx.engine
            .route_change(&change_id, &risk(RiskLevel::Medium), None)
            .await
            .unwrap();

        fx.engine
            .record_decision(
                &change_id,
                ApprovalId(1),
                ApprovalDecision::Approved,
                Some("sec-lead"),
                None,
            )
            .await
            .unwrap();
        fx.engine
            .record_decision(
                &change_id,
                ApprovalId(2),
                ApprovalDecision::Rejected,
                Some("net-lead"),
                Some("not in window".to_string()),
            )
            .await
            .unwrap();

        let summary = fx.engine.check_approvals(&change_id).await.unwrap();
        assert!(!summary.all_approved);
        assert!(summary.any_rejected);
        assert_eq!(summary.approved, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.total, 2);

        // A single rejection is terminal for the change
        let change = fx.changes.find_by_id(&change_id).await.unwrap().unwrap();
        assert_eq!(change.status, ChangeStatus::Rejected);
        assert_eq!(change.reject_reason.as_deref(), Some("Rejected by approver"));
    }

    #[tokio::test]
    async fn test_all_approvals_transition_change_to_approved() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::CloudSg).await;
        fx.engine
            .route_change(&change_id, &risk(RiskLevel::Medium), None)
            .await
            .unwrap();

        fx.engine
            .record_decision(&change_id, ApprovalId(1), ApprovalDecision::Approved, None, None)
            .await
            .unwrap();
        // Still pending on the second role
        let change = fx.changes.find_by_id(&change_id).await.unwrap().unwrap();
        assert_eq!(change.status, ChangeStatus::Pending);

        fx.engine
            .record_decision(&change_id, ApprovalId(2), ApprovalDecision::Approved, None, None)
            .await
            .unwrap();
        let change = fx.changes.find_by_id(&change_id).await.unwrap().unwrap();
        assert_eq!(change.status, ChangeStatus::Approved);

        let actions: Vec<String> = fx
            .audit
            .find_by_change(&change_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert!(actions.contains(&"change_approved".to_string()));
    }

    #[tokio::test]
    async fn test_handle_timeout_is_idempotent() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::Firewall).await;
        fx.engine
            .route_change(&change_id, &risk(RiskLevel::High), None)
            .await
            .unwrap();

        // Force every record past its deadline
        {
            let mut records = fx.approvals.records.write().await;
            for approval in records.iter_mut() {
                approval.timeout_at = Utc::now() - Duration::hours(1);
            }
        }

        let first = fx.engine.handle_timeout(&change_id).await.unwrap();
        assert_eq!(first, 3);
        let second = fx.engine.handle_timeout(&change_id).await.unwrap();
        assert_eq!(second, 0);

        let records = fx.approvals.find_by_change(&change_id).await.unwrap();
        assert!(records
            .iter()
            .all(|a| a.status == ApprovalStatus::Rejected
                && a.comment.as_deref()
                    == Some(crate::domain::approval::TIMEOUT_COMMENT)));

        // Exactly one audit entry for the sweep that escalated
        let sweeps = fx
            .audit
            .find_by_change(&change_id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.action == "approval_timeout")
            .count();
        assert_eq!(sweeps, 1);
    }

    #[tokio::test]
    async fn test_decision_on_decided_approval_fails() {
        let fx = fixture();
        let change_id = seed_change(&fx, ChangeType::Switch).await;
        fx.engine
            .route_change(&change_id, &risk(RiskLevel::Medium), None)
            .await
            .unwrap();

        fx.engine
            .record_decision(&change_id, ApprovalId(1), ApprovalDecision::Approved, None, None)
            .await
            .unwrap();
        let err = fx
            .engine
            .record_decision(&change_id, ApprovalId(1), ApprovalDecision::Rejected, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::WorkflowError(_)));
    }
}
