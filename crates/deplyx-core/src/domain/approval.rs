use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::change::ChangeId;
use crate::CoreError;

/// Comment written onto approvals escalated by the timeout sweep
pub const TIMEOUT_COMMENT: &str = "Auto-rejected: approval timeout exceeded";

/// Value object: Approval record ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub i64);

impl fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lead role that must sign off on a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApproverRole {
    /// Network lead
    Network,
    /// Security lead
    Security,
    /// Datacenter manager
    #[serde(rename = "DC Manager")]
    DcManager,
}

impl ApproverRole {
    /// Canonical role string
    pub fn as_str(self) -> &'static str {
        match self {
            ApproverRole::Network => "Network",
            ApproverRole::Security => "Security",
            ApproverRole::DcManager => "DC Manager",
        }
    }
}

impl fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Approval record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    /// Waiting for a decision
    Pending,
    /// Signed off
    Approved,
    /// Declined, or escalated by timeout
    Rejected,
}

/// A decision submitted by an approver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalDecision {
    /// Sign off on the change
    Approved,
    /// Decline the change
    Rejected,
}

impl ApprovalDecision {
    /// Lowercase name used in audit actions
    pub fn as_str_lower(self) -> &'static str {
        match self {
            ApprovalDecision::Approved => "approved",
            ApprovalDecision::Rejected => "rejected",
        }
    }
}

/// Aggregate: one required sign-off on a change.
///
/// The status only ever moves forward from `Pending`, through exactly two
/// events: a decision from an approver, or the timeout sweep. That is what
/// makes a concurrent sweep safe against in-progress decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    /// Record id, assigned by the store
    pub id: ApprovalId,

    /// The change this approval gates
    pub change_id: ChangeId,

    /// Role that must provide this sign-off
    pub role_required: ApproverRole,

    /// Current status
    pub status: ApprovalStatus,

    /// Id of the user who decided, when decided by a person
    pub approver_id: Option<String>,

    /// Approver comment, or the timeout escalation note
    pub comment: Option<String>,

    /// When the decision (or escalation) happened
    pub decided_at: Option<DateTime<Utc>>,

    /// Absolute instant after which the timeout sweep escalates this record
    pub timeout_at: DateTime<Utc>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Approval {
    /// Create a pending approval. The store assigns the real id on insert.
    pub fn pending(change_id: ChangeId, role: ApproverRole, timeout_at: DateTime<Utc>) -> Self {
        Self {
            id: ApprovalId(0),
            change_id,
            role_required: role,
            status: ApprovalStatus::Pending,
            approver_id: None,
            comment: None,
            decided_at: None,
            timeout_at,
            created_at: Utc::now(),
        }
    }

    /// Event: a decision arrived from an approver.
    ///
    /// Fails unless the record is still pending.
    pub fn decide(
        &mut self,
        decision: ApprovalDecision,
        approver_id: Option<&str>,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.status != ApprovalStatus::Pending {
            return Err(CoreError::WorkflowError(format!(
                "Approval {} already decided",
                self.id
            )));
        }
        self.status = match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        };
        self.approver_id = approver_id.map(str::to_string);
        self.comment = comment;
        self.decided_at = Some(now);
        Ok(())
    }

    /// Event: the timeout sweep observed this record past its deadline.
    ///
    /// Idempotent; returns whether the record transitioned on this call.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ApprovalStatus::Pending || self.timeout_at > now {
            return false;
        }
        self.status = ApprovalStatus::Rejected;
        self.comment = Some(TIMEOUT_COMMENT.to_string());
        self.decided_at = Some(now);
        true
    }
}

/// Aggregated view over all approval records of one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSummary {
    /// Nothing blocks the change: no records at all, or every record
    /// approved with none pending or rejected
    pub all_approved: bool,

    /// At least one record rejected; terminal for the change
    pub any_rejected: bool,

    /// Count of pending records
    pub pending: usize,

    /// Count of approved records
    pub approved: usize,

    /// Count of rejected records
    pub rejected: usize,

    /// Total record count
    pub total: usize,
}

impl ApprovalSummary {
    /// Summarize a set of approval records
    pub fn from_records(approvals: &[Approval]) -> Self {
        if approvals.is_empty() {
            return Self {
                all_approved: true,
                any_rejected: false,
                pending: 0,
                approved: 0,
                rejected: 0,
                total: 0,
            };
        }
        let pending = approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Pending)
            .count();
        let approved = approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Approved)
            .count();
        let rejected = approvals
            .iter()
            .filter(|a| a.status == ApprovalStatus::Rejected)
            .count();
        Self {
            all_approved: pending == 0 && rejected == 0 && approved > 0,
            any_rejected: rejected > 0,
            pending,
            approved,
            rejected,
            total: approvals.len(),
        }
    }
}
