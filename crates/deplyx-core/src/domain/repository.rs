//! Repository traits for the change risk core
//!
//! This module defines the persistence contracts the core issues side effects
//! through. External crates implement these traits to provide the actual
//! transactional record store; the core never defines a storage format.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::approval::{Approval, ApprovalId};
use super::change::{ChangeId, ChangeRecord, ChangeStatus};
use crate::CoreError;

/// Append-only audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique entry id
    pub id: String,

    /// The change this entry belongs to
    pub change_id: ChangeId,

    /// Acting user, when a person triggered the event
    pub user_id: Option<String>,

    /// Symbolic action name (auto_approved, routed_for_approval, ...)
    pub action: String,

    /// Structured event details
    pub details: serde_json::Value,

    /// When the event happened
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry stamped with a fresh id and the current time
    pub fn new(
        change_id: ChangeId,
        user_id: Option<String>,
        action: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            change_id,
            user_id,
            action: action.into(),
            details,
            timestamp: Utc::now(),
        }
    }
}

/// Repository for change records
#[async_trait]
pub trait ChangeRepository: Send + Sync {
    /// Find a change by ID
    async fn find_by_id(&self, id: &ChangeId) -> Result<Option<ChangeRecord>, CoreError>;

    /// Save a change (insert or replace)
    async fn save(&self, change: &ChangeRecord) -> Result<(), CoreError>;

    /// List changes, optionally filtered by status
    async fn list(&self, status: Option<ChangeStatus>) -> Result<Vec<ChangeRecord>, CoreError>;

    /// Count distinct rolled-back changes that touched any of the given
    /// target components, excluding the given change
    async fn incident_history_count(
        &self,
        target_components: &[String],
        exclude: Option<&ChangeId>,
    ) -> Result<usize, CoreError>;
}

/// Repository for approval records
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Insert an approval, assigning its record id
    async fn create(&self, approval: Approval) -> Result<Approval, CoreError>;

    /// Find one approval of a change
    async fn find_by_id(
        &self,
        change_id: &ChangeId,
        approval_id: ApprovalId,
    ) -> Result<Option<Approval>, CoreError>;

    /// All approvals of a change
    async fn find_by_change(&self, change_id: &ChangeId) -> Result<Vec<Approval>, CoreError>;

    /// Save an existing approval
    async fn save(&self, approval: &Approval) -> Result<(), CoreError>;
}

/// Append-only repository for audit entries
#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    /// Append an entry
    async fn append(&self, entry: AuditEntry) -> Result<(), CoreError>;

    /// All entries of a change, oldest first
    async fn find_by_change(&self, change_id: &ChangeId) -> Result<Vec<AuditEntry>, CoreError>;
}
