//! In-memory repository implementations

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use deplyx_core::{
    Approval, ApprovalId, ApprovalRepository, AuditEntry, AuditLogRepository, ChangeId,
    ChangeRecord, ChangeRepository, ChangeStatus, CoreError,
};

/// In-memory implementation of the change repository
pub struct InMemoryChangeRepository {
    records: RwLock<HashMap<String, ChangeRecord>>,
}

impl InMemoryChangeRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryChangeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChangeRepository for InMemoryChangeRepository {
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

    async fn list(&self, status: Option<ChangeStatus>) -> Result<Vec<ChangeRecord>, CoreError> {
        let records = self.records.read().await;
        let mut result: Vec<ChangeRecord> = records
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn incident_history_count(
        &self,
        target_components: &[String],
        exclude: Option<&ChangeId>,
    ) -> Result<usize, CoreError> {
        if target_components.is_empty() {
            return Ok(0);
        }
        let targets: HashSet<&String> = target_components.iter().collect();
        let records = self.records.read().await;
        let count = records
            .values()
            .filter(|c| c.status == ChangeStatus::RolledBack)
            .filter(|c| exclude.map_or(true, |id| c.id != *id))
            .filter(|c| c.target_components.iter().any(|t| targets.contains(t)))
            .count();
        Ok(count)
    }
}

/// In-memory implementation of the approval repository
pub struct InMemoryApprovalRepository {
    records: RwLock<Vec<Approval>>,
    next_id: AtomicI64,
}

impl InMemoryApprovalRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryApprovalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn create(&self, mut approval: Approval) -> Result<Approval, CoreError> {
        approval.id = ApprovalId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.write().await.push(approval.clone());
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
        match records.iter_mut().find(|a| a.id == approval.id) {
            Some(slot) => {
                *slot = approval.clone();
                Ok(())
            }
            None => Err(CoreError::StateStoreError(format!(
                "Approval {} does not exist",
                approval.id
            ))),
        }
    }
}

/// In-memory implementation of the audit log repository
pub struct InMemoryAuditLogRepository {
    entries: RwLock<Vec<AuditEntry>>,
}

impl InMemoryAuditLogRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAuditLogRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryAuditLogRepository {
    async fn append(&self, entry: AuditEntry) -> Result<(), CoreError> {
        self.entries.write().await.push(entry);
        Ok(())
    }

    async fn find_by_change(&self, change_id: &ChangeId) -> Result<Vec<AuditEntry>, CoreError> {
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
