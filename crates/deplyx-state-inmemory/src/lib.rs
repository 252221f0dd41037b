//! In-memory state implementations for the Deplyx Platform
//!
//! This crate provides in-memory implementations of the persistence
//! repositories defined in deplyx-core and of the dependency graph client
//! defined in deplyx-interfaces. It is primarily useful for development,
//! testing, and simple deployments where persistence is not required.

use std::sync::Arc;

pub mod repositories;
pub use repositories::{
    InMemoryApprovalRepository, InMemoryAuditLogRepository, InMemoryChangeRepository,
};

pub mod graph;
pub use graph::InMemoryGraphClient;

use deplyx_core::{ApprovalRepository, AuditLogRepository, ChangeRepository};

/// Provider bundling the in-memory repositories
pub struct InMemoryStateStoreProvider {
    changes: Arc<InMemoryChangeRepository>,
    approvals: Arc<InMemoryApprovalRepository>,
    audit: Arc<InMemoryAuditLogRepository>,
}

impl InMemoryStateStoreProvider {
    /// Create a new in-memory state store provider
    pub fn new() -> Self {
        Self {
            changes: Arc::new(InMemoryChangeRepository::new()),
            approvals: Arc::new(InMemoryApprovalRepository::new()),
            audit: Arc::new(InMemoryAuditLogRepository::new()),
        }
    }

    /// The change repository
    pub fn change_repository(&self) -> Arc<dyn ChangeRepository> {
        self.changes.clone()
    }

    /// The approval repository
    pub fn approval_repository(&self) -> Arc<dyn ApprovalRepository> {
        self.approvals.clone()
    }

    /// The audit log repository
    pub fn audit_repository(&self) -> Arc<dyn AuditLogRepository> {
        self.audit.clone()
    }
}

impl Default for InMemoryStateStoreProvider {
    fn default() -> Self {
        Self::new()
    }
}
