//!
//! Deplyx Core - Change risk assessment core for the Deplyx Platform
//!
//! This crate implements the three-stage decision pipeline for proposed
//! infrastructure changes: action-aware impact analysis over the dependency
//! graph, risk scoring, and approval workflow routing. Graph storage, the AI
//! collaborator, and the persistence layer are consumed through traits and
//! provided by other crates.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - core business models, entities, and rules
pub mod domain;

/// Application services - core application logic
pub mod application;

/// Configuration
pub mod config;

/// Error types
pub mod error;

// Re-export key types
pub use config::{AnalysisConfig, WorkflowConfig};
pub use error::CoreError;

// Re-export main API types for easy use
pub use application::assessment::{ChangeAssessment, ChangeAssessmentService};
pub use application::impact_analysis::{ImpactAnalysisService, ImpactRequest};
pub use application::risk_engine::{ChangeRiskInput, RiskEngine};
pub use application::workflow::{NextStep, RoutingOutcome, WorkflowEngine};
pub use domain::approval::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, ApprovalSummary, ApproverRole,
};
pub use domain::change::{ChangeId, ChangeRecord, ChangeStatus, ChangeType, Environment};
pub use domain::impact::ImpactResult;
pub use domain::repository::{
    ApprovalRepository, AuditEntry, AuditLogRepository, ChangeRepository,
};
pub use domain::risk::{RiskAssessment, RiskFactor, RiskLevel};
