//! Application services for the change risk core

/// Action-aware impact analysis with optional AI augmentation
pub mod impact_analysis;

/// Risk scoring
pub mod risk_engine;

/// Approval workflow routing
pub mod workflow;

/// Combined impact + risk assessment pipeline
pub mod assessment;
