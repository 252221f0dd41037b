//! Domain layer for the change risk core

/// Change aggregate and its lifecycle
pub mod change;

/// Approval records and their state machine
pub mod approval;

/// Impact analysis results
pub mod impact;

/// Risk assessment results
pub mod risk;

/// Repository traits for the persistence collaborator
pub mod repository;
