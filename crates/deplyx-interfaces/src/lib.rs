//! Deplyx Interfaces
//!
//! This crate provides the interface types shared between the Deplyx change
//! risk core and its external collaborators: the dependency graph store and
//! the AI impact-analysis service.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Shared vocabulary: criticality, node labels, change actions, strategies
pub mod model;

/// Dependency graph collaborator interfaces
pub mod graph;

/// AI impact-analysis collaborator interfaces
pub mod ai;

/// Re-export key types for convenient usage
pub use model::{ChangeAction, Criticality, NodeLabel, TraversalStrategy};

pub use graph::{
    CriticalPath, GraphClient, GraphEdge, GraphError, GraphNode, GraphResult, PathEdge, PathNode,
    RawPath, TopologySnapshot,
};

pub use ai::{
    ActionAnalysis, AiAnalysisClient, AiImpactAnalysis, AiRiskAssessment, BlastRadius,
    ChangeContext,
};
