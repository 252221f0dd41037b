//! Dependency graph collaborator interfaces
//!
//! The change risk core never owns graph storage; it consumes a graph store
//! through the [`GraphClient`] contract defined here. Node and edge values
//! are immutable snapshots fetched per query.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{ChangeAction, Criticality, NodeLabel};

/// Result type for graph store operations
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur when querying the dependency graph
#[derive(Error, Debug, Clone)]
pub enum GraphError {
    /// Error establishing or maintaining the graph connection
    #[error("Graph connection error: {0}")]
    ConnectionError(String),

    /// Error executing a query
    #[error("Graph query error: {0}")]
    QueryError(String),

    /// Error decoding a query result
    #[error("Graph serialization error: {0}")]
    SerializationError(String),
}

/// A node in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Globally unique node identifier
    pub id: String,

    /// Category label of the node
    pub label: NodeLabel,

    /// Open property bag (criticality, vendor, hostname, ...)
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl GraphNode {
    /// Create a node with an empty property bag
    pub fn new(id: impl Into<String>, label: NodeLabel) -> Self {
        Self {
            id: id.into(),
            label,
            properties: serde_json::Map::new(),
        }
    }

    /// Criticality of this node, defaulting to low when absent or malformed
    pub fn criticality(&self) -> Criticality {
        Criticality::from_property(self.properties.get("criticality"))
    }

    /// String property lookup
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }
}

/// A directed edge in the dependency graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id
    pub source: String,

    /// Target node id
    pub target: String,

    /// Symbolic relation name (PROTECTS, CONNECTED_TO, ...)
    pub rel_type: String,

    /// Open property bag
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
}

impl GraphEdge {
    /// Create an edge with an empty property bag
    pub fn new(
        source: impl Into<String>,
        rel_type: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: rel_type.into(),
            properties: serde_json::Map::new(),
        }
    }
}

/// A node reference inside a dependency path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathNode {
    /// Node id
    pub id: String,

    /// Node label string (tolerant of labels outside the known set)
    #[serde(default)]
    pub label: String,
}

/// An edge traversed by a dependency path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathEdge {
    /// Symbolic relation name
    #[serde(rename = "type")]
    pub rel_type: String,

    /// Source node id
    pub source: String,

    /// Target node id
    pub target: String,
}

/// A raw dependency path returned by the graph store.
///
/// The node sequence starts at the queried target; the edge sequence has one
/// entry per hop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPath {
    /// Nodes along the path, starting at the queried target
    pub nodes: Vec<GraphNode>,

    /// Edges along the path, one per hop
    pub edges: Vec<PathEdge>,
}

/// A ranked, deduplicated route from a change target to an impacted endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPath {
    /// The change target the path starts at
    pub source_id: String,

    /// The impacted endpoint the path reaches
    pub endpoint_id: String,

    /// Label of the endpoint node
    #[serde(default)]
    pub endpoint_label: String,

    /// Criticality of the endpoint
    #[serde(default)]
    pub criticality: Criticality,

    /// Number of hops from source to endpoint
    pub hops: usize,

    /// Nodes along the path
    #[serde(default)]
    pub nodes: Vec<PathNode>,

    /// Edges along the path
    #[serde(default)]
    pub edges: Vec<PathEdge>,

    /// One-line description of the dependency chain (AI-provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_description: Option<String>,

    /// Why this path matters for the specific action (AI-provided)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A pruned topology neighborhood, used as AI analysis context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    /// Nodes in the neighborhood
    pub nodes: Vec<GraphNode>,

    /// Edges between those nodes
    pub edges: Vec<GraphEdge>,
}

/// Contract for the dependency graph store.
///
/// Implementations are expected to honor [`TraversalStrategy::effective_depth`]
/// for the strategy implied by the supplied action.
///
/// [`TraversalStrategy::effective_depth`]: crate::model::TraversalStrategy::effective_depth
#[async_trait]
pub trait GraphClient: Send + Sync {
    /// Contract: Fetches a single node by label and id.
    /// - Returns: `Ok(None)` when no node with that label and id exists.
    async fn get_node(&self, label: NodeLabel, id: &str) -> GraphResult<Option<GraphNode>>;

    /// Contract: Returns the distinct neighbor set reachable from `id` under
    /// the traversal appropriate for `action`, excluding `id` itself.
    /// - `depth`: requested hop budget; the strategy may cap it.
    async fn get_action_aware_neighbors(
        &self,
        id: &str,
        action: Option<ChangeAction>,
        depth: u32,
    ) -> GraphResult<Vec<GraphNode>>;

    /// Contract: Returns raw dependency paths rooted at `id` under the
    /// traversal appropriate for `action`. Paths may revisit endpoints; the
    /// caller deduplicates and ranks them.
    async fn get_critical_paths(
        &self,
        id: &str,
        action: Option<ChangeAction>,
        depth: u32,
    ) -> GraphResult<Vec<RawPath>>;

    /// Contract: Returns the merged subgraph reachable within `depth` hops of
    /// any of the supplied ids. Used to build AI analysis context.
    async fn get_subgraph(&self, ids: &[String], depth: u32) -> GraphResult<TopologySnapshot>;
}
