//! In-memory dependency graph client
//!
//! A fixture topology implementing the [`GraphClient`] contract for
//! development and tests. It reproduces the behavioral contract of the
//! production graph store: which relationship types each traversal strategy
//! follows and how deep, not the query language.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tracing::debug;

use deplyx_interfaces::{
    ChangeAction, GraphClient, GraphEdge, GraphNode, GraphResult, NodeLabel, PathEdge, RawPath,
    TopologySnapshot, TraversalStrategy,
};

/// Upper bound on enumerated dependency paths per target
const MAX_PATHS: usize = 30;

/// In-memory implementation of the dependency graph client.
///
/// Build the topology with [`add_node`]/[`add_edge`] before sharing it;
/// queries treat edges as bidirectional, like the production traversals.
///
/// [`add_node`]: InMemoryGraphClient::add_node
/// [`add_edge`]: InMemoryGraphClient::add_edge
#[derive(Default)]
pub struct InMemoryGraphClient {
    nodes: HashMap<String, GraphNode>,
    edges: Vec<GraphEdge>,
}

impl InMemoryGraphClient {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, replacing any previous node with the same id
    pub fn add_node(&mut self, node: GraphNode) -> &mut Self {
        self.nodes.insert(node.id.clone(), node);
        self
    }

    /// Insert a node built from parts
    pub fn add_node_with(
        &mut self,
        id: &str,
        label: NodeLabel,
        properties: serde_json::Value,
    ) -> &mut Self {
        let mut node = GraphNode::new(id, label);
        if let serde_json::Value::Object(map) = properties {
            node.properties = map;
        }
        self.add_node(node)
    }

    /// Insert an edge
    pub fn add_edge(&mut self, source: &str, rel_type: &str, target: &str) -> &mut Self {
        self.edges.push(GraphEdge::new(source, rel_type, target));
        self
    }

    /// Relationship filter and depth for a strategy.
    ///
    /// `None` means every relationship type is followed.
    fn traversal_plan(
        action: Option<ChangeAction>,
        depth: u32,
    ) -> (Option<&'static [&'static str]>, u32) {
        let strategy = TraversalStrategy::for_action(action);
        let rels: Option<&'static [&'static str]> = match strategy {
            TraversalStrategy::RuleDependencyTrace => {
                Some(&["PROTECTS", "HAS_RULE", "CONNECTED_TO"])
            }
            TraversalStrategy::PortDependencyTrace => {
                Some(&["PART_OF", "CONNECTED_TO", "HAS_INTERFACE"])
            }
            TraversalStrategy::VlanMembershipScan => {
                Some(&["PART_OF", "HAS_INTERFACE", "ROUTES_TO"])
            }
            TraversalStrategy::FullDeviceBlastRadius => {
                Some(&["CONNECTED_TO", "HAS_INTERFACE", "HAS_RULE", "HOSTS", "PROTECTS"])
            }
            TraversalStrategy::ConfigNeighborCrawl | TraversalStrategy::GenericNeighborCrawl => {
                None
            }
        };
        let effective = match strategy {
            TraversalStrategy::RuleDependencyTrace
            | TraversalStrategy::PortDependencyTrace
            | TraversalStrategy::VlanMembershipScan => depth.min(2),
            TraversalStrategy::FullDeviceBlastRadius => depth.min(3),
            _ => strategy.effective_depth(depth),
        };
        (rels, effective)
    }

    /// Edges incident to a node, optionally filtered by relationship type.
    /// Each entry pairs the edge with the id on the far side.
    fn incident<'a>(
        &'a self,
        node_id: &'a str,
        allowed: Option<&'static [&'static str]>,
    ) -> impl Iterator<Item = (&'a GraphEdge, &'a str)> + 'a {
        self.edges
            .iter()
            .filter(move |edge| {
                allowed.map_or(true, |rels| rels.contains(&edge.rel_type.as_str()))
            })
            .filter_map(move |edge| {
                if edge.source == node_id {
                    Some((edge, edge.target.as_str()))
                } else if edge.target == node_id {
                    Some((edge, edge.source.as_str()))
                } else {
                    None
                }
            })
    }

    /// Undirected BFS from a start node, excluding the start itself
    fn bfs_neighbors(
        &self,
        start: &str,
        allowed: Option<&'static [&'static str]>,
        depth: u32,
    ) -> Vec<GraphNode> {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        let mut result = Vec::new();
        let mut frontier = VecDeque::new();
        frontier.push_back((start.to_string(), 0u32));

        while let Some((current, hops)) = frontier.pop_front() {
            if hops >= depth {
                continue;
            }
            for (_edge, neighbor_id) in self.incident(&current, allowed) {
                if visited.contains(neighbor_id) {
                    continue;
                }
                visited.insert(neighbor_id.to_string());
                if let Some(node) = self.nodes.get(neighbor_id) {
                    result.push(node.clone());
                }
                frontier.push_back((neighbor_id.to_string(), hops + 1));
            }
        }
        result
    }

    /// Enumerate simple paths from a start node, every prefix included,
    /// bounded by [`MAX_PATHS`]
    fn enumerate_paths(
        &self,
        start: &str,
        allowed: Option<&'static [&'static str]>,
        depth: u32,
    ) -> Vec<RawPath> {
        let Some(start_node) = self.nodes.get(start) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        let mut nodes = vec![start_node.clone()];
        let mut edges: Vec<PathEdge> = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        self.extend_paths(start, allowed, depth, &mut nodes, &mut edges, &mut visited, &mut out);
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn extend_paths(
        &self,
        current: &str,
        allowed: Option<&'static [&'static str]>,
        remaining: u32,
        nodes: &mut Vec<GraphNode>,
        edges: &mut Vec<PathEdge>,
        visited: &mut HashSet<String>,
        out: &mut Vec<RawPath>,
    ) {
        if remaining == 0 || out.len() >= MAX_PATHS {
            return;
        }
        let hops: Vec<(PathEdge, String)> = self
            .incident(current, allowed)
            .map(|(edge, neighbor_id)| {
                (
                    PathEdge {
                        rel_type: edge.rel_type.clone(),
                        source: edge.source.clone(),
                        target: edge.target.clone(),
                    },
                    neighbor_id.to_string(),
                )
            })
            .collect();
        for (path_edge, neighbor_id) in hops {
            if visited.contains(&neighbor_id) {
                continue;
            }
            let Some(neighbor) = self.nodes.get(&neighbor_id) else {
                continue;
            };
            visited.insert(neighbor_id.clone());
            nodes.push(neighbor.clone());
            edges.push(path_edge);
            out.push(RawPath {
                nodes: nodes.clone(),
                edges: edges.clone(),
            });
            if out.len() < MAX_PATHS {
                self.extend_paths(&neighbor_id, allowed, remaining - 1, nodes, edges, visited, out);
            }
            nodes.pop();
            edges.pop();
            visited.remove(&neighbor_id);
        }
    }
}

#[async_trait]
impl GraphClient for InMemoryGraphClient {
    async fn get_node(&self, label: NodeLabel, id: &str) -> GraphResult<Option<GraphNode>> {
        Ok(self
            .nodes
            .get(id)
            .filter(|node| node.label == label)
            .cloned())
    }

    async fn get_action_aware_neighbors(
        &self,
        id: &str,
        action: Option<ChangeAction>,
        depth: u32,
    ) -> GraphResult<Vec<GraphNode>> {
        let (allowed, effective) = Self::traversal_plan(action, depth);
        debug!("Neighbor crawl from {id}: action={action:?}, depth={effective}");
        Ok(self.bfs_neighbors(id, allowed, effective))
    }

    async fn get_critical_paths(
        &self,
        id: &str,
        action: Option<ChangeAction>,
        depth: u32,
    ) -> GraphResult<Vec<RawPath>> {
        let (allowed, effective) = Self::traversal_plan(action, depth);
        Ok(self.enumerate_paths(id, allowed, effective))
    }

    async fn get_subgraph(&self, ids: &[String], depth: u32) -> GraphResult<TopologySnapshot> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut nodes = Vec::new();
        for id in ids {
            if let Some(node) = self.nodes.get(id) {
                if visited.insert(id.clone()) {
                    nodes.push(node.clone());
                }
            }
            for neighbor in self.bfs_neighbors(id, None, depth) {
                if visited.insert(neighbor.id.clone()) {
                    nodes.push(neighbor);
                }
            }
        }
        let edges = self
            .edges
            .iter()
            .filter(|e| visited.contains(&e.source) && visited.contains(&e.target))
            .cloned()
            .collect();
        Ok(TopologySnapshot { nodes, edges })
    }
}
