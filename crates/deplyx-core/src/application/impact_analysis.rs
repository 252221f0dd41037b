//! Action-aware impact analysis
//!
//! Always runs a rule-based traversal of the dependency graph, then
//! optionally layers an AI assessment on top when the collaborator is
//! available. Concurrent analyses of the same logical request share a single
//! AI call through an in-flight registry scoped to this service.

use std::collections::HashMap;
use std::sync::{Mutex as StdMutex, PoisonError};
use std::sync::Arc;

use deplyx_interfaces::{
    AiAnalysisClient, AiImpactAnalysis, ChangeAction, ChangeContext, CriticalPath, GraphClient,
    GraphNode, NodeLabel, PathNode, TraversalStrategy,
};
use futures::future;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::domain::impact::{max_criticality, ImpactResult};
use crate::CoreError;

/// One impact analysis request
#[derive(Debug, Clone)]
pub struct ImpactRequest {
    /// Explicit target node ids
    pub target_ids: Vec<String>,

    /// Proposed action, when inside the known catalogue
    pub action: Option<ChangeAction>,

    /// Requested traversal depth; the configured default when absent
    pub depth: Option<u32>,

    /// Change type string, included in the AI context and dedup key
    pub change_type: Option<String>,

    /// Environment string, included in the AI context and dedup key
    pub environment: Option<String>,

    /// Change title, included in the AI context
    pub title: String,
}

impl ImpactRequest {
    /// Request with only targets and an action; the usual entry point
    pub fn new(target_ids: Vec<String>, action: Option<ChangeAction>) -> Self {
        Self {
            target_ids,
            action,
            depth: None,
            change_type: None,
            environment: None,
            title: String::new(),
        }
    }

    /// Key identifying the inputs that determine the AI result.
    ///
    /// Target order does not matter, so the ids are sorted before joining.
    fn dedup_key(&self) -> String {
        let mut ids = self.target_ids.clone();
        ids.sort();
        format!(
            "{}|{}|{}|{}",
            ids.join(","),
            self.action.map(|a| a.as_str()).unwrap_or("none"),
            self.change_type.as_deref().unwrap_or("none"),
            self.environment.as_deref().unwrap_or("none"),
        )
    }
}

/// State of an in-flight AI call, broadcast to deduplicated waiters
#[derive(Debug, Clone)]
enum InflightState {
    Pending,
    Done(Option<AiImpactAnalysis>),
}

type InflightMap = StdMutex<HashMap<String, watch::Receiver<InflightState>>>;

/// Removes an in-flight slot when the owning call completes or is cancelled,
/// so a failed or abandoned call never wedges the key for later callers.
struct InflightGuard<'a> {
    inflight: &'a InflightMap,
    key: &'a str,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        let mut map = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        map.remove(self.key);
    }
}

enum InflightRole {
    Owner(watch::Sender<InflightState>),
    Waiter(watch::Receiver<InflightState>),
}

/// Service orchestrating graph-based impact analysis with optional AI
/// augmentation
pub struct ImpactAnalysisService {
    graph: Arc<dyn GraphClient>,
    ai: Option<Arc<dyn AiAnalysisClient>>,
    config: AnalysisConfig,
    inflight: InflightMap,
}

impl ImpactAnalysisService {
    /// Create a service without AI augmentation
    pub fn new(graph: Arc<dyn GraphClient>, config: AnalysisConfig) -> Self {
        Self {
            graph,
            ai: None,
            config,
            inflight: StdMutex::new(HashMap::new()),
        }
    }

    /// Attach an AI collaborator
    pub fn with_ai(mut self, ai: Arc<dyn AiAnalysisClient>) -> Self {
        self.ai = Some(ai);
        self
    }

    /// Run an impact analysis.
    ///
    /// The graph pass always runs and its dependency counts always survive;
    /// the AI pass only replaces the explanatory fields. Graph store errors
    /// in the rule-based pass propagate, while everything inside the AI path
    /// degrades to a graph-only result.
    pub async fn analyze_impact(&self, request: ImpactRequest) -> Result<ImpactResult, CoreError> {
        let depth = request.depth.unwrap_or(self.config.default_depth);
        let mut result = self
            .graph_based_analysis(&request.target_ids, request.action, depth)
            .await?;
        info!(
            "Graph analysis done: {} direct + {} indirect nodes, strategy={}",
            result.directly_impacted.len(),
            result.indirectly_impacted.len(),
            result.traversal_strategy,
        );

        if let Some(ai_result) = self.ai_augmentation(&request).await {
            if let Some(paths) = ai_result.critical_paths {
                result.critical_paths = paths;
            }
            result.risk_assessment = ai_result.risk_assessment;
            result.blast_radius = ai_result.blast_radius;
            result.action_analysis = ai_result.action_analysis;
            result.llm_powered = true;
        }
        Ok(result)
    }

    /// Rule-based traversal over every target
    async fn graph_based_analysis(
        &self,
        target_ids: &[String],
        action: Option<ChangeAction>,
        depth: u32,
    ) -> Result<ImpactResult, CoreError> {
        let strategy = TraversalStrategy::for_action(action);

        // Independent targets have no ordering dependency; query them
        // concurrently and fold in request order.
        let fetches = target_ids
            .iter()
            .map(|id| self.analyze_target(id, action, depth));
        let per_target = future::try_join_all(fetches).await?;

        let mut directly_impacted: Vec<GraphNode> = Vec::new();
        let mut indirectly_impacted: Vec<GraphNode> = Vec::new();
        let mut affected_applications: Vec<GraphNode> = Vec::new();
        let mut affected_services: Vec<GraphNode> = Vec::new();
        let mut affected_vlans: Vec<GraphNode> = Vec::new();
        let mut seen_ids: std::collections::HashSet<String> =
            target_ids.iter().cloned().collect();

        for (direct, neighbors) in per_target {
            if let Some(node) = direct {
                directly_impacted.push(node);
            }
            for neighbor in neighbors {
                if neighbor.id.is_empty() || seen_ids.contains(&neighbor.id) {
                    continue;
                }
                seen_ids.insert(neighbor.id.clone());
                match neighbor.label {
                    NodeLabel::Application => affected_applications.push(neighbor.clone()),
                    NodeLabel::Service => affected_services.push(neighbor.clone()),
                    NodeLabel::Vlan => affected_vlans.push(neighbor.clone()),
                    _ => {}
                }
                indirectly_impacted.push(neighbor);
            }
        }

        let critical_paths = self.build_critical_paths(target_ids, action, depth).await?;
        let max_criticality = max_criticality(
            directly_impacted.iter().chain(indirectly_impacted.iter()),
        );
        let total_dependency_count = directly_impacted.len() + indirectly_impacted.len();

        Ok(ImpactResult {
            directly_impacted,
            indirectly_impacted,
            affected_applications,
            affected_services,
            affected_vlans,
            total_dependency_count,
            max_criticality,
            traversal_strategy: strategy,
            critical_paths,
            risk_assessment: None,
            blast_radius: None,
            action_analysis: None,
            llm_powered: false,
        })
    }

    /// Resolve one target node and fetch its action-aware neighborhood
    async fn analyze_target(
        &self,
        id: &str,
        action: Option<ChangeAction>,
        depth: u32,
    ) -> Result<(Option<GraphNode>, Vec<GraphNode>), CoreError> {
        let mut direct = None;
        for label in NodeLabel::PROBE_ORDER {
            if let Some(node) = self.graph.get_node(label, id).await? {
                direct = Some(node);
                break;
            }
        }

        debug!("Action-aware traversal for {id} (action={action:?}, depth={depth})");
        let neighbors = self
            .graph
            .get_action_aware_neighbors(id, action, depth)
            .await?;
        Ok((direct, neighbors))
    }

    /// Query full dependency paths, deduplicate by endpoint, rank by
    /// criticality
    async fn build_critical_paths(
        &self,
        target_ids: &[String],
        action: Option<ChangeAction>,
        depth: u32,
    ) -> Result<Vec<CriticalPath>, CoreError> {
        let mut paths: Vec<CriticalPath> = Vec::new();
        let mut index: HashMap<(String, String), usize> = HashMap::new();

        for target_id in target_ids {
            let raw_paths = self
                .graph
                .get_critical_paths(target_id, action, depth)
                .await?;
            for raw in raw_paths {
                if raw.nodes.len() < 2 {
                    continue;
                }
                let Some(endpoint) = raw.nodes.last() else {
                    continue;
                };
                if endpoint.id == *target_id {
                    // loops back to start
                    continue;
                }
                let hops = raw.edges.len();
                let key = (target_id.clone(), endpoint.id.clone());
                let candidate = CriticalPath {
                    source_id: target_id.clone(),
                    endpoint_id: endpoint.id.clone(),
                    endpoint_label: endpoint.label.as_str().to_string(),
                    criticality: endpoint.criticality(),
                    hops,
                    nodes: raw
                        .nodes
                        .iter()
                        .map(|n| PathNode {
                            id: n.id.clone(),
                            label: n.label.as_str().to_string(),
                        })
                        .collect(),
                    edges: raw.edges.clone(),
                    path_description: None,
                    reasoning: None,
                };
                match index.get(&key) {
                    // Same endpoint already reached: keep the shortest route,
                    // first seen winning ties
                    Some(&slot) if hops < paths[slot].hops => paths[slot] = candidate,
                    Some(_) => {}
                    None => {
                        index.insert(key, paths.len());
                        paths.push(candidate);
                    }
                }
            }
        }

        // Stable sort: criticality descending, insertion order within ties
        paths.sort_by(|a, b| b.criticality.cmp(&a.criticality));
        Ok(paths)
    }

    /// Run the AI step with in-flight deduplication.
    ///
    /// Returns `None` whenever AI augmentation is unavailable or fails; the
    /// caller then publishes the graph-only result.
    async fn ai_augmentation(&self, request: &ImpactRequest) -> Option<AiImpactAnalysis> {
        let ai = self.ai.as_ref()?;
        if !ai.is_available() {
            debug!("AI collaborator not available, using graph-only analysis");
            return None;
        }

        let key = request.dedup_key();
        let role = {
            let mut map = self
                .inflight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            match map.get(&key) {
                Some(rx) => InflightRole::Waiter(rx.clone()),
                None => {
                    let (tx, rx) = watch::channel(InflightState::Pending);
                    map.insert(key.clone(), rx);
                    InflightRole::Owner(tx)
                }
            }
        };

        match role {
            InflightRole::Waiter(mut rx) => {
                info!("In-flight hit, awaiting existing AI call (key={key})");
                loop {
                    if let InflightState::Done(outcome) = rx.borrow().clone() {
                        return outcome;
                    }
                    if rx.changed().await.is_err() {
                        // The owning call went away without publishing
                        warn!("In-flight AI call abandoned (key={key})");
                        return None;
                    }
                }
            }
            InflightRole::Owner(tx) => {
                let _guard = InflightGuard {
                    inflight: &self.inflight,
                    key: &key,
                };
                let outcome = self.run_ai_call(ai, request).await;
                let _ = tx.send(InflightState::Done(outcome.clone()));
                outcome
            }
        }
    }

    /// The actual AI invocation: fetch the wider context, then analyze
    async fn run_ai_call(
        &self,
        ai: &Arc<dyn AiAnalysisClient>,
        request: &ImpactRequest,
    ) -> Option<AiImpactAnalysis> {
        let topology = match self
            .graph
            .get_subgraph(&request.target_ids, self.config.ai_context_depth)
            .await
        {
            Ok(topology) => topology,
            Err(e) => {
                warn!("Subgraph fetch for AI context failed: {e}");
                return None;
            }
        };
        debug!(
            "Subgraph for AI context: {} nodes, {} edges",
            topology.nodes.len(),
            topology.edges.len(),
        );

        let context = ChangeContext {
            action: request.action,
            change_type: request.change_type.clone(),
            environment: request.environment.clone(),
            title: request.title.clone(),
            target_node_ids: request.target_ids.clone(),
        };
        ai.analyze(&topology, &context).await
    }
}
