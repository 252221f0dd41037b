use deplyx_interfaces::{
    ActionAnalysis, AiRiskAssessment, BlastRadius, CriticalPath, Criticality, GraphNode,
    TraversalStrategy,
};
use serde::{Deserialize, Serialize};

/// Result of an impact analysis run.
///
/// Created fresh per analysis call; the core never persists it. The
/// dependency counts always come from the graph pass, while the explanatory
/// fields may be replaced by the AI collaborator when it is available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactResult {
    /// Resolved nodes for the explicit change targets, in request order
    pub directly_impacted: Vec<GraphNode>,

    /// Deduplicated reachable nodes beyond the targets
    pub indirectly_impacted: Vec<GraphNode>,

    /// Impacted nodes labelled Application
    pub affected_applications: Vec<GraphNode>,

    /// Impacted nodes labelled Service
    pub affected_services: Vec<GraphNode>,

    /// Impacted nodes labelled VLAN
    pub affected_vlans: Vec<GraphNode>,

    /// Direct plus indirect node count
    pub total_dependency_count: usize,

    /// Highest criticality across all impacted nodes
    pub max_criticality: Criticality,

    /// Traversal strategy the analysis used
    pub traversal_strategy: TraversalStrategy,

    /// Ranked, deduplicated dependency paths
    pub critical_paths: Vec<CriticalPath>,

    /// AI severity verdict, when AI augmentation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_assessment: Option<AiRiskAssessment>,

    /// AI blast-radius summary, when AI augmentation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blast_radius: Option<BlastRadius>,

    /// AI action analysis, when AI augmentation ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_analysis: Option<ActionAnalysis>,

    /// Whether the explanatory fields came from the AI collaborator
    pub llm_powered: bool,
}

impl ImpactResult {
    /// The AI severity on the shared criticality scale, when a usable one
    /// is present
    pub fn ai_severity(&self) -> Option<Criticality> {
        self.risk_assessment
            .as_ref()
            .and_then(AiRiskAssessment::severity_level)
    }
}

/// Highest criticality across a set of nodes, defaulting to low
pub fn max_criticality<'a>(nodes: impl IntoIterator<Item = &'a GraphNode>) -> Criticality {
    nodes
        .into_iter()
        .map(GraphNode::criticality)
        .max()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplyx_interfaces::NodeLabel;
    use serde_json::json;

    fn node_with_criticality(id: &str, criticality: &str) -> GraphNode {
        let mut node = GraphNode::new(id, NodeLabel::Device);
        node.properties
            .insert("criticality".to_string(), json!(criticality));
        node
    }

    #[test]
    fn test_max_criticality_over_nodes() {
        let nodes = vec![
            node_with_criticality("a", "low"),
            node_with_criticality("b", "critical"),
            node_with_criticality("c", "medium"),
        ];
        assert_eq!(max_criticality(&nodes), Criticality::Critical);
    }

    #[test]
    fn test_max_criticality_empty_defaults_low() {
        assert_eq!(max_criticality(&[]), Criticality::Low);
    }

    #[test]
    fn test_ai_severity_requires_known_value() {
        let mut result = ImpactResult {
            directly_impacted: vec![],
            indirectly_impacted: vec![],
            affected_applications: vec![],
            affected_services: vec![],
            affected_vlans: vec![],
            total_dependency_count: 0,
            max_criticality: Criticality::Low,
            traversal_strategy: TraversalStrategy::GenericNeighborCrawl,
            critical_paths: vec![],
            risk_assessment: None,
            blast_radius: None,
            action_analysis: None,
            llm_powered: false,
        };
        assert_eq!(result.ai_severity(), None);

        result.risk_assessment = Some(AiRiskAssessment {
            severity: "medium".to_string(),
            ..Default::default()
        });
        assert_eq!(result.ai_severity(), Some(Criticality::Medium));

        result.risk_assessment = Some(AiRiskAssessment {
            severity: "apocalyptic".to_string(),
            ..Default::default()
        });
        assert_eq!(result.ai_severity(), None);
    }
}
