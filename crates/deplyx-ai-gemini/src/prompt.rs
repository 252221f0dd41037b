//! Prompt construction for the Gemini analysis client
//!
//! The topology snapshot is trimmed to a small property whitelist before
//! serialization so the prompt stays inside token limits.

use deplyx_interfaces::{ChangeContext, TopologySnapshot};
use serde_json::json;

/// Node properties worth forwarding to the model
const PROPERTY_WHITELIST: [&str; 9] = [
    "type",
    "criticality",
    "vendor",
    "hostname",
    "name",
    "status",
    "vlan_id",
    "port",
    "protocol",
];

pub(crate) const SYSTEM_PROMPT: &str = r#"You are a senior network infrastructure engineer and risk analyst for Deplyx, an enterprise network change management platform.

You will receive:
1. A JSON snapshot of the network topology (nodes and edges from the dependency graph)
2. Details of a proposed infrastructure change (action, type, target components)

Your job is to perform a **complete impact analysis** by reasoning about the topology graph. Think like you are tracing packets and dependencies through the network.

Return a JSON object with EXACTLY this structure (no markdown, no extra keys):
{
  "critical_paths": [
    {
      "source_id": "<target node id>",
      "endpoint_id": "<impacted endpoint id>",
      "endpoint_label": "<node type: Device|Application|Service|VLAN|...>",
      "criticality": "critical|high|medium|low",
      "hops": <number of hops>,
      "path_description": "<one-line description of dependency chain>",
      "nodes": [{"id": "<id>", "label": "<type>"}],
      "edges": [{"type": "<rel type>", "source": "<from id>", "target": "<to id>"}],
      "reasoning": "<why this path matters for this specific action>"
    }
  ],
  "risk_assessment": {
    "severity": "critical|high|medium|low",
    "summary": "<2-3 sentence risk summary>",
    "factors": ["<factor 1>", "<factor 2>", ...],
    "mitigations": ["<mitigation 1>", "<mitigation 2>", ...]
  },
  "blast_radius": {
    "total_impacted": <number>,
    "critical_services_at_risk": ["<service/app id>", ...],
    "redundancy_available": true|false,
    "redundancy_details": "<explanation of failover options>"
  },
  "action_analysis": {
    "action": "<the change action>",
    "traversal_strategy": "<what kind of traversal makes sense>",
    "explanation": "<why this traversal strategy is appropriate for this action>"
  }
}

Rules:
- Order critical_paths by criticality (critical first, then high, medium, low)
- Only include paths that are ACTUALLY affected by the specific action
- For 'remove_rule', trace PROTECTS edges to find apps that lose protection
- For 'reboot_device'/'decommission', trace ALL connected paths (full blast radius)
- For 'change_vlan'/'delete_vlan', find all devices and apps on that VLAN
- For 'disable_port', trace through the port's device to downstream dependencies
- Consider redundancy: if an alternate path exists, note it
- Be specific about WHY each path is critical for this particular action
- Return ONLY valid JSON, no markdown fences, no comments
"#;

/// Build the user prompt from a topology snapshot and change details
pub(crate) fn build_user_prompt(topology: &TopologySnapshot, change: &ChangeContext) -> String {
    let trimmed_nodes: Vec<serde_json::Value> = topology
        .nodes
        .iter()
        .map(|node| {
            let mut trimmed = serde_json::Map::new();
            trimmed.insert("id".to_string(), json!(node.id));
            trimmed.insert("label".to_string(), json!(node.label.as_str()));
            for key in PROPERTY_WHITELIST {
                if let Some(value) = node.properties.get(key) {
                    trimmed.insert(key.to_string(), value.clone());
                }
            }
            serde_json::Value::Object(trimmed)
        })
        .collect();

    let trimmed_edges: Vec<serde_json::Value> = topology
        .edges
        .iter()
        .map(|edge| {
            json!({
                "source": edge.source,
                "target": edge.target,
                "type": edge.rel_type,
            })
        })
        .collect();

    let prompt_data = json!({
        "topology": {
            "nodes": trimmed_nodes,
            "edges": trimmed_edges,
            "node_count": topology.nodes.len(),
            "edge_count": topology.edges.len(),
        },
        "change": {
            "action": change.action.map(|a| a.as_str()).unwrap_or("unknown"),
            "change_type": change.change_type.as_deref().unwrap_or("unknown"),
            "environment": change.environment.as_deref().unwrap_or("unknown"),
            "title": change.title,
            "target_node_ids": change.target_node_ids,
        },
    });

    format!(
        "Analyze the following infrastructure change against the network topology.\n\n{prompt_data:#}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use deplyx_interfaces::{ChangeAction, GraphEdge, GraphNode, NodeLabel};
    use serde_json::json;

    #[test]
    fn test_prompt_trims_node_properties() {
        let mut node = GraphNode::new("fw-1", NodeLabel::Device);
        node.properties.insert("criticality".to_string(), json!("high"));
        node.properties.insert("vendor".to_string(), json!("fortinet"));
        node.properties
            .insert("internal_notes".to_string(), json!("do not send"));
        let topology = TopologySnapshot {
            nodes: vec![node],
            edges: vec![GraphEdge::new("fw-1", "PROTECTS", "app-1")],
        };
        let change = ChangeContext {
            action: ChangeAction::parse("remove_rule"),
            change_type: Some("Firewall".to_string()),
            environment: Some("Prod".to_string()),
            title: "Remove legacy rule".to_string(),
            target_node_ids: vec!["fw-1".to_string()],
        };

        let prompt = build_user_prompt(&topology, &change);
        assert!(prompt.contains("\"criticality\": \"high\""));
        assert!(prompt.contains("\"vendor\": \"fortinet\""));
        assert!(!prompt.contains("internal_notes"));
        assert!(prompt.contains("remove_rule"));
        assert!(prompt.contains("PROTECTS"));
    }

    #[test]
    fn test_prompt_renders_unknowns() {
        let prompt = build_user_prompt(&TopologySnapshot::default(), &ChangeContext::default());
        assert!(prompt.contains("\"action\": \"unknown\""));
        assert!(prompt.contains("\"change_type\": \"unknown\""));
        assert!(prompt.contains("\"node_count\": 0"));
    }
}
