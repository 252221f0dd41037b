//! Shared vocabulary for the Deplyx change risk core
//!
//! These enums are the closed vocabularies exchanged between the core and its
//! collaborators: node criticality, graph node labels, the change action
//! catalogue, and the traversal strategies derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Criticality of a graph node, lowest to highest.
///
/// The derived `Ord` gives the ranking used for critical-path ordering:
/// `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    /// Routine component, failure has local effect
    #[default]
    Low,

    /// Failure degrades a function but alternatives exist
    Medium,

    /// Failure disrupts a business function
    High,

    /// Failure disrupts core infrastructure
    Critical,
}

impl Criticality {
    /// Numeric ranking weight (`low=1 .. critical=4`)
    pub fn weight(self) -> u8 {
        match self {
            Criticality::Low => 1,
            Criticality::Medium => 2,
            Criticality::High => 3,
            Criticality::Critical => 4,
        }
    }

    /// Parse a criticality string, case-insensitive. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "low" => Some(Criticality::Low),
            "medium" => Some(Criticality::Medium),
            "high" => Some(Criticality::High),
            "critical" => Some(Criticality::Critical),
            _ => None,
        }
    }

    /// Canonical lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Criticality::Low => "low",
            Criticality::Medium => "medium",
            Criticality::High => "high",
            Criticality::Critical => "critical",
        }
    }

    /// Criticality read from a node property bag.
    ///
    /// Absent, non-string, or unrecognised values default to `Low`.
    pub fn from_property(value: Option<&serde_json::Value>) -> Self {
        value
            .and_then(|v| v.as_str())
            .and_then(Self::parse)
            .unwrap_or_default()
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category label of a graph node, as stored in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeLabel {
    /// Physical or virtual network device
    Device,
    /// Firewall rule
    Rule,
    /// Layer-2 segment
    #[serde(rename = "VLAN")]
    Vlan,
    /// Business application
    Application,
    /// Device interface
    Interface,
    /// Hosted service
    Service,
    /// IP address
    #[serde(rename = "IP")]
    Ip,
    /// Switch port
    Port,
    /// Datacenter site
    Datacenter,
}

impl NodeLabel {
    /// Order in which labels are probed when resolving a bare node id.
    pub const PROBE_ORDER: [NodeLabel; 9] = [
        NodeLabel::Device,
        NodeLabel::Rule,
        NodeLabel::Vlan,
        NodeLabel::Application,
        NodeLabel::Interface,
        NodeLabel::Service,
        NodeLabel::Ip,
        NodeLabel::Port,
        NodeLabel::Datacenter,
    ];

    /// Canonical label string as stored in the graph
    pub fn as_str(self) -> &'static str {
        match self {
            NodeLabel::Device => "Device",
            NodeLabel::Rule => "Rule",
            NodeLabel::Vlan => "VLAN",
            NodeLabel::Application => "Application",
            NodeLabel::Interface => "Interface",
            NodeLabel::Service => "Service",
            NodeLabel::Ip => "IP",
            NodeLabel::Port => "Port",
            NodeLabel::Datacenter => "Datacenter",
        }
    }

    /// Parse a label string. Unknown labels yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Device" => Some(NodeLabel::Device),
            "Rule" => Some(NodeLabel::Rule),
            "VLAN" => Some(NodeLabel::Vlan),
            "Application" => Some(NodeLabel::Application),
            "Interface" => Some(NodeLabel::Interface),
            "Service" => Some(NodeLabel::Service),
            "IP" => Some(NodeLabel::Ip),
            "Port" => Some(NodeLabel::Port),
            "Datacenter" => Some(NodeLabel::Datacenter),
            _ => None,
        }
    }
}

impl fmt::Display for NodeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The catalogue of change actions Deplyx understands.
///
/// A closed enum so new action categories are a compile-time decision;
/// strings outside the catalogue parse to `None` and are treated as generic
/// configuration changes by every consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Add a firewall rule
    AddRule,
    /// Remove a firewall rule
    RemoveRule,
    /// Modify a firewall rule
    ModifyRule,
    /// Disable a firewall rule without removing it
    DisableRule,
    /// Administratively disable a switch port
    DisablePort,
    /// Re-enable a switch port
    EnablePort,
    /// Shut down a device interface
    ShutdownInterface,
    /// Move members to another VLAN
    ChangeVlan,
    /// Delete a VLAN
    DeleteVlan,
    /// Modify VLAN attributes
    ModifyVlan,
    /// Reboot a device
    RebootDevice,
    /// Permanently remove a device
    Decommission,
    /// Upgrade device firmware
    FirmwareUpgrade,
    /// Delete a cloud security group
    DeleteSg,
    /// Generic configuration change
    ConfigChange,
    /// Modify a cloud security group
    ModifySg,
}

impl ChangeAction {
    /// Parse an action string, case-insensitive. Unknown actions yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "add_rule" => Some(ChangeAction::AddRule),
            "remove_rule" => Some(ChangeAction::RemoveRule),
            "modify_rule" => Some(ChangeAction::ModifyRule),
            "disable_rule" => Some(ChangeAction::DisableRule),
            "disable_port" => Some(ChangeAction::DisablePort),
            "enable_port" => Some(ChangeAction::EnablePort),
            "shutdown_interface" => Some(ChangeAction::ShutdownInterface),
            "change_vlan" => Some(ChangeAction::ChangeVlan),
            "delete_vlan" => Some(ChangeAction::DeleteVlan),
            "modify_vlan" => Some(ChangeAction::ModifyVlan),
            "reboot_device" => Some(ChangeAction::RebootDevice),
            "decommission" => Some(ChangeAction::Decommission),
            "firmware_upgrade" => Some(ChangeAction::FirmwareUpgrade),
            "delete_sg" => Some(ChangeAction::DeleteSg),
            "config_change" => Some(ChangeAction::ConfigChange),
            "modify_sg" => Some(ChangeAction::ModifySg),
            _ => None,
        }
    }

    /// Canonical snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeAction::AddRule => "add_rule",
            ChangeAction::RemoveRule => "remove_rule",
            ChangeAction::ModifyRule => "modify_rule",
            ChangeAction::DisableRule => "disable_rule",
            ChangeAction::DisablePort => "disable_port",
            ChangeAction::EnablePort => "enable_port",
            ChangeAction::ShutdownInterface => "shutdown_interface",
            ChangeAction::ChangeVlan => "change_vlan",
            ChangeAction::DeleteVlan => "delete_vlan",
            ChangeAction::ModifyVlan => "modify_vlan",
            ChangeAction::RebootDevice => "reboot_device",
            ChangeAction::Decommission => "decommission",
            ChangeAction::FirmwareUpgrade => "firmware_upgrade",
            ChangeAction::DeleteSg => "delete_sg",
            ChangeAction::ConfigChange => "config_change",
            ChangeAction::ModifySg => "modify_sg",
        }
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Blast-radius traversal strategy selected from a change action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalStrategy {
    /// Follow rule protection edges and the owning firewall's neighborhood
    RuleDependencyTrace,
    /// Follow cabling, VLAN membership, and device attachment from a port
    PortDependencyTrace,
    /// Enumerate VLAN member interfaces and devices
    VlanMembershipScan,
    /// Everything connected to a device, for device-level actions
    FullDeviceBlastRadius,
    /// Immediate neighborhood crawl for configuration edits
    ConfigNeighborCrawl,
    /// Fallback crawl for unknown actions, depth-capped
    GenericNeighborCrawl,
}

impl TraversalStrategy {
    /// Select the traversal strategy for a change action.
    ///
    /// Total over the action catalogue; a missing or unknown action falls
    /// back to the generic crawl.
    pub fn for_action(action: Option<ChangeAction>) -> Self {
        let Some(action) = action else {
            return TraversalStrategy::GenericNeighborCrawl;
        };
        match action {
            ChangeAction::AddRule
            | ChangeAction::RemoveRule
            | ChangeAction::ModifyRule
            | ChangeAction::DisableRule => TraversalStrategy::RuleDependencyTrace,
            ChangeAction::DisablePort
            | ChangeAction::EnablePort
            | ChangeAction::ShutdownInterface => TraversalStrategy::PortDependencyTrace,
            ChangeAction::ChangeVlan | ChangeAction::DeleteVlan | ChangeAction::ModifyVlan => {
                TraversalStrategy::VlanMembershipScan
            }
            ChangeAction::RebootDevice
            | ChangeAction::Decommission
            | ChangeAction::FirmwareUpgrade
            | ChangeAction::DeleteSg => TraversalStrategy::FullDeviceBlastRadius,
            ChangeAction::ConfigChange | ChangeAction::ModifySg => {
                TraversalStrategy::ConfigNeighborCrawl
            }
        }
    }

    /// Canonical snake_case name reported in impact results
    pub fn as_str(self) -> &'static str {
        match self {
            TraversalStrategy::RuleDependencyTrace => "rule_dependency_trace",
            TraversalStrategy::PortDependencyTrace => "port_dependency_trace",
            TraversalStrategy::VlanMembershipScan => "vlan_membership_scan",
            TraversalStrategy::FullDeviceBlastRadius => "full_device_blast_radius",
            TraversalStrategy::ConfigNeighborCrawl => "config_neighbor_crawl",
            TraversalStrategy::GenericNeighborCrawl => "generic_neighbor_crawl",
        }
    }

    /// Effective traversal depth for this strategy.
    ///
    /// Neighborhood crawls are capped at 2 hops to bound query cost; the
    /// action-specific traces use the requested depth.
    pub fn effective_depth(self, requested: u32) -> u32 {
        match self {
            TraversalStrategy::ConfigNeighborCrawl | TraversalStrategy::GenericNeighborCrawl => {
                requested.min(2)
            }
            _ => requested,
        }
    }
}

impl fmt::Display for TraversalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_criticality_ordering() {
        assert!(Criticality::Critical > Criticality::High);
        assert!(Criticality::High > Criticality::Medium);
        assert!(Criticality::Medium > Criticality::Low);
        assert_eq!(Criticality::Critical.weight(), 4);
        assert_eq!(Criticality::Low.weight(), 1);
    }

    #[test]
    fn test_criticality_from_property() {
        assert_eq!(
            Criticality::from_property(Some(&json!("critical"))),
            Criticality::Critical
        );
        assert_eq!(
            Criticality::from_property(Some(&json!("HIGH"))),
            Criticality::High
        );
        // Non-string and unknown values default to low
        assert_eq!(Criticality::from_property(Some(&json!(42))), Criticality::Low);
        assert_eq!(
            Criticality::from_property(Some(&json!("severe"))),
            Criticality::Low
        );
        assert_eq!(Criticality::from_property(None), Criticality::Low);
    }

    #[test]
    fn test_node_label_round_trip() {
        for label in NodeLabel::PROBE_ORDER {
            assert_eq!(NodeLabel::parse(label.as_str()), Some(label));
        }
        assert_eq!(NodeLabel::parse("Switch"), None);
        assert_eq!(NodeLabel::Vlan.as_str(), "VLAN");
        assert_eq!(NodeLabel::Ip.as_str(), "IP");
    }

    #[test]
    fn test_rule_actions_select_rule_trace() {
        for action in ["add_rule", "remove_rule", "modify_rule", "disable_rule"] {
            let parsed = ChangeAction::parse(action);
            assert!(parsed.is_some(), "{action} should parse");
            assert_eq!(
                TraversalStrategy::for_action(parsed),
                TraversalStrategy::RuleDependencyTrace
            );
        }
    }

    #[test]
    fn test_strategy_partition() {
        let cases = [
            ("disable_port", TraversalStrategy::PortDependencyTrace),
            ("enable_port", TraversalStrategy::PortDependencyTrace),
            ("shutdown_interface", TraversalStrategy::PortDependencyTrace),
            ("change_vlan", TraversalStrategy::VlanMembershipScan),
            ("delete_vlan", TraversalStrategy::VlanMembershipScan),
            ("modify_vlan", TraversalStrategy::VlanMembershipScan),
            ("reboot_device", TraversalStrategy::FullDeviceBlastRadius),
            ("decommission", TraversalStrategy::FullDeviceBlastRadius),
            ("firmware_upgrade", TraversalStrategy::FullDeviceBlastRadius),
            ("delete_sg", TraversalStrategy::FullDeviceBlastRadius),
            ("config_change", TraversalStrategy::ConfigNeighborCrawl),
            ("modify_sg", TraversalStrategy::ConfigNeighborCrawl),
        ];
        for (action, expected) in cases {
            assert_eq!(
                TraversalStrategy::for_action(ChangeAction::parse(action)),
                expected,
                "action {action}"
            );
        }
    }

    #[test]
    fn test_unknown_action_degrades_to_generic() {
        assert_eq!(ChangeAction::parse("repave_host"), None);
        assert_eq!(
            TraversalStrategy::for_action(None),
            TraversalStrategy::GenericNeighborCrawl
        );
        assert_eq!(
            TraversalStrategy::for_action(ChangeAction::parse("repave_host")),
            TraversalStrategy::GenericNeighborCrawl
        );
    }

    #[test]
    fn test_generic_depth_cap() {
        assert_eq!(TraversalStrategy::GenericNeighborCrawl.effective_depth(5), 2);
        assert_eq!(TraversalStrategy::ConfigNeighborCrawl.effective_depth(3), 2);
        assert_eq!(TraversalStrategy::GenericNeighborCrawl.effective_depth(1), 1);
        assert_eq!(TraversalStrategy::FullDeviceBlastRadius.effective_depth(3), 3);
    }

    #[test]
    fn test_action_serde_names() {
        let json = serde_json::to_string(&ChangeAction::DeleteSg).unwrap();
        assert_eq!(json, "\"delete_sg\"");
        let parsed: ChangeAction = serde_json::from_str("\"firmware_upgrade\"").unwrap();
        assert_eq!(parsed, ChangeAction::FirmwareUpgrade);
    }
}
