//! Configuration for the change risk core

/// Configuration for impact analysis
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Default traversal depth when the caller does not specify one
    pub default_depth: u32,

    /// Depth of the pruned neighborhood handed to the AI collaborator.
    /// Wider than the rule-based traversal so the AI has more context.
    pub ai_context_depth: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_depth: 3,
            ai_context_depth: 4,
        }
    }
}

/// Configuration for the approval workflow
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Hours a pending approval may wait before being auto-rejected
    pub approval_timeout_hours: i64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            approval_timeout_hours: 48,
        }
    }
}
