use deplyx_interfaces::GraphError;
use thiserror::Error;

/// Core error type for the Deplyx change risk pipeline
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Change not found
    #[error("Change not found: {0}")]
    ChangeNotFound(String),

    /// Approval record not found
    #[error("Approval not found: {0}")]
    ApprovalNotFound(String),

    /// Invalid workflow transition
    #[error("Workflow error: {0}")]
    WorkflowError(String),

    /// Dependency graph access error
    #[error("Graph access error: {0}")]
    GraphAccessError(String),

    /// Persistence store error
    #[error("State store error: {0}")]
    StateStoreError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<GraphError> for CoreError {
    fn from(err: GraphError) -> Self {
        CoreError::GraphAccessError(err.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

impl From<String> for CoreError {
    fn from(err: String) -> Self {
        CoreError::Other(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let errors = vec![
            (
                CoreError::ChangeNotFound("chg-1".to_string()),
                "Change not found: chg-1",
            ),
            (
                CoreError::ApprovalNotFound("42".to_string()),
                "Approval not found: 42",
            ),
            (
                CoreError::WorkflowError("already decided".to_string()),
                "Workflow error: already decided",
            ),
            (
                CoreError::GraphAccessError("timeout".to_string()),
                "Graph access error: timeout",
            ),
            (
                CoreError::StateStoreError("db down".to_string()),
                "State store error: db down",
            ),
            (CoreError::Other("other".to_string()), "other"),
        ];
        for (error, expected) in errors {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_from_graph_error() {
        let err: CoreError = GraphError::QueryError("bad cypher".to_string()).into();
        match err {
            CoreError::GraphAccessError(msg) => assert!(msg.contains("bad cypher")),
            _ => panic!("Expected GraphAccessError variant"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: CoreError = json_error.into();
        assert!(matches!(err, CoreError::SerializationError(_)));
    }
}
