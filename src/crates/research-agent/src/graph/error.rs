//! Error types for graph execution
//!
//! ```text
//! GraphError
//! ├── Validation       - Invalid run input or graph wiring
//! ├── NodeExecution    - A step failed
//! ├── State            - A reducer rejected an update
//! ├── RecursionLimit   - Too many supersteps
//! └── Cancelled        - The event stream was dropped
//! ```

use crate::error::AgentError;
use thiserror::Error;

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that end a research run.
#[derive(Error, Debug)]
pub enum GraphError {
    /// Run input or graph wiring is invalid
    ///
    /// Raised before any step runs, or when a route names an unknown node.
    #[error("Graph validation failed: {0}")]
    Validation(String),

    /// A step returned an error
    ///
    /// For a research wave this is the failing task with the lowest id; no
    /// update from that wave is merged.
    #[error("Node '{node}' execution failed: {error}")]
    NodeExecution {
        /// Name of the node that failed
        node: String,
        /// Error returned by the step
        #[source]
        error: AgentError,
    },

    /// A reducer rejected an update
    #[error("State error: {0}")]
    State(String),

    /// The run exceeded its superstep ceiling
    #[error("Recursion limit of {limit} supersteps reached")]
    RecursionLimit {
        /// Configured ceiling
        limit: usize,
    },

    /// The consumer stopped listening
    #[error("Run cancelled")]
    Cancelled,
}

impl GraphError {
    /// Create a node execution error
    pub fn node_execution(node: impl Into<String>, error: AgentError) -> Self {
        Self::NodeExecution {
            node: node.into(),
            error,
        }
    }

    /// The step error behind a node failure, if any.
    pub fn agent_error(&self) -> Option<&AgentError> {
        match self {
            Self::NodeExecution { error, .. } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_execution_display() {
        let err = GraphError::node_execution("reflection", AgentError::schema("Reflection", "bad"));
        assert_eq!(
            err.to_string(),
            "Node 'reflection' execution failed: Model output does not match schema 'Reflection': bad"
        );
        assert!(err.agent_error().is_some());
        assert!(GraphError::Cancelled.agent_error().is_none());
    }
}
