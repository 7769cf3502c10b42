//! Error types for the research workflow steps.
//!
//! Step functions return [`AgentError`]; the graph runtime wraps a failed step
//! into [`GraphError::NodeExecution`](crate::graph::GraphError) with the node
//! name attached.

use llm::LlmError;
use thiserror::Error;

/// Result type alias for workflow steps
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors produced while executing a workflow step.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model's structured output did not parse or did not match its schema
    #[error("Model output does not match schema '{schema}': {reason}")]
    SchemaValidation {
        /// Name of the expected schema
        schema: String,
        /// What was wrong with the output
        reason: String,
    },

    /// The hosted model call failed
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgentError {
    /// Create a schema validation error
    pub fn schema(schema: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaValidation {
            schema: schema.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the same step could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Llm(e) => e.is_retryable(),
            Self::SchemaValidation { .. } | Self::Config(_) => false,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        Self::schema("json", err.to_string())
    }
}
