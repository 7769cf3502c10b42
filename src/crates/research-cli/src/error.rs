//! Error types for the research CLI

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Agent error: {0}")]
    Agent(#[from] research_agent::AgentError),

    #[error("{0}")]
    Graph(#[from] research_agent::GraphError),

    #[error("LLM client error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
