//! Chat model abstraction and hosted model clients for the research agent.
//!
//! The research workflow talks to its language model through the [`ChatModel`]
//! trait. A request can ask for two capabilities beyond plain chat:
//!
//! - **Structured output**: [`ResponseFormat::Json`] carries a JSON Schema the
//!   reply must satisfy.
//! - **Search grounding**: [`Tool::GoogleSearch`] lets the hosted model run web
//!   searches; the sources it used come back as [`GroundingMetadata`].
//!
//! # Remote Providers
//!
//! - **Gemini** - Google's Gemini models via the Generative Language REST API
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use llm::remote::GeminiClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig, Tool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RemoteLlmConfig::from_env(
//!         "GEMINI_API_KEY",
//!         "https://generativelanguage.googleapis.com/v1beta",
//!         "gemini-2.0-flash",
//!     )?;
//!     let client = GeminiClient::new(config)?;
//!
//!     let request = ChatRequest::new(vec![Message::human("Who won Euro 2024?")])
//!         .with_temperature(0.0)
//!         .with_tool(Tool::GoogleSearch);
//!
//!     let response = client.chat(request).await?;
//!     println!("{}", response.text());
//!     if let Some(grounding) = response.grounding {
//!         println!("{} sources", grounding.grounding_chunks.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod chat;
pub mod config;
pub mod error;
pub mod message;
pub mod remote;
pub mod retry;

// Re-export commonly used types
pub use chat::{
    ChatConfig, ChatModel, ChatRequest, ChatResponse, GroundingChunk, GroundingMetadata,
    GroundingSupport, ResponseFormat, Segment, Tool, UsageMetadata, WebChunk,
};
pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use message::{Message, MessageRole};
pub use retry::RetryConfig;
