//! Iterative web-research agent.
//!
//! Answers a question by running a bounded research loop against a hosted
//! model whose search grounding acts as the web search backend:
//!
//! 1. **generate_query** turns the conversation into search queries
//! 2. **web_research** runs one grounded search per query, concurrently
//! 3. **reflection** decides whether the research answers the question and
//!    proposes follow-up queries
//! 4. steps 2-3 repeat until the research is sufficient or the loop ceiling
//!    is reached
//! 5. **finalize_answer** writes the answer with resolved citations
//!
//! Each completed step is streamed as a [`StepEvent`]; chat front-ends turn
//! those into a timeline with [`timeline::project`] and keep per-answer
//! history with [`timeline::ChatSession`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use llm::remote::GeminiClient;
//! use llm::RemoteLlmConfig;
//! use research_agent::{Configuration, Effort, ResearchGraph, RunInput};
//! use std::sync::Arc;
//!
//! let config = Configuration::default().resolve(&Default::default())?;
//! let client = GeminiClient::new(RemoteLlmConfig::from_env(
//!     "GEMINI_API_KEY",
//!     llm::config::GEMINI_BASE_URL,
//!     &config.query_generator_model,
//! )?)?;
//!
//! let graph = ResearchGraph::new(Arc::new(client), config);
//! let state = graph
//!     .invoke(RunInput::question("Who was the top scorer of Euro 2024?").with_effort(Effort::Low))
//!     .await?;
//! println!("{}", state.final_answer.unwrap().content);
//! ```

pub mod citations;
pub mod configuration;
pub mod error;
pub mod events;
pub mod graph;
pub mod nodes;
pub mod prompts;
pub mod schemas;
pub mod state;
pub mod testing;
pub mod timeline;
pub mod utils;

pub use configuration::{ConfigOverrides, Configuration, Effort};
pub use error::{AgentError, Result};
pub use events::StepEvent;
pub use graph::{GraphError, ResearchGraph, StreamChunk};
pub use schemas::{Reflection, SearchQueryList};
pub use state::{FinalAnswer, ResearchResult, ResearchState, RunInput, Source, SourceSet};
pub use timeline::{ChatSession, ProcessedEvent};
