//! The research workflow graph.
//!
//! ```text
//! START → generate_query ──Send×k──▶ web_research ──▶ reflection ──┬─▶ finalize_answer → END
//!                                          ▲                       │
//!                                          └──────Send×n───────────┘
//! ```
//!
//! `reflection` is the only branch point: it loops back to `web_research`
//! while the research is insufficient and the loop ceiling has not been
//! reached, and goes to `finalize_answer` otherwise.
//!
//! # Example
//!
//! ```rust,ignore
//! use research_agent::{Configuration, Effort, ResearchGraph, RunInput};
//! use futures::StreamExt;
//!
//! let graph = ResearchGraph::new(model, Configuration::default());
//! let input = RunInput::question("Who was the top scorer of Euro 2024?").with_effort(Effort::Low);
//!
//! let mut stream = graph.stream(input);
//! while let Some(chunk) = stream.next().await {
//!     println!("{}", chunk?.payload());
//! }
//! ```

mod error;
mod runner;
mod send;
mod stream;

pub use error::{GraphError, Result};
pub use send::{continue_to_web_research, route_after_reflection, Route, Send};
pub use stream::StreamChunk;

use crate::configuration::Configuration;
use crate::nodes::ResearchContext;
use crate::state::{ResearchState, RunInput};
use llm::ChatModel;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error};

/// Node identifier
pub type NodeId = &'static str;

pub const GENERATE_QUERY: NodeId = "generate_query";
pub const WEB_RESEARCH: NodeId = "web_research";
pub const REFLECTION: NodeId = "reflection";
pub const FINALIZE_ANSWER: NodeId = "finalize_answer";

/// Default ceiling on supersteps per run.
///
/// Raised per run when the loop ceiling needs more steps; see [`required_steps`].
pub const DEFAULT_RECURSION_LIMIT: usize = 64;

const STREAM_BUFFER: usize = 32;

/// Supersteps a run needs to reach finalization at `loop_ceiling`.
///
/// One step for query generation, then a wave and a reflection per loop,
/// then the finalizer.
pub fn required_steps(loop_ceiling: usize) -> usize {
    loop_ceiling.saturating_mul(2).saturating_add(2)
}

/// Compiled research workflow.
#[derive(Debug, Clone)]
pub struct ResearchGraph {
    ctx: ResearchContext,
    recursion_limit: Option<usize>,
}

impl ResearchGraph {
    pub fn new(model: Arc<dyn ChatModel>, config: Configuration) -> Self {
        Self::from_context(ResearchContext::new(model, config))
    }

    pub fn from_context(ctx: ResearchContext) -> Self {
        Self {
            ctx,
            recursion_limit: None,
        }
    }

    /// Set a fixed superstep ceiling, applied even below what the loop ceiling needs.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn context(&self) -> &ResearchContext {
        &self.ctx
    }

    /// Run to completion and return the final state.
    pub async fn invoke(&self, input: RunInput) -> Result<ResearchState> {
        runner::run(&self.ctx, self.recursion_limit, input, None).await
    }

    /// Run in the background, streaming one chunk per step and the final state.
    ///
    /// A failed run ends the stream with one `Err`. Dropping the stream stops
    /// the run at its next emission point; work already done is kept.
    pub fn stream(&self, input: RunInput) -> ReceiverStream<Result<StreamChunk>> {
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let graph = self.clone();

        tokio::spawn(async move {
            match runner::run(&graph.ctx, graph.recursion_limit, input, Some(&tx)).await {
                Ok(_) => {}
                Err(GraphError::Cancelled) => debug!("Research stream cancelled by consumer"),
                Err(e) => {
                    error!(error = %e, "Research run failed");
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}
