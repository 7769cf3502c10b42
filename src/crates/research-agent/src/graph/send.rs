//! Routing primitives: `Send` for fan-out and `Route` for edge results.

use super::{NodeId, REFLECTION, WEB_RESEARCH, FINALIZE_ANSWER};
use crate::configuration::Configuration;
use crate::nodes::WebSearchTask;
use crate::state::ResearchState;
use tracing::{info, warn};

/// Dispatch one task to a node in the next superstep.
///
/// A route returning several sends runs them concurrently; the next step
/// starts only once all of them have returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Send {
    node: NodeId,
    task: WebSearchTask,
}

impl Send {
    pub fn new(node: NodeId, task: WebSearchTask) -> Self {
        Self { node, task }
    }

    /// Target node name
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn task(&self) -> &WebSearchTask {
        &self.task
    }

    /// Consume the Send and return its parts
    pub fn into_parts(self) -> (NodeId, WebSearchTask) {
        (self.node, self.task)
    }
}

/// Where execution goes after a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Run a single node
    Node(NodeId),
    /// Run one task per send, concurrently
    Sends(Vec<Send>),
    /// Stop
    End,
}

/// Fan pending queries out to the web researcher.
///
/// Task ids continue from the number of queries already executed, so they are
/// unique across waves.
pub fn continue_to_web_research(state: &ResearchState) -> Route {
    let offset = state.executed_queries.len();
    let sends = state
        .pending_queries
        .iter()
        .enumerate()
        .map(|(idx, query)| Send::new(WEB_RESEARCH, WebSearchTask::new(query.clone(), offset + idx)))
        .collect();
    Route::Sends(sends)
}

/// The loop's only branch: research again, or finalize.
pub fn route_after_reflection(state: &ResearchState, config: &Configuration) -> Route {
    let ceiling = state.loop_ceiling(config);
    let sufficient = state
        .last_reflection
        .as_ref()
        .map(|r| r.is_sufficient)
        .unwrap_or(true);

    if sufficient {
        return Route::Node(FINALIZE_ANSWER);
    }
    if state.loop_count >= ceiling {
        info!(loop_count = state.loop_count, ceiling, "Loop ceiling reached, finalizing");
        return Route::Node(FINALIZE_ANSWER);
    }
    if state.pending_queries.is_empty() {
        warn!(loop_count = state.loop_count, "Research insufficient but no follow-up queries, finalizing");
        return Route::Node(FINALIZE_ANSWER);
    }
    continue_to_web_research(state)
}

/// Node that always follows the web research wave.
pub(crate) fn after_web_research() -> Route {
    Route::Node(REFLECTION)
}
