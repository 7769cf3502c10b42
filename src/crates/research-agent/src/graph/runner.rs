//! Superstep execution loop.
//!
//! Each iteration runs one route: a single node, or a wave of concurrent
//! sends joined with `futures::future::join_all`. Updates are merged only
//! after every task of the superstep has returned, then one update event per
//! task is emitted in task-id order.

use super::error::{GraphError, Result};
use super::send::{after_web_research, continue_to_web_research, route_after_reflection, Route, Send};
use super::stream::StreamChunk;
use super::{
    required_steps, NodeId, DEFAULT_RECURSION_LIMIT, FINALIZE_ANSWER, GENERATE_QUERY, REFLECTION, WEB_RESEARCH,
};
use crate::events::StepEvent;
use crate::nodes::{finalize_answer, generate_query, reflection, web_research, ResearchContext};
use crate::state::{ResearchState, RunInput, StateUpdate};
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub(crate) type ChunkSender = mpsc::Sender<Result<StreamChunk>>;

pub(crate) async fn run(
    ctx: &ResearchContext,
    recursion_limit: Option<usize>,
    input: RunInput,
    tx: Option<&ChunkSender>,
) -> Result<ResearchState> {
    let mut state = ResearchState::from_input(input)?;
    let recursion_limit = recursion_limit
        .unwrap_or_else(|| DEFAULT_RECURSION_LIMIT.max(required_steps(state.loop_ceiling(ctx.config()))));
    let mut route = Route::Node(GENERATE_QUERY);
    let mut step = 0usize;

    info!(
        initial_queries = state.initial_query_count(ctx.config()),
        max_loops = state.loop_ceiling(ctx.config()),
        recursion_limit,
        "Starting research run"
    );

    loop {
        if matches!(route, Route::End) {
            break;
        }
        if tx.is_some_and(|tx| tx.is_closed()) {
            debug!(step, "Stream receiver dropped, stopping run");
            return Err(GraphError::Cancelled);
        }
        if step >= recursion_limit {
            return Err(GraphError::RecursionLimit { limit: recursion_limit });
        }
        step += 1;

        route = match route {
            Route::Node(node) => {
                let update = execute_node(ctx, node, &state).await?;
                let event = StepEvent::from_update(node, &update, &state);
                state.apply(update)?;
                debug!(step, node, "Superstep complete");
                emit(tx, StreamChunk::Updates(event)).await?;
                next_route(ctx, node, &state)
            }
            Route::Sends(sends) => {
                let events = execute_wave(ctx, sends, &mut state).await?;
                debug!(step, tasks = events.len(), "Research wave complete");
                for event in events {
                    emit(tx, StreamChunk::Updates(event)).await?;
                }
                after_web_research()
            }
            Route::End => Route::End,
        };
    }

    info!(
        steps = step,
        loops = state.loop_count,
        results = state.research_results.len(),
        sources = state.sources.len(),
        "Research run finished"
    );
    emit(tx, StreamChunk::Values(Box::new(state.clone()))).await?;
    Ok(state)
}

async fn execute_node(ctx: &ResearchContext, node: NodeId, state: &ResearchState) -> Result<StateUpdate> {
    let result = match node {
        GENERATE_QUERY => generate_query(ctx, state).await,
        REFLECTION => reflection(ctx, state).await,
        FINALIZE_ANSWER => finalize_answer(ctx, state).await,
        other => return Err(GraphError::Validation(format!("Node '{}' cannot run on its own", other))),
    };
    result.map_err(|e| {
        error!(node, error = %e, "Node execution failed");
        GraphError::node_execution(node, e)
    })
}

fn next_route(ctx: &ResearchContext, node: NodeId, state: &ResearchState) -> Route {
    match node {
        GENERATE_QUERY => continue_to_web_research(state),
        REFLECTION => route_after_reflection(state, ctx.config()),
        _ => Route::End,
    }
}

/// Run a wave and merge it, failing the whole wave if any task failed.
async fn execute_wave(ctx: &ResearchContext, sends: Vec<Send>, state: &mut ResearchState) -> Result<Vec<StepEvent>> {
    if let Some(send) = sends.iter().find(|s| s.node() != WEB_RESEARCH) {
        return Err(GraphError::Validation(format!(
            "Send targets '{}', only '{}' accepts sends",
            send.node(),
            WEB_RESEARCH
        )));
    }

    let mut tasks: Vec<_> = sends.into_iter().map(|s| s.into_parts().1).collect();
    tasks.sort_by_key(|t| t.id);
    info!(tasks = tasks.len(), "Dispatching research wave");

    let task_futures = tasks.into_iter().map(|task| async move {
        let id = task.id;
        (id, web_research(ctx, task).await)
    });
    let results = join_all(task_futures).await;

    let mut first_failure = None;
    let mut updates = Vec::with_capacity(results.len());
    for (task_id, result) in results {
        match result {
            Ok(update) => updates.push(update),
            Err(e) => {
                error!(task_id, error = %e, "Research task failed");
                if first_failure.is_none() {
                    first_failure = Some(e);
                }
            }
        }
    }
    if let Some(e) = first_failure {
        return Err(GraphError::node_execution(WEB_RESEARCH, e));
    }

    let events = updates
        .iter()
        .map(|update| StepEvent::from_update(WEB_RESEARCH, update, state))
        .collect();
    let merged = updates.into_iter().fold(StateUpdate::new(), StateUpdate::merge);
    state.apply(merged)?;
    Ok(events)
}

async fn emit(tx: Option<&ChunkSender>, chunk: StreamChunk) -> Result<()> {
    match tx {
        Some(tx) => tx.send(Ok(chunk)).await.map_err(|_| GraphError::Cancelled),
        None => Ok(()),
    }
}
