//! One chat turn: submit, stream, settle

use std::future::Future;
use std::io::Write;

use futures::StreamExt;
use research_agent::{ChatSession, ResearchGraph, RunInput, Source, StreamChunk};
use tracing::{debug, warn};

use crate::error::Result;
use crate::render::Renderer;

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The answer was rendered and its timeline stored under `message_id`.
    Answered { message_id: Option<String>, sources: Vec<Source> },
    /// The user stopped listening.
    Cancelled,
    /// The run failed; the session holds the error.
    Failed(String),
}

/// Stream one run into the session and renderer.
///
/// The turn stops listening as soon as `cancel` resolves; the background run
/// stops at its next step.
pub async fn run_turn<W, C>(
    graph: &ResearchGraph,
    session: &mut ChatSession,
    input: RunInput,
    renderer: &mut Renderer<W>,
    cancel: C,
) -> Result<TurnOutcome>
where
    W: Write,
    C: Future<Output = ()>,
{
    let mut stream = graph.stream(input);
    let mut final_state = None;
    tokio::pin!(cancel);
    renderer.start();

    loop {
        tokio::select! {
            _ = &mut cancel => {
                session.cancel();
                renderer.stop();
                debug!("Turn cancelled by user");
                return Ok(TurnOutcome::Cancelled);
            }
            chunk = stream.next() => match chunk {
                Some(Ok(StreamChunk::Updates(event))) => {
                    if let Some(record) = session.on_event(&event.to_payload()) {
                        renderer.event(&record)?;
                    }
                }
                Some(Ok(StreamChunk::Values(state))) => final_state = Some(*state),
                Some(Err(e)) => {
                    let message = e.to_string();
                    session.on_error(message.clone());
                    renderer.error_screen(&message)?;
                    return Ok(TurnOutcome::Failed(message));
                }
                None => break,
            }
        }
    }

    let Some(state) = final_state else {
        let message = "Research stream ended without a result".to_string();
        session.on_error(message.clone());
        renderer.error_screen(&message)?;
        return Ok(TurnOutcome::Failed(message));
    };

    let answer = state.final_answer.clone().unwrap_or_default();
    session.on_finish(state.messages);
    let message_id = session.settle();

    renderer.answer(&answer.content, &answer.sources)?;
    if let Some(timeline) = message_id.as_deref().and_then(|id| session.timeline_for(id)) {
        renderer.timeline_summary(timeline)?;
    }
    if !answer.unresolved_citations.is_empty() {
        warn!(count = answer.unresolved_citations.len(), "Answer cited unknown sources");
        renderer.warning(&format!(
            "{} citation(s) could not be matched to a source and were removed.",
            answer.unresolved_citations.len()
        ))?;
    }

    Ok(TurnOutcome::Answered {
        message_id,
        sources: answer.sources,
    })
}
