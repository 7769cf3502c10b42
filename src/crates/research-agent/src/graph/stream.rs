//! Streaming output of a research run.

use crate::events::StepEvent;
use crate::state::ResearchState;
use serde_json::Value;

/// One item emitted while a run executes.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// A step finished; emitted once per step, and once per task of a wave
    Updates(StepEvent),

    /// Final state, emitted once after the last step
    Values(Box<ResearchState>),
}

impl StreamChunk {
    /// JSON payload as sent to clients.
    ///
    /// Updates become `{ "<node>": <body> }`; values serialize the state.
    pub fn payload(&self) -> Value {
        match self {
            StreamChunk::Updates(event) => event.to_payload(),
            StreamChunk::Values(state) => serde_json::to_value(state.as_ref()).unwrap_or(Value::Null),
        }
    }

    pub fn as_event(&self) -> Option<&StepEvent> {
        match self {
            StreamChunk::Updates(event) => Some(event),
            StreamChunk::Values(_) => None,
        }
    }

    pub fn into_state(self) -> Option<ResearchState> {
        match self {
            StreamChunk::Values(state) => Some(*state),
            StreamChunk::Updates(_) => None,
        }
    }
}
