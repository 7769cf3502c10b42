//! Activity timeline for chat front-ends.
//!
//! [`project`] turns a step event into a display record. [`ChatSession`]
//! holds what a chat view shows for one conversation: the message history,
//! the live timeline of the turn in progress, and the timelines of completed
//! answers keyed by message id.
//!
//! # Snapshot on settle
//!
//! The live timeline is copied to the history exactly once per completed turn:
//! after the finalizer event has been seen, the stream has gone idle, and the
//! last message is an assistant message with an id. [`ChatSession::settle`]
//! performs that check and clears the finalize flag, so calling it again is a
//! no-op until the next turn finalizes.

use crate::configuration::Effort;
use crate::events::StepEvent;
use crate::state::RunInput;
use llm::Message;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// One line of the activity timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedEvent {
    pub title: String,
    pub data: String,
}

impl ProcessedEvent {
    fn new(title: &str, data: String) -> Self {
        Self {
            title: title.to_string(),
            data,
        }
    }
}

/// Display record for an event; `None` for unrecognized events.
pub fn project(event: &StepEvent) -> Option<ProcessedEvent> {
    match event {
        StepEvent::GenerateQuery(e) => Some(ProcessedEvent::new(
            "Generating Search Queries",
            e.search_query.join(", "),
        )),
        StepEvent::WebResearch(e) => {
            let mut seen = HashSet::new();
            let labels: Vec<&str> = e
                .sources_gathered
                .iter()
                .map(|s| s.label.as_str())
                .filter(|label| !label.is_empty() && seen.insert(*label))
                .take(3)
                .collect();
            let related = if labels.is_empty() {
                "N/A".to_string()
            } else {
                labels.join(", ")
            };
            Some(ProcessedEvent::new(
                "Web Research",
                format!("Gathered {} sources. Related to: {}.", e.sources_gathered.len(), related),
            ))
        }
        StepEvent::Reflection(e) => {
            let data = if e.is_sufficient {
                "Search successful, generating final answer.".to_string()
            } else {
                format!("Need more information, searching for {}", e.follow_up_queries.join(", "))
            };
            Some(ProcessedEvent::new("Reflection", data))
        }
        StepEvent::FinalizeAnswer(_) => Some(ProcessedEvent::new(
            "Finalizing Answer",
            "Composing and presenting the final answer.".to_string(),
        )),
        StepEvent::Unrecognized(_) => None,
    }
}

/// Client-side state of one conversation.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    is_loading: bool,
    live: Vec<ProcessedEvent>,
    history: HashMap<String, Vec<ProcessedEvent>>,
    finalize_seen: bool,
    error: Option<String>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a turn: record the question and build the run input.
    pub fn submit(&mut self, text: impl Into<String>, effort: Effort, reasoning_model: Option<String>) -> RunInput {
        self.messages.push(Message::human(text));
        self.live.clear();
        self.finalize_seen = false;
        self.error = None;
        self.is_loading = true;

        let mut input = RunInput::new(self.messages.clone()).with_effort(effort);
        input.reasoning_model = reasoning_model;
        input
    }

    /// Handle one event payload from the stream.
    pub fn on_event(&mut self, payload: &Value) -> Option<ProcessedEvent> {
        let event = StepEvent::from_payload(payload);
        if matches!(event, StepEvent::FinalizeAnswer(_)) {
            self.finalize_seen = true;
        }
        let record = project(&event)?;
        self.live.push(record.clone());
        Some(record)
    }

    /// The stream went idle with the run's final message list.
    pub fn on_finish(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.is_loading = false;
    }

    /// The stream failed.
    pub fn on_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.is_loading = false;
    }

    /// Stop listening; nothing already received is rolled back.
    pub fn cancel(&mut self) {
        self.is_loading = false;
    }

    /// Start over from an empty session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Snapshot the live timeline onto the completed answer.
    ///
    /// Returns the message id the timeline was stored under, or `None` when
    /// the turn has not settled (or was already snapshotted).
    pub fn settle(&mut self) -> Option<String> {
        if !self.finalize_seen || self.is_loading {
            return None;
        }
        let last = self.messages.last()?;
        if !last.is_assistant() {
            return None;
        }
        let id = last.id.clone()?;

        let timeline = std::mem::take(&mut self.live);
        debug!(message_id = %id, events = timeline.len(), "Timeline snapshotted");
        self.history.insert(id.clone(), timeline);
        self.finalize_seen = false;
        Some(id)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn live_timeline(&self) -> &[ProcessedEvent] {
        &self.live
    }

    /// Timeline recorded for a completed answer.
    pub fn timeline_for(&self, message_id: &str) -> Option<&[ProcessedEvent]> {
        self.history.get(message_id).map(Vec::as_slice)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
