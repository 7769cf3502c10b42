//! Request and response bodies

use llm::Message;
use research_agent::{Effort, ResearchState, RunInput, Source};
use serde::{Deserialize, Serialize};

/// Body of `POST /runs/wait` and `POST /runs/stream`.
///
/// Explicit counts take precedence over the effort preset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<Effort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_search_query_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_research_loops: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_model: Option<String>,
}

impl RunRequest {
    pub fn question(text: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::human(text)],
            ..Default::default()
        }
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.effort = Some(effort);
        self
    }

    /// Build the run input.
    pub fn into_input(self) -> RunInput {
        let mut input = RunInput::new(self.messages);
        if let Some(effort) = self.effort {
            input = input.with_effort(effort);
        }
        if let Some(count) = self.initial_search_query_count {
            input.initial_search_query_count = Some(count);
        }
        if let Some(loops) = self.max_research_loops {
            input.max_research_loops = Some(loops);
        }
        input.reasoning_model = self.reasoning_model;
        input
    }
}

/// Final output of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub messages: Vec<Message>,
    pub sources: Vec<Source>,
    pub unresolved_citations: Vec<String>,
    pub research_loop_count: usize,
}

impl From<ResearchState> for RunOutput {
    fn from(state: ResearchState) -> Self {
        let (sources, unresolved_citations) = match state.final_answer {
            Some(answer) => (answer.sources, answer.unresolved_citations),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            messages: state.messages,
            sources,
            unresolved_citations,
            research_loop_count: state.loop_count,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_explicit_counts_override_effort() {
        let request: RunRequest = serde_json::from_value(json!({
            "messages": [{"type": "human", "content": "q"}],
            "effort": "high",
            "max_research_loops": 2
        }))
        .unwrap();

        let input = request.into_input();
        assert_eq!(input.initial_search_query_count, Some(5));
        assert_eq!(input.max_research_loops, Some(2));
        assert!(input.reasoning_model.is_none());
    }

    #[test]
    fn test_unknown_effort_is_rejected() {
        let result: Result<RunRequest, _> = serde_json::from_value(json!({
            "messages": [],
            "effort": "extreme"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_output_from_state_without_answer() {
        let state = ResearchState {
            loop_count: 2,
            ..Default::default()
        };
        let output = RunOutput::from(state);
        assert_eq!(output.research_loop_count, 2);
        assert!(output.sources.is_empty());
    }
}
