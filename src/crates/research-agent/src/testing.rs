//! Test doubles for the research workflow.
//!
//! [`ScriptedModel`] answers chat requests without network access. It tells
//! the workflow steps apart by the request shape:
//!
//! - Google Search tool enabled → web research
//! - `SearchQueryList` schema → query generation
//! - `Reflection` schema → reflection
//! - anything else → final answer
//!
//! Each kind has a default reply that keeps a run moving, and each can be
//! replaced with a closure.
//!
//! # Example
//! ```rust,ignore
//! use research_agent::testing::ScriptedModel;
//! use research_agent::{Configuration, Effort, ResearchGraph, RunInput};
//! use std::sync::Arc;
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let model = ScriptedModel::new().always_insufficient(vec!["follow up"]);
//!     let graph = ResearchGraph::new(Arc::new(model.clone()), Configuration::default());
//!     let state = graph.invoke(RunInput::question("q").with_effort(Effort::High)).await.unwrap();
//!     assert_eq!(model.research_calls(), 14);
//! }
//! ```

use crate::citations::SHORT_URL_PREFIX;
use crate::schemas::{Reflection, SearchQueryList, StructuredOutput};
use async_trait::async_trait;
use llm::{
    ChatModel, ChatRequest, ChatResponse, GroundingChunk, GroundingMetadata, GroundingSupport, LlmError,
    ResponseFormat, Segment, Tool, WebChunk,
};
use regex::Regex;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

type TextResponder = Arc<dyn Fn(&ChatRequest) -> llm::Result<String> + Send + Sync>;
type CountedTextResponder = Arc<dyn Fn(&ChatRequest, usize) -> llm::Result<String> + Send + Sync>;
type ResearchResponder = Arc<dyn Fn(&ChatRequest, usize) -> llm::Result<ChatResponse> + Send + Sync>;

/// Kind of workflow call a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Queries,
    Research,
    Reflection,
    Answer,
}

impl CallKind {
    pub fn of(request: &ChatRequest) -> Self {
        if request.tools.contains(&Tool::GoogleSearch) {
            return CallKind::Research;
        }
        match &request.response_format {
            ResponseFormat::Json { name, .. } if name == SearchQueryList::NAME => CallKind::Queries,
            ResponseFormat::Json { name, .. } if name == Reflection::NAME => CallKind::Reflection,
            _ => CallKind::Answer,
        }
    }
}

/// Offline [`ChatModel`] with per-step scripted replies.
#[derive(Clone)]
pub struct ScriptedModel {
    queries: TextResponder,
    research: ResearchResponder,
    reflection: CountedTextResponder,
    answer: TextResponder,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    research_calls: Arc<AtomicUsize>,
    reflection_calls: Arc<AtomicUsize>,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModel {
    /// Five distinct queries, one grounded source per search, a sufficient
    /// verdict, and an answer citing every source marker in its prompt.
    pub fn new() -> Self {
        Self {
            queries: Arc::new(|_| {
                Ok(query_list(&[
                    "primary topic query",
                    "recent news on topic",
                    "topic statistics",
                    "expert analysis of topic",
                    "topic background",
                ]))
            }),
            research: Arc::new(|_, call| {
                let uri = format!("https://source{}.example.com/report", call);
                let title = format!("source{}.example.com", call);
                Ok(Self::grounded_response(
                    &format!("Finding number {} about the topic.", call),
                    &[(uri.as_str(), title.as_str())],
                ))
            }),
            reflection: Arc::new(|_, _| {
                Ok(json!({"is_sufficient": true, "knowledge_gap": "", "follow_up_queries": []}).to_string())
            }),
            answer: Arc::new(|request| Ok(cite_everything(request))),
            requests: Arc::new(Mutex::new(Vec::new())),
            research_calls: Arc::new(AtomicUsize::new(0)),
            reflection_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reply to query generation with a fixed list.
    pub fn with_queries(self, queries: Vec<&str>) -> Self {
        let reply = query_list(&queries);
        self.on_queries(move |_| Ok(reply.clone()))
    }

    pub fn on_queries<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatRequest) -> llm::Result<String> + Send + Sync + 'static,
    {
        self.queries = Arc::new(f);
        self
    }

    /// Reply to web research; the index counts research calls from 0.
    pub fn on_research<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatRequest, usize) -> llm::Result<ChatResponse> + Send + Sync + 'static,
    {
        self.research = Arc::new(f);
        self
    }

    /// Reply to reflection; the index counts reflection calls from 0.
    pub fn on_reflection<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatRequest, usize) -> llm::Result<String> + Send + Sync + 'static,
    {
        self.reflection = Arc::new(f);
        self
    }

    pub fn with_reflection(self, verdict: Reflection) -> Self {
        self.on_reflection(move |_, _| serde_json::to_string(&verdict).map_err(LlmError::from))
    }

    /// Never satisfied; always asks for the same follow-ups.
    pub fn always_insufficient(self, follow_ups: Vec<&str>) -> Self {
        self.with_reflection(Reflection {
            is_sufficient: false,
            knowledge_gap: "More detail is needed.".to_string(),
            follow_up_queries: follow_ups.into_iter().map(String::from).collect(),
        })
    }

    pub fn on_answer<F>(mut self, f: F) -> Self
    where
        F: Fn(&ChatRequest) -> llm::Result<String> + Send + Sync + 'static,
    {
        self.answer = Arc::new(f);
        self
    }

    pub fn with_answer(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.on_answer(move |_| Ok(text.clone()))
    }

    /// Grounded reply whose whole text is supported by every given page.
    pub fn grounded_response(text: &str, pages: &[(&str, &str)]) -> ChatResponse {
        let grounding = GroundingMetadata {
            web_search_queries: Vec::new(),
            grounding_chunks: pages
                .iter()
                .map(|(uri, title)| GroundingChunk {
                    web: Some(WebChunk {
                        uri: uri.to_string(),
                        title: Some(title.to_string()),
                    }),
                })
                .collect(),
            grounding_supports: vec![GroundingSupport {
                segment: Some(Segment {
                    start_index: None,
                    end_index: Some(text.len()),
                    text: Some(text.to_string()),
                }),
                grounding_chunk_indices: (0..pages.len()).collect(),
            }],
        };
        ChatResponse::text_reply("scripted", text).with_grounding(grounding)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Requests of one kind, in order.
    pub fn requests_of(&self, kind: CallKind) -> Vec<ChatRequest> {
        self.requests()
            .into_iter()
            .filter(|r| CallKind::of(r) == kind)
            .collect()
    }

    pub fn research_calls(&self) -> usize {
        self.research_calls.load(Ordering::SeqCst)
    }

    pub fn reflection_calls(&self) -> usize {
        self.reflection_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        // Let other tasks run, as a network call would.
        tokio::task::yield_now().await;

        let model = request.model.clone().unwrap_or_else(|| "scripted".to_string());
        match CallKind::of(&request) {
            CallKind::Research => {
                let call = self.research_calls.fetch_add(1, Ordering::SeqCst);
                (self.research)(&request, call)
            }
            CallKind::Queries => (self.queries)(&request).map(|text| ChatResponse::text_reply(model, text)),
            CallKind::Reflection => {
                let call = self.reflection_calls.fetch_add(1, Ordering::SeqCst);
                (self.reflection)(&request, call).map(|text| ChatResponse::text_reply(model, text))
            }
            CallKind::Answer => (self.answer)(&request).map(|text| ChatResponse::text_reply(model, text)),
        }
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}

fn query_list(queries: &[&str]) -> String {
    json!({"query": queries, "rationale": "Scripted queries."}).to_string()
}

/// Answer that repeats every citation marker found in the prompt.
fn cite_everything(request: &ChatRequest) -> String {
    let prompt = request.messages.iter().map(|m| m.content.as_str()).collect::<Vec<_>>().join("\n");
    let pattern = format!(r"\[[^\]]*\]\({}[^)\s]*\)", regex::escape(SHORT_URL_PREFIX));
    let markers: Vec<&str> = Regex::new(&pattern)
        .map(|re| re.find_iter(&prompt).map(|m| m.as_str()).collect())
        .unwrap_or_default();
    let mut answer = String::from("Here is what the research found.");
    for marker in markers {
        answer.push(' ');
        answer.push_str(marker);
    }
    answer
}
