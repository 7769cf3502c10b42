//! Research state and its reducers.
//!
//! A run owns one [`ResearchState`]. Steps never mutate it directly: each step
//! reads the state and returns a [`StateUpdate`], and the graph runtime merges
//! updates with [`ResearchState::apply`] once every task of a superstep has
//! finished. Each field has a fixed reducer:
//!
//! | Field | Reducer |
//! |-------|---------|
//! | `messages` | append |
//! | `pending_queries` | overwrite |
//! | `executed_queries` | append |
//! | `research_results` | append |
//! | `sources` | union by url |
//! | `loop_count` | overwrite |
//! | `last_reflection` | overwrite |
//! | `final_answer` | write once |

use crate::configuration::{Configuration, Effort};
use crate::graph::GraphError;
use crate::schemas::Reflection;
use llm::Message;
use serde::{Deserialize, Serialize};

/// Input of one research run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunInput {
    /// Conversation so far; the last human turn is the question
    pub messages: Vec<Message>,

    /// Overrides the configured number of initial queries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_search_query_count: Option<usize>,

    /// Overrides the configured loop ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_research_loops: Option<usize>,

    /// Overrides the reflection and answer models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_model: Option<String>,
}

impl RunInput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Single-question input.
    pub fn question(text: impl Into<String>) -> Self {
        Self::new(vec![Message::human(text)])
    }

    /// Set both counts from an effort preset.
    pub fn with_effort(mut self, effort: Effort) -> Self {
        let (queries, loops) = effort.counts();
        self.initial_search_query_count = Some(queries);
        self.max_research_loops = Some(loops);
        self
    }

    pub fn with_reasoning_model(mut self, model: impl Into<String>) -> Self {
        self.reasoning_model = Some(model.into());
        self
    }

    /// Reject inputs that cannot start a run.
    pub fn validate(&self) -> Result<(), GraphError> {
        if self.messages.is_empty() {
            return Err(GraphError::Validation("messages must not be empty".to_string()));
        }
        if self.initial_search_query_count == Some(0) {
            return Err(GraphError::Validation(
                "initial_search_query_count must be at least 1".to_string(),
            ));
        }
        if self.max_research_loops == Some(0) {
            return Err(GraphError::Validation("max_research_loops must be at least 1".to_string()));
        }
        if matches!(&self.reasoning_model, Some(model) if model.trim().is_empty()) {
            return Err(GraphError::Validation("reasoning_model must not be blank".to_string()));
        }
        Ok(())
    }
}

/// A web page cited by research text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Short display label derived from the page title
    pub label: String,

    /// Placeholder url used in research text
    pub short_url: String,

    /// Real page url
    #[serde(alias = "value")]
    pub url: String,

    /// Other placeholder urls that point at the same page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl Source {
    pub fn new(label: impl Into<String>, short_url: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            short_url: short_url.into(),
            url: url.into(),
            aliases: Vec::new(),
        }
    }

    /// The primary short url followed by its aliases.
    pub fn short_urls(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.short_url.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Sources keyed by real url, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceSet {
    items: Vec<Source>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a source, folding it into an existing entry with the same url.
    ///
    /// Returns `true` when the url was not present before.
    pub fn insert(&mut self, source: Source) -> bool {
        match self.items.iter_mut().find(|s| s.url == source.url) {
            Some(existing) => {
                for short in source.short_urls() {
                    if !existing.short_urls().any(|s| s == short) {
                        existing.aliases.push(short.to_string());
                    }
                }
                false
            }
            None => {
                self.items.push(source);
                true
            }
        }
    }

    pub fn extend(&mut self, sources: impl IntoIterator<Item = Source>) {
        for source in sources {
            self.insert(source);
        }
    }

    /// Find the source a placeholder url stands for.
    pub fn by_short_url(&self, short_url: &str) -> Option<&Source> {
        self.items.iter().find(|s| s.short_urls().any(|u| u == short_url))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Source> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[Source] {
        &self.items
    }
}

impl FromIterator<Source> for SourceSet {
    fn from_iter<I: IntoIterator<Item = Source>>(iter: I) -> Self {
        let mut set = SourceSet::new();
        set.extend(iter);
        set
    }
}

impl<'a> IntoIterator for &'a SourceSet {
    type Item = &'a Source;
    type IntoIter = std::slice::Iter<'a, Source>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Output of one web research task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchResult {
    pub task_id: usize,
    pub query: String,
    /// Research text with citation markers inserted
    pub text: String,
    /// Sources cited by `text`
    pub sources: Vec<Source>,
}

/// The answer produced by the finalizer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalAnswer {
    /// Answer text with real urls
    pub content: String,
    /// Sources cited in `content`
    pub sources: Vec<Source>,
    /// Placeholder urls in the raw answer that matched no known source
    pub unresolved_citations: Vec<String>,
}

/// State of one research run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchState {
    pub messages: Vec<Message>,
    pub pending_queries: Vec<String>,
    pub executed_queries: Vec<String>,
    pub research_results: Vec<ResearchResult>,
    pub sources: SourceSet,
    pub loop_count: usize,
    pub last_reflection: Option<Reflection>,
    pub initial_search_query_count: Option<usize>,
    pub max_research_loops: Option<usize>,
    pub reasoning_model: Option<String>,
    pub final_answer: Option<FinalAnswer>,
}

impl ResearchState {
    /// Initial state for a run.
    pub fn from_input(input: RunInput) -> Result<Self, GraphError> {
        input.validate()?;
        Ok(Self {
            messages: input.messages,
            initial_search_query_count: input.initial_search_query_count,
            max_research_loops: input.max_research_loops,
            reasoning_model: input.reasoning_model,
            ..Default::default()
        })
    }

    /// Number of queries for the first wave.
    pub fn initial_query_count(&self, config: &Configuration) -> usize {
        self.initial_search_query_count
            .unwrap_or(config.number_of_initial_queries)
    }

    /// Loop ceiling for this run.
    pub fn loop_ceiling(&self, config: &Configuration) -> usize {
        self.max_research_loops.unwrap_or(config.max_research_loops)
    }

    /// Research texts in task order.
    pub fn research_texts(&self) -> impl Iterator<Item = &str> {
        self.research_results.iter().map(|r| r.text.as_str())
    }

    /// Merge a step's partial update.
    pub fn apply(&mut self, update: StateUpdate) -> Result<(), GraphError> {
        if update.final_answer.is_some() && self.final_answer.is_some() {
            return Err(GraphError::State("final_answer is already set".to_string()));
        }

        self.messages.extend(update.messages);
        if let Some(pending) = update.pending_queries {
            self.pending_queries = pending;
        }
        self.executed_queries.extend(update.executed_queries);
        self.research_results.extend(update.research_results);
        self.sources.extend(update.sources);
        if let Some(loop_count) = update.loop_count {
            self.loop_count = loop_count;
        }
        if let Some(reflection) = update.last_reflection {
            self.last_reflection = Some(reflection);
        }
        if let Some(answer) = update.final_answer {
            self.final_answer = Some(answer);
        }
        Ok(())
    }
}

/// Partial update returned by a step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateUpdate {
    pub messages: Vec<Message>,
    pub pending_queries: Option<Vec<String>>,
    pub executed_queries: Vec<String>,
    pub research_results: Vec<ResearchResult>,
    pub sources: Vec<Source>,
    pub loop_count: Option<usize>,
    pub last_reflection: Option<Reflection>,
    pub final_answer: Option<FinalAnswer>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold several updates of one superstep into one, in order.
    pub fn merge(mut self, other: StateUpdate) -> Self {
        self.messages.extend(other.messages);
        if other.pending_queries.is_some() {
            self.pending_queries = other.pending_queries;
        }
        self.executed_queries.extend(other.executed_queries);
        self.research_results.extend(other.research_results);
        self.sources.extend(other.sources);
        if other.loop_count.is_some() {
            self.loop_count = other.loop_count;
        }
        if other.last_reflection.is_some() {
            self.last_reflection = other.last_reflection;
        }
        if other.final_answer.is_some() {
            self.final_answer = other.final_answer;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(short: &str, url: &str) -> Source {
        Source::new("label", short, url)
    }

    #[test]
    fn test_source_set_dedups_by_url_and_keeps_aliases() {
        let mut set = SourceSet::new();
        assert!(set.insert(source("https://s/id/0-0", "https://a.example")));
        assert!(!set.insert(source("https://s/id/3-1", "https://a.example")));
        assert!(!set.insert(source("https://s/id/0-0", "https://a.example")));
        assert!(set.insert(source("https://s/id/3-2", "https://b.example")));

        assert_eq!(set.len(), 2);
        let first = &set.as_slice()[0];
        assert_eq!(first.aliases, vec!["https://s/id/3-1"]);
        assert_eq!(set.by_short_url("https://s/id/3-1").unwrap().url, "https://a.example");
        assert!(set.by_short_url("https://s/id/9-9").is_none());
    }

    #[test]
    fn test_apply_reducers() {
        let mut state = ResearchState::from_input(RunInput::question("q")).unwrap();
        state
            .apply(StateUpdate {
                pending_queries: Some(vec!["a".into(), "b".into()]),
                ..Default::default()
            })
            .unwrap();
        state
            .apply(StateUpdate {
                pending_queries: Some(vec!["c".into()]),
                executed_queries: vec!["a".into()],
                loop_count: Some(1),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(state.pending_queries, vec!["c"]);
        assert_eq!(state.executed_queries, vec!["a"]);
        assert_eq!(state.loop_count, 1);
        assert_eq!(state.messages.len(), 1);
    }

    #[test]
    fn test_final_answer_is_write_once() {
        let answer = FinalAnswer {
            content: "done".into(),
            sources: vec![],
            unresolved_citations: vec![],
        };
        let mut state = ResearchState::default();
        state
            .apply(StateUpdate {
                final_answer: Some(answer.clone()),
                ..Default::default()
            })
            .unwrap();
        let err = state
            .apply(StateUpdate {
                final_answer: Some(answer),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, GraphError::State(_)));
    }

    #[test]
    fn test_input_validation() {
        assert!(RunInput::default().validate().is_err());
        let mut input = RunInput::question("q");
        input.max_research_loops = Some(0);
        assert!(matches!(input.validate(), Err(GraphError::Validation(_))));
        assert!(RunInput::question("q").with_effort(Effort::High).validate().is_ok());
    }

    #[test]
    fn test_overrides_fall_back_to_configuration() {
        let config = Configuration::default();
        let state = ResearchState::from_input(RunInput::question("q")).unwrap();
        assert_eq!(state.initial_query_count(&config), 3);
        assert_eq!(state.loop_ceiling(&config), 2);

        let state = ResearchState::from_input(RunInput::question("q").with_effort(Effort::Low)).unwrap();
        assert_eq!(state.initial_query_count(&config), 1);
        assert_eq!(state.loop_ceiling(&config), 1);
    }
}
