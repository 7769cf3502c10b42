//! Workflow steps.
//!
//! Every step is an async function of a read-only [`ResearchState`] (plus,
//! for web research, its task) that returns a [`StateUpdate`]. Steps share a
//! [`ResearchContext`] holding the model client and resolved configuration.
//!
//! [`ResearchState`]: crate::state::ResearchState
//! [`StateUpdate`]: crate::state::StateUpdate

mod finalize_answer;
mod generate_query;
mod reflection;
mod web_research;

pub use finalize_answer::finalize_answer;
pub use generate_query::generate_query;
pub use reflection::reflection;
pub use web_research::{web_research, WebSearchTask};

use crate::configuration::Configuration;
use crate::utils::current_date;
use llm::ChatModel;
use std::sync::Arc;

/// Shared dependencies of the workflow steps.
#[derive(Clone)]
pub struct ResearchContext {
    model: Arc<dyn ChatModel>,
    config: Configuration,
    date: Option<String>,
}

impl ResearchContext {
    pub fn new(model: Arc<dyn ChatModel>, config: Configuration) -> Self {
        Self {
            model,
            config,
            date: None,
        }
    }

    /// Pin the date used in prompts.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn model(&self) -> &dyn ChatModel {
        self.model.as_ref()
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Date written into prompts.
    pub fn current_date(&self) -> String {
        self.date.clone().unwrap_or_else(current_date)
    }
}

impl std::fmt::Debug for ResearchContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResearchContext")
            .field("model", &self.model.default_model())
            .field("config", &self.config)
            .field("date", &self.date)
            .finish()
    }
}
