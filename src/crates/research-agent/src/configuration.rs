//! Run configuration for the research workflow.
//!
//! Values are resolved in this order, later sources winning:
//!
//! 1. Built-in defaults
//! 2. An optional TOML file
//! 3. Per-invocation overrides ([`ConfigOverrides`])
//! 4. Environment variables named after the upper-cased field
//!    (`QUERY_GENERATOR_MODEL`, `MAX_RESEARCH_LOOPS`, ...)
//!
//! The state-level overrides carried by a run input (`initial_search_query_count`,
//! `max_research_loops`, `reasoning_model`) are applied on top of the resolved
//! configuration by the workflow steps themselves.

use crate::error::{AgentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Models and loop bounds used by one research run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Model used for query generation and grounded web research
    pub query_generator_model: String,

    /// Model used for reflection over gathered research
    pub reflection_model: String,

    /// Model used to compose the final answer
    pub answer_model: String,

    /// Number of search queries generated for the first wave
    pub number_of_initial_queries: usize,

    /// Maximum number of research/reflect cycles
    pub max_research_loops: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            query_generator_model: "gemini-2.0-flash".to_string(),
            reflection_model: "gemini-2.5-flash".to_string(),
            answer_model: "gemini-2.5-pro".to_string(),
            number_of_initial_queries: 3,
            max_research_loops: 2,
        }
    }
}

/// Per-invocation configuration overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_generator_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_initial_queries: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_research_loops: Option<usize>,
}

impl Configuration {
    /// Parse a configuration from TOML; missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AgentError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Load a configuration file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| AgentError::Config(format!("Failed to read config {}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded research configuration");
        Ok(config)
    }

    /// Defaults, then the file at `path` if one is given.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => Ok(Self::default()),
        }
    }

    /// Apply per-invocation overrides, then the process environment.
    pub fn resolve(self, overrides: &ConfigOverrides) -> Result<Self> {
        self.resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Like [`resolve`](Self::resolve) with an explicit environment lookup.
    pub fn resolve_with<F>(mut self, overrides: &ConfigOverrides, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = &overrides.query_generator_model {
            self.query_generator_model = model.clone();
        }
        if let Some(model) = &overrides.reflection_model {
            self.reflection_model = model.clone();
        }
        if let Some(model) = &overrides.answer_model {
            self.answer_model = model.clone();
        }
        if let Some(n) = overrides.number_of_initial_queries {
            self.number_of_initial_queries = n;
        }
        if let Some(n) = overrides.max_research_loops {
            self.max_research_loops = n;
        }

        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());
        if let Some(model) = env("QUERY_GENERATOR_MODEL") {
            self.query_generator_model = model;
        }
        if let Some(model) = env("REFLECTION_MODEL") {
            self.reflection_model = model;
        }
        if let Some(model) = env("ANSWER_MODEL") {
            self.answer_model = model;
        }
        if let Some(raw) = env("NUMBER_OF_INITIAL_QUERIES") {
            self.number_of_initial_queries = parse_count("NUMBER_OF_INITIAL_QUERIES", &raw)?;
        }
        if let Some(raw) = env("MAX_RESEARCH_LOOPS") {
            self.max_research_loops = parse_count("MAX_RESEARCH_LOOPS", &raw)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject configurations that cannot drive a run.
    pub fn validate(&self) -> Result<()> {
        if self.number_of_initial_queries == 0 {
            return Err(AgentError::Config("number_of_initial_queries must be at least 1".to_string()));
        }
        if self.max_research_loops == 0 {
            return Err(AgentError::Config("max_research_loops must be at least 1".to_string()));
        }
        for (name, model) in [
            ("query_generator_model", &self.query_generator_model),
            ("reflection_model", &self.reflection_model),
            ("answer_model", &self.answer_model),
        ] {
            if model.trim().is_empty() {
                return Err(AgentError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize> {
    raw.trim().parse::<usize>().map_err(|_| {
        warn!(key = %key, value = %raw, "Malformed numeric environment override");
        AgentError::Config(format!("{} must be a non-negative integer, got '{}'", key, raw))
    })
}

/// Research effort presets offered by the chat front-ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    #[default]
    Medium,
    High,
}

impl Effort {
    pub const ALL: [Effort; 3] = [Effort::Low, Effort::Medium, Effort::High];

    /// `(initial_search_query_count, max_research_loops)` for this preset.
    pub fn counts(self) -> (usize, usize) {
        match self {
            Effort::Low => (1, 1),
            Effort::Medium => (3, 3),
            Effort::High => (5, 10),
        }
    }

    pub fn initial_search_query_count(self) -> usize {
        self.counts().0
    }

    pub fn max_research_loops(self) -> usize {
        self.counts().1
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Effort::Low => "low",
            Effort::Medium => "medium",
            Effort::High => "high",
        };
        f.write_str(name)
    }
}

impl FromStr for Effort {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Effort::Low),
            "medium" => Ok(Effort::Medium),
            "high" => Ok(Effort::High),
            other => Err(AgentError::Config(format!(
                "unknown effort '{}', expected low, medium or high",
                other
            ))),
        }
    }
}
