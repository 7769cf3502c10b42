//! Structured-output contracts the model must satisfy.
//!
//! Each contract is a serde type plus the JSON Schema sent to the provider.
//! Replies are validated against that schema with `jsonschema` before being
//! deserialized, so a reply that parses as JSON but has the wrong shape is
//! reported as [`AgentError::SchemaValidation`] with the offending paths.

use crate::error::{AgentError, Result};
use jsonschema::JSONSchema;
use llm::{ChatModel, ChatRequest};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// A type the model can be asked to produce as JSON.
pub trait StructuredOutput: DeserializeOwned {
    /// Schema name reported in requests and errors
    const NAME: &'static str;

    /// JSON Schema of the expected reply
    fn json_schema() -> Value;
}

/// Search queries proposed for a research topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQueryList {
    /// Queries to run against web search
    pub query: Vec<String>,

    /// Why these queries cover the topic
    pub rationale: String,
}

impl StructuredOutput for SearchQueryList {
    const NAME: &'static str = "SearchQueryList";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "A list of search queries to be used for web research."
                },
                "rationale": {
                    "type": "string",
                    "description": "A brief explanation of why these queries are relevant to the research topic."
                }
            },
            "required": ["query", "rationale"]
        })
    }
}

/// Verdict on whether gathered research answers the topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// The summaries are enough to answer the question
    pub is_sufficient: bool,

    /// Information that is missing or needs clarification
    pub knowledge_gap: String,

    /// Queries that would close the gap
    pub follow_up_queries: Vec<String>,
}

impl StructuredOutput for Reflection {
    const NAME: &'static str = "Reflection";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_sufficient": {
                    "type": "boolean",
                    "description": "Whether the provided summaries are sufficient to answer the user's question."
                },
                "knowledge_gap": {
                    "type": "string",
                    "description": "A description of what information is missing or needs clarification."
                },
                "follow_up_queries": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "A list of follow-up queries to address the knowledge gap."
                }
            },
            "required": ["is_sufficient", "knowledge_gap", "follow_up_queries"]
        })
    }
}

/// Parse and validate a model reply as `T`.
///
/// Tolerates a surrounding markdown code fence, which some models emit even
/// in JSON mode.
pub fn parse_structured<T: StructuredOutput>(text: &str) -> Result<T> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AgentError::schema(T::NAME, format!("reply is not valid JSON: {}", e)))?;

    validate_against_schema(T::NAME, &value, &T::json_schema())?;

    serde_json::from_value(value).map_err(|e| AgentError::schema(T::NAME, e.to_string()))
}

/// Send `request` with `T`'s schema attached and parse the reply.
pub async fn invoke_structured<T: StructuredOutput>(model: &dyn ChatModel, request: ChatRequest) -> Result<T> {
    let request = request.with_json_schema(T::NAME, T::json_schema());
    let response = model.chat(request).await?;
    debug!(schema = T::NAME, model = %response.model, "Received structured reply");

    parse_structured(response.text()).map_err(|e| {
        warn!(schema = T::NAME, error = %e, "Structured reply failed validation");
        e
    })
}

fn validate_against_schema(name: &str, value: &Value, schema: &Value) -> Result<()> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| AgentError::schema(name, format!("invalid schema: {}", e)))?;

    let errors = match compiled.validate(value) {
        Ok(()) => None,
        Err(errors) => Some(
            errors
                .map(|e| format!("{}: {}", e.instance_path, e))
                .collect::<Vec<String>>(),
        ),
    };

    match errors {
        None => Ok(()),
        Some(messages) => Err(AgentError::schema(name, messages.join("; "))),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
