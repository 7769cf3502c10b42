//! Core chat-model trait and request/response types.
//!
//! The research workflow is provider-agnostic: every step builds a
//! [`ChatRequest`] and hands it to an `Arc<dyn ChatModel>`. Implementations
//! convert the request to their wire format, call the API and map the answer
//! back to a [`ChatResponse`].
//!
//! Two request features matter to the workflow:
//!
//! - [`ResponseFormat::Json`] asks for a reply that is a single JSON document
//!   conforming to a schema (query lists, reflection verdicts).
//! - [`Tool::GoogleSearch`] enables the provider's search grounding; the
//!   response then carries [`GroundingMetadata`] describing which web pages
//!   support which spans of the answer.

use crate::error::Result;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Core trait for chat-based language models.
///
/// Implementations must be `Send + Sync`; the research graph shares one
/// client across concurrently running steps through `Arc<dyn ChatModel>`.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete chat response from messages.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`](crate::LlmError) for transport failures,
    /// authentication problems, rate limiting and malformed provider output.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Model used when a request does not name one.
    fn default_model(&self) -> &str;
}

/// Generation parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum number of tokens to generate.
    pub max_tokens: Option<usize>,
    /// Nucleus sampling.
    pub top_p: Option<f32>,
    /// Sequences that halt generation.
    #[serde(default)]
    pub stop_sequences: Vec<String>,
}

/// Shape of the reply the model must produce.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseFormat {
    /// Free text.
    #[default]
    Text,
    /// A single JSON document matching `schema` (standard JSON Schema).
    Json {
        /// Schema name, used in logs and errors.
        name: String,
        /// JSON Schema the reply must satisfy.
        schema: Value,
    },
}

/// Provider-side tools the model may invoke while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Web search grounding.
    GoogleSearch,
}

/// A request to a chat model.
///
/// # Example
///
/// ```rust
/// use llm::{ChatRequest, Message, Tool};
///
/// let request = ChatRequest::new(vec![Message::human("latest Rust release?")])
///     .with_model("gemini-2.0-flash")
///     .with_temperature(0.0)
///     .with_tool(Tool::GoogleSearch);
/// assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash"));
/// ```
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// The conversation messages to send to the model.
    pub messages: Vec<Message>,

    /// Model override; `None` uses the client's default model.
    pub model: Option<String>,

    /// Generation parameters.
    pub config: ChatConfig,

    /// Requested reply shape.
    pub response_format: ResponseFormat,

    /// Provider tools enabled for this request.
    pub tools: Vec<Tool>,
}

impl ChatRequest {
    /// Create a new chat request with the given messages.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            model: None,
            config: ChatConfig::default(),
            response_format: ResponseFormat::Text,
            tools: Vec::new(),
        }
    }

    /// Single-turn request built from one prompt.
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self::new(vec![Message::human(prompt)])
    }

    /// Use a specific model for this request.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the temperature for generation.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = Some(temperature);
        self
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = Some(max_tokens);
        self
    }

    /// Require a JSON reply matching `schema`.
    pub fn with_json_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.response_format = ResponseFormat::Json {
            name: name.into(),
            schema,
        };
        self
    }

    /// Enable a provider tool.
    pub fn with_tool(mut self, tool: Tool) -> Self {
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

/// A web page the model consulted while grounding its answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebChunk {
    pub uri: String,
    #[serde(default)]
    pub title: Option<String>,
}

/// One grounding source. Only web sources are produced by search grounding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default)]
    pub web: Option<WebChunk>,
}

/// Span of the answer text supported by one or more chunks.
///
/// Offsets are UTF-8 byte offsets into the answer text. Providers omit
/// `start_index` when it is zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    #[serde(default)]
    pub start_index: Option<usize>,
    #[serde(default)]
    pub end_index: Option<usize>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Links a [`Segment`] to the chunks that support it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingSupport {
    #[serde(default)]
    pub segment: Option<Segment>,
    #[serde(default)]
    pub grounding_chunk_indices: Vec<usize>,
}

/// Search grounding attached to a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroundingMetadata {
    #[serde(default)]
    pub web_search_queries: Vec<String>,
    #[serde(default)]
    pub grounding_chunks: Vec<GroundingChunk>,
    #[serde(default)]
    pub grounding_supports: Vec<GroundingSupport>,
}

/// A complete chat response.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// The assistant's message.
    pub message: Message,

    /// Model that produced the response.
    pub model: String,

    /// Token usage, when reported.
    pub usage: Option<UsageMetadata>,

    /// Search grounding, present when a grounding tool was used.
    pub grounding: Option<GroundingMetadata>,

    /// Provider finish reason.
    pub finish_reason: Option<String>,
}

impl ChatResponse {
    /// Convenience constructor for a plain text reply.
    pub fn text_reply(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            message: Message::assistant(text),
            model: model.into(),
            usage: None,
            grounding: None,
            finish_reason: None,
        }
    }

    /// Attach grounding metadata.
    pub fn with_grounding(mut self, grounding: GroundingMetadata) -> Self {
        self.grounding = Some(grounding);
        self
    }

    /// The reply text.
    pub fn text(&self) -> &str {
        self.message.text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let request = ChatRequest::from_prompt("q")
            .with_temperature(1.0)
            .with_tool(Tool::GoogleSearch)
            .with_tool(Tool::GoogleSearch)
            .with_json_schema("Reflection", json!({"type": "object"}));

        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.config.temperature, Some(1.0));
        assert_eq!(request.tools, vec![Tool::GoogleSearch]);
        assert!(matches!(request.response_format, ResponseFormat::Json { ref name, .. } if name == "Reflection"));
    }

    #[test]
    fn test_grounding_metadata_from_wire() {
        let raw = json!({
            "webSearchQueries": ["euro 2024 top scorer"],
            "groundingChunks": [
                {"web": {"uri": "https://a.example/1", "title": "uefa.com"}},
                {}
            ],
            "groundingSupports": [
                {"segment": {"endIndex": 12, "text": "Harry Kane"}, "groundingChunkIndices": [0]}
            ]
        });
        let meta: GroundingMetadata = serde_json::from_value(raw).unwrap();
        assert_eq!(meta.grounding_chunks.len(), 2);
        assert!(meta.grounding_chunks[1].web.is_none());
        let segment = meta.grounding_supports[0].segment.as_ref().unwrap();
        assert_eq!(segment.start_index, None);
        assert_eq!(segment.end_index, Some(12));
    }
}
