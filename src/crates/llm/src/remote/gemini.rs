//! Google Gemini client implementation.
//!
//! Talks to the Generative Language REST API (`models/{model}:generateContent`).
//! Besides plain chat it supports the two capabilities the research workflow
//! relies on:
//!
//! - `Tool::GoogleSearch` is sent as the `googleSearch` tool; the candidate's
//!   `groundingMetadata` is surfaced as [`GroundingMetadata`].
//! - `ResponseFormat::Json` sets `responseMimeType: application/json` and a
//!   `responseSchema`, converted from standard JSON Schema to the OpenAPI
//!   subset Gemini accepts.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::remote::GeminiClient;
//! use llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//!
//! let config = RemoteLlmConfig::from_env(
//!     "GEMINI_API_KEY",
//!     "https://generativelanguage.googleapis.com/v1beta",
//!     "gemini-2.0-flash",
//! )?;
//! let client = GeminiClient::new(config)?;
//!
//! let response = client.chat(ChatRequest::new(vec![Message::human("Hello!")])).await?;
//! ```

use crate::chat::{
    ChatModel, ChatRequest, ChatResponse, GroundingMetadata, ResponseFormat, Tool, UsageMetadata,
};
use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::message::{Message, MessageRole};
use crate::retry::{invalid_response, with_retry, RetryConfig};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Google Gemini API client.
#[derive(Clone)]
pub struct GeminiClient {
    config: RemoteLlmConfig,
    retry: RetryConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new Gemini client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;
        let retry = RetryConfig::with_max_retries(config.max_retries);

        Ok(Self {
            config,
            retry,
            client,
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Convert messages to Gemini contents.
    ///
    /// System messages are lifted into `systemInstruction`; the remaining
    /// turns keep their order with roles `user` and `model`.
    fn convert_messages(&self, messages: &[Message]) -> (Option<GeminiContent>, Vec<GeminiContent>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                MessageRole::System => system_parts.push(GeminiPart::text(&msg.content)),
                MessageRole::Human => contents.push(GeminiContent {
                    role: Some("user".to_string()),
                    parts: vec![GeminiPart::text(&msg.content)],
                }),
                MessageRole::Assistant => contents.push(GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![GeminiPart::text(&msg.content)],
                }),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(GeminiContent {
                role: None,
                parts: system_parts,
            })
        };

        (system_instruction, contents)
    }

    fn build_request(&self, request: &ChatRequest) -> GeminiRequest {
        let (system_instruction, contents) = self.convert_messages(&request.messages);

        let (response_mime_type, response_schema) = match &request.response_format {
            ResponseFormat::Text => (None, None),
            ResponseFormat::Json { schema, .. } => (
                Some("application/json".to_string()),
                Some(to_gemini_schema(schema)),
            ),
        };

        let generation_config = GeminiGenerationConfig {
            temperature: request.config.temperature,
            max_output_tokens: request.config.max_tokens,
            top_p: request.config.top_p,
            stop_sequences: if request.config.stop_sequences.is_empty() {
                None
            } else {
                Some(request.config.stop_sequences.clone())
            },
            response_mime_type,
            response_schema,
        };

        let tools = request
            .tools
            .iter()
            .map(|tool| match tool {
                Tool::GoogleSearch => GeminiTool {
                    google_search: Map::new(),
                },
            })
            .collect();

        GeminiRequest {
            contents,
            system_instruction,
            tools,
            generation_config: Some(generation_config),
        }
    }

    /// Convert Gemini response to ChatResponse.
    fn convert_response(&self, model: &str, gemini_resp: GeminiResponse) -> Result<ChatResponse> {
        let candidate = gemini_resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| invalid_response("Gemini returned no candidates"))?;

        let content_text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let usage = gemini_resp
            .usage_metadata
            .map(|u| UsageMetadata::new(u.prompt_token_count, u.candidates_token_count));

        Ok(ChatResponse {
            message: Message::assistant(content_text),
            model: model.to_string(),
            usage,
            grounding: candidate.grounding_metadata,
            finish_reason: candidate.finish_reason,
        })
    }

    async fn send(&self, url: &str, body: &[u8]) -> Result<GeminiResponse> {
        // Gemini uses API key as query parameter
        let response = self
            .client
            .post(url)
            .query(&[("key", &self.config.api_key)])
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::HttpError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status("Gemini", status, error_text));
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        // Gemini API URL format: base_url/models/{model}:generateContent
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        // Encoded once and reused by every retry attempt.
        let body = serde_json::to_vec(&self.build_request(&request))?;

        debug!(
            model = %model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            structured = matches!(request.response_format, ResponseFormat::Json { .. }),
            "Sending Gemini request"
        );

        let gemini_resp = with_retry(&self.retry, "gemini.generateContent", || self.send(&url, &body)).await?;
        self.convert_response(&model, gemini_resp)
    }

    fn default_model(&self) -> &str {
        &self.config.model
    }
}

/// Convert a standard JSON Schema into Gemini's `responseSchema` dialect.
///
/// Gemini expects upper-case type names and rejects keywords outside its
/// OpenAPI subset, so those are dropped.
pub fn to_gemini_schema(schema: &Value) -> Value {
    const SUPPORTED: &[&str] = &[
        "type",
        "format",
        "description",
        "nullable",
        "enum",
        "properties",
        "required",
        "items",
        "minItems",
        "maxItems",
        "propertyOrdering",
    ];

    match schema {
        Value::Object(obj) => {
            let mut out = Map::new();
            for (key, value) in obj {
                if !SUPPORTED.contains(&key.as_str()) {
                    continue;
                }
                let converted = match key.as_str() {
                    "type" => match value {
                        Value::String(t) => Value::String(t.to_uppercase()),
                        other => other.clone(),
                    },
                    "properties" => match value {
                        Value::Object(props) => Value::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                .collect(),
                        ),
                        other => other.clone(),
                    },
                    "items" => to_gemini_schema(value),
                    _ => value.clone(),
                };
                out.insert(key.clone(), converted);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

impl GeminiPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    google_search: Map<String, Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> GeminiClient {
        let config = RemoteLlmConfig::new(
            "test-key",
            "https://generativelanguage.googleapis.com/v1beta",
            "gemini-2.0-flash",
        );
        GeminiClient::new(config).unwrap()
    }

    #[test]
    fn test_message_conversion() {
        let client = client();
        let messages = vec![
            Message::system("You are helpful"),
            Message::human("Hello"),
            Message::assistant("Hi there"),
        ];

        let (system, contents) = client.convert_messages(&messages);

        let system = system.unwrap();
        assert_eq!(system.parts[0].text.as_deref(), Some("You are helpful"));
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role.as_deref(), Some("user"));
        assert_eq!(contents[1].role.as_deref(), Some("model"));
    }

    #[test]
    fn test_request_with_search_and_schema() {
        let client = client();
        let request = ChatRequest::from_prompt("research this")
            .with_temperature(0.0)
            .with_tool(Tool::GoogleSearch)
            .with_json_schema(
                "SearchQueryList",
                json!({
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {"query": {"type": "array", "items": {"type": "string"}}},
                    "required": ["query"]
                }),
            );

        let body = serde_json::to_value(client.build_request(&request)).unwrap();

        assert_eq!(body["tools"], json!([{"googleSearch": {}}]));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.0));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        let schema = &body["generationConfig"]["responseSchema"];
        assert_eq!(schema["type"], "OBJECT");
        assert_eq!(schema["properties"]["query"]["items"]["type"], "STRING");
        assert!(schema.get("additionalProperties").is_none());
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn test_response_conversion_with_grounding() {
        let client = client();
        let raw = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Harry Kane "}, {"text": "scored 3."}]},
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [{"web": {"uri": "https://uefa.example/x", "title": "uefa.com"}}],
                    "groundingSupports": [{"segment": {"endIndex": 10}, "groundingChunkIndices": [0]}]
                }
            }],
            "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
        });
        let resp: GeminiResponse = serde_json::from_value(raw).unwrap();

        let chat = client.convert_response("gemini-2.0-flash", resp).unwrap();
        assert_eq!(chat.text(), "Harry Kane scored 3.");
        assert_eq!(chat.finish_reason.as_deref(), Some("STOP"));
        assert_eq!(chat.usage.unwrap().total_tokens, 15);
        let grounding = chat.grounding.unwrap();
        assert_eq!(grounding.grounding_chunks.len(), 1);
        assert_eq!(grounding.grounding_supports[0].grounding_chunk_indices, vec![0]);
    }

    #[test]
    fn test_empty_candidates_is_invalid_response() {
        let client = client();
        let resp: GeminiResponse = serde_json::from_value(json!({"candidates": []})).unwrap();
        let err = client.convert_response("gemini-2.0-flash", resp).unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
