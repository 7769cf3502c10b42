//! API error types and HTTP response conversion
//!
//! Maps graph and agent failures onto HTTP status codes and a uniform JSON
//! error body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use research_agent::{AgentError, GraphError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API error response structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Error type identifier
    pub error: String,
    /// Human-readable error message
    pub message: String,
    /// Error code for programmatic handling
    pub code: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            code: code.into(),
        }
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request data
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid run parameters
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Model provider rejected or failed the call
    #[error("Upstream error: {0}")]
    UpstreamError(String),

    /// Model output did not match the expected schema
    #[error("Invalid model output: {0}")]
    InvalidModelOutput(String),

    /// Front-end assets are missing
    #[error("{0}")]
    ServiceUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UpstreamError(_) | ApiError::InvalidModelOutput(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code identifier
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::UpstreamError(_) => "UPSTREAM_ERROR",
            ApiError::InvalidModelOutput(_) => "INVALID_MODEL_OUTPUT",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Get the error type name
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::UpstreamError(_) => "UpstreamError",
            ApiError::InvalidModelOutput(_) => "InvalidModelOutput",
            ApiError::ServiceUnavailable(_) => "ServiceUnavailable",
            ApiError::InternalError(_) => "InternalError",
        }
    }

    /// JSON body for this error.
    pub fn body(&self) -> ApiErrorResponse {
        ApiErrorResponse::new(self.error_type(), self.to_string(), self.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.body();

        if status.is_server_error() {
            tracing::error!(code = %body.code, message = %body.message, "API error");
        } else {
            tracing::debug!(code = %body.code, message = %body.message, "API request rejected");
        }

        (status, Json(body)).into_response()
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        match &err {
            GraphError::Validation(msg) => ApiError::ValidationError(msg.clone()),
            GraphError::NodeExecution { error, .. } => match error {
                AgentError::SchemaValidation { .. } => ApiError::InvalidModelOutput(err.to_string()),
                AgentError::Llm(_) => ApiError::UpstreamError(err.to_string()),
                AgentError::Config(_) => ApiError::InternalError(err.to_string()),
            },
            GraphError::State(_) | GraphError::RecursionLimit { .. } | GraphError::Cancelled => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm::LlmError;

    #[test]
    fn test_validation_error() {
        let err = ApiError::from(GraphError::Validation("messages must not be empty".to_string()));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), "VALIDATION_ERROR");
        assert_eq!(err.error_type(), "ValidationError");
    }

    #[test]
    fn test_node_failures_map_to_bad_gateway() {
        let llm = GraphError::node_execution(
            "web_research",
            AgentError::Llm(LlmError::RateLimitExceeded("quota".to_string())),
        );
        let err = ApiError::from(llm);
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "UPSTREAM_ERROR");

        let schema = GraphError::node_execution("reflection", AgentError::schema("Reflection", "missing field"));
        assert_eq!(ApiError::from(schema).code(), "INVALID_MODEL_OUTPUT");
    }

    #[test]
    fn test_internal_errors() {
        let err = ApiError::from(GraphError::RecursionLimit { limit: 64 });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_body_carries_message() {
        let err = ApiError::ServiceUnavailable("Frontend not built.".to_string());
        let body = err.body();
        assert_eq!(body.error, "ServiceUnavailable");
        assert_eq!(body.message, "Frontend not built.");
        assert_eq!(body.code, "SERVICE_UNAVAILABLE");
    }
}
