//! Fallback for the front-end mount when no build is present

use crate::api::error::ApiError;

/// Message returned while the front-end build is missing.
pub const FRONTEND_NOT_BUILT: &str = "Frontend not built. Run 'npm run build' in the frontend directory.";

/// Handler for GET /app/* without a front-end build
pub async fn frontend_missing() -> ApiError {
    ApiError::ServiceUnavailable(FRONTEND_NOT_BUILT.to_string())
}
