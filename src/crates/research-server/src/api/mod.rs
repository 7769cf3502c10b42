//! REST API layer
//!
//! - `GET /health`
//! - `POST /runs/wait` and `POST /runs/stream` (Server-Sent Events)
//! - `GET /app/*` static front-end

pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use models::{HealthResponse, RunOutput, RunRequest};
pub use routes::{create_router, AppState};
