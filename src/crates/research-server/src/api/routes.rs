//! API route definitions

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use research_agent::ResearchGraph;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::handlers;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub graph: Arc<ResearchGraph>,
}

impl AppState {
    pub fn new(graph: ResearchGraph) -> Self {
        Self { graph: Arc::new(graph) }
    }
}

/// Build the complete API router.
///
/// `frontend_dir` is mounted under `/app` when it holds an `index.html`.
pub fn create_router(state: AppState, frontend_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(handlers::health))
        .route("/runs/wait", post(handlers::runs_wait))
        .route("/runs/stream", post(handlers::runs_stream))
        .with_state(state);

    let router = match frontend_dir.and_then(frontend_index) {
        Some((dir, index)) => router.nest_service("/app", ServeDir::new(dir).fallback(ServeFile::new(index))),
        None => {
            warn!(
                dir = ?frontend_dir,
                "Frontend build not found, /app will answer 503"
            );
            router
                .route("/app", get(handlers::frontend_missing))
                .route("/app/*path", get(handlers::frontend_missing))
        }
    };

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn frontend_index(dir: &Path) -> Option<(PathBuf, PathBuf)> {
    let index = dir.join("index.html");
    index.is_file().then(|| (dir.to_path_buf(), index))
}
