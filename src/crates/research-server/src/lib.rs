//! HTTP deployment surface for the research agent.
//!
//! Runs are stateless: every request carries its full message history and
//! gets a fresh run of the research graph.

pub mod api;
pub mod config;

pub use api::{create_router, AppState};
pub use config::ServerConfig;
