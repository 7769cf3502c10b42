//! HTTP request handlers

pub mod frontend;
pub mod health;
pub mod runs;

pub use frontend::{frontend_missing, FRONTEND_NOT_BUILT};
pub use health::health;
pub use runs::{runs_stream, runs_wait};
