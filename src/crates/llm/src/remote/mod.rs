//! Remote LLM provider implementations.
//!
//! # Providers
//!
//! - **Gemini** - Google's Gemini models, with Google Search grounding and
//!   schema-constrained JSON output

pub mod gemini;

pub use gemini::GeminiClient;
