//! Terminal chat client for the research agent.
//!
//! `research ask` answers one question; `research chat` keeps a conversation
//! with a live activity timeline per turn. Ctrl-C stops listening to the
//! current run without leaving the chat.

pub mod args;
pub mod chat;
pub mod error;
pub mod render;
pub mod turn;

pub use args::{Cli, Commands, RunArgs};
pub use chat::{run_chat, ChatInput};
pub use error::{CliError, Result};
pub use render::Renderer;
pub use turn::{run_turn, TurnOutcome};
