//! Command-line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use llm::config::GEMINI_BASE_URL;
use research_agent::Effort;

#[derive(Debug, Parser)]
#[command(name = "research")]
#[command(about = "Research questions on the web and get cited answers", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Research configuration file (TOML)
    #[arg(long, global = true, env = "RESEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Gemini API base URL
    #[arg(long, global = true, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    pub base_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer one question and exit
    Ask {
        /// The question to research
        question: String,

        /// Print the final output as JSON instead of rendering it
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Interactive chat session
    Chat {
        #[command(flatten)]
        run: RunArgs,
    },
}

/// Per-run settings shared by `ask` and `chat`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Research effort: low, medium or high
    #[arg(short, long, default_value = "medium")]
    pub effort: Effort,

    /// Reasoning model for reflection and the final answer
    #[arg(short, long)]
    pub model: Option<String>,
}
