//! Server configuration
//!
//! Flags fall back to environment variables. The research configuration is
//! resolved as environment, then flags, then the optional TOML file, then
//! built-in defaults.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use llm::config::GEMINI_BASE_URL;
use llm::RemoteLlmConfig;
use research_agent::{ConfigOverrides, Configuration};
use tracing::info;

#[derive(Debug, Clone, Parser)]
#[command(name = "research-server")]
#[command(about = "HTTP API for the research agent", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 2024)]
    pub port: u16,

    /// Built front-end served under /app
    #[arg(long, env = "FRONTEND_DIR", default_value = "frontend/dist")]
    pub frontend_dir: PathBuf,

    /// Research configuration file (TOML)
    #[arg(long, env = "RESEARCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = GEMINI_BASE_URL)]
    pub base_url: String,

    /// Model for query generation
    #[arg(long)]
    pub query_generator_model: Option<String>,

    /// Model for reflection
    #[arg(long)]
    pub reflection_model: Option<String>,

    /// Model for the final answer
    #[arg(long)]
    pub answer_model: Option<String>,
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            query_generator_model: self.query_generator_model.clone(),
            reflection_model: self.reflection_model.clone(),
            answer_model: self.answer_model.clone(),
            ..Default::default()
        }
    }

    /// Load and resolve the research configuration.
    pub async fn research_configuration(&self) -> research_agent::Result<Configuration> {
        let config = Configuration::load(self.config.as_deref())
            .await?
            .resolve(&self.overrides())?;
        config.validate()?;
        info!(
            query_generator_model = %config.query_generator_model,
            reflection_model = %config.reflection_model,
            answer_model = %config.answer_model,
            initial_queries = config.number_of_initial_queries,
            max_loops = config.max_research_loops,
            "Research configuration resolved"
        );
        Ok(config)
    }

    /// Client settings for the Gemini API.
    pub fn llm_config(&self, default_model: &str) -> RemoteLlmConfig {
        RemoteLlmConfig::new(self.api_key.clone(), self.base_url.clone(), default_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let config = ServerConfig::try_parse_from([
            "research-server",
            "--host",
            "127.0.0.1",
            "--api-key",
            "test-key",
            "--port",
            "9000",
            "--answer-model",
            "gemini-2.5-flash",
        ])
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.addr().unwrap().port(), 9000);
        assert_eq!(config.overrides().answer_model.as_deref(), Some("gemini-2.5-flash"));
        assert!(config.overrides().reflection_model.is_none());
        assert_eq!(config.llm_config("m").base_url, config.base_url.trim_end_matches('/'));
    }
}
