//! Research server binary
//!
//! Serves the research API and the built front-end.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use llm::remote::GeminiClient;
use research_agent::ResearchGraph;
use research_server::{create_router, AppState, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::parse();
    let addr = config.addr().context("Invalid HOST/PORT")?;

    tracing::info!("Loading research configuration...");
    let research_config = config
        .research_configuration()
        .await
        .context("Failed to load research configuration")?;

    let client = GeminiClient::new(config.llm_config(&research_config.query_generator_model))
        .context("Failed to create Gemini client")?;
    let graph = ResearchGraph::new(Arc::new(client), research_config);

    tracing::info!("Building API router");
    let app = create_router(AppState::new(graph), Some(&config.frontend_dir));

    tracing::info!("Starting research server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Research server shut down gracefully");
    Ok(())
}

/// Signal for graceful shutdown (Ctrl-C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received CTRL-C signal, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down");
        }
    }
}
