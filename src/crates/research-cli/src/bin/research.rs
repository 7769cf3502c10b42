//! research - ask the research agent from the terminal

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use llm::remote::GeminiClient;
use llm::RemoteLlmConfig;
use research_agent::{ChatSession, ConfigOverrides, Configuration, ResearchGraph, RunInput};
use research_cli::{run_chat, run_turn, Cli, Commands, Renderer, TurnOutcome};
use serde_json::json;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let graph = build_graph(&cli).await?;

    match cli.command {
        Commands::Ask { question, json: true, run } => {
            let input = RunInput {
                reasoning_model: run.model.clone(),
                ..RunInput::question(question).with_effort(run.effort)
            };
            let state = graph.invoke(input).await?;
            let answer = state.final_answer.unwrap_or_default();
            let output = json!({
                "answer": answer.content,
                "sources": answer.sources,
                "unresolved_citations": answer.unresolved_citations,
                "research_loop_count": state.loop_count,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Commands::Ask { question, json: false, run } => {
            let mut renderer = Renderer::stdout();
            let mut session = ChatSession::new();
            renderer.question(&question)?;
            let input = session.submit(question, run.effort, run.model.clone());

            match run_turn(&graph, &mut session, input, &mut renderer, ctrl_c()).await? {
                TurnOutcome::Answered { .. } => {}
                TurnOutcome::Cancelled => bail!("Cancelled"),
                TurnOutcome::Failed(message) => bail!(message),
            }
        }
        Commands::Chat { run } => {
            let mut renderer = Renderer::stdout();
            let stdin = BufReader::new(tokio::io::stdin());
            run_chat(&graph, run, stdin, &mut renderer, ctrl_c).await?;
        }
    }

    Ok(())
}

async fn build_graph(cli: &Cli) -> anyhow::Result<ResearchGraph> {
    let config = Configuration::load(cli.config.as_deref())
        .await?
        .resolve(&ConfigOverrides::default())?;
    config.validate()?;

    let Some(api_key) = cli.api_key.clone() else {
        bail!("GEMINI_API_KEY is not set");
    };
    let client = GeminiClient::new(RemoteLlmConfig::new(
        api_key,
        cli.base_url.clone(),
        config.query_generator_model.clone(),
    ))
    .context("Failed to create Gemini client")?;

    Ok(ResearchGraph::new(Arc::new(client), config))
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
