//! Interactive chat loop
//!
//! Lines starting with `/` are commands:
//!
//! - `/effort low|medium|high` changes the effort for later turns
//! - `/model <name>` sets the reasoning model, `/model` clears it
//! - `/timeline` expands the research steps behind the last answer
//! - `/reset` starts a new session
//! - `/quit` exits
//!
//! Anything else is a question. After a failed turn the session shows an
//! error screen; the next input resets it.

use std::future::Future;
use std::io::Write;

use research_agent::{ChatSession, Effort, ProcessedEvent, ResearchGraph};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::info;

use crate::args::RunArgs;
use crate::error::Result;
use crate::render::Renderer;
use crate::turn::{run_turn, TurnOutcome};

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Question(String),
    Effort(Effort),
    Model(Option<String>),
    Timeline,
    Reset,
    Quit,
    Empty,
    Invalid(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return ChatInput::Question(line.to_string());
        };

        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "quit" | "exit" => ChatInput::Quit,
            "reset" => ChatInput::Reset,
            "timeline" => ChatInput::Timeline,
            "effort" => match arg.parse() {
                Ok(effort) => ChatInput::Effort(effort),
                Err(e) => ChatInput::Invalid(format!("{}", e)),
            },
            "model" if arg.is_empty() => ChatInput::Model(None),
            "model" => ChatInput::Model(Some(arg.to_string())),
            other => ChatInput::Invalid(format!("unknown command '/{}'", other)),
        }
    }
}

/// Run the chat loop until `/quit` or end of input.
///
/// `cancel` builds the future that stops the current turn, typically Ctrl-C.
pub async fn run_chat<R, W, F, C>(
    graph: &ResearchGraph,
    mut settings: RunArgs,
    input: R,
    renderer: &mut Renderer<W>,
    cancel: F,
) -> Result<ChatSession>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    F: Fn() -> C,
    C: Future<Output = ()>,
{
    let mut session = ChatSession::new();
    let mut lines = input.lines();
    renderer.info(&format!(
        "Research chat ({} effort). Type /quit to exit.",
        settings.effort
    ))?;

    loop {
        renderer.prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let parsed = ChatInput::parse(&line);

        if session.error().is_some() && parsed != ChatInput::Quit {
            session.reset();
            renderer.info("Session reset.")?;
        }

        match parsed {
            ChatInput::Quit => break,
            ChatInput::Empty => {}
            ChatInput::Reset => {
                session.reset();
                renderer.info("Session reset.")?;
            }
            ChatInput::Effort(effort) => {
                settings.effort = effort;
                renderer.info(&format!("Effort set to {}.", effort))?;
            }
            ChatInput::Model(model) => {
                renderer.info(&match &model {
                    Some(name) => format!("Reasoning model set to {}.", name),
                    None => "Reasoning model reset to the configured default.".to_string(),
                })?;
                settings.model = model;
            }
            ChatInput::Timeline => match last_timeline(&session) {
                Some(timeline) => renderer.timeline(timeline)?,
                None => renderer.info("No answered question yet.")?,
            },
            ChatInput::Invalid(message) => renderer.warning(&message)?,
            ChatInput::Question(text) => {
                renderer.question(&text)?;
                let run_input = session.submit(text, settings.effort, settings.model.clone());
                let outcome = run_turn(graph, &mut session, run_input, renderer, cancel()).await?;
                if outcome == TurnOutcome::Cancelled {
                    renderer.warning("Stopped listening to the current run.")?;
                }
            }
        }
    }

    info!(messages = session.messages().len(), "Chat session ended");
    Ok(session)
}

/// Timeline snapshotted onto the most recent answer.
fn last_timeline(session: &ChatSession) -> Option<&[ProcessedEvent]> {
    session
        .messages()
        .iter()
        .rev()
        .find(|message| message.is_assistant())
        .and_then(|message| message.id.as_deref())
        .and_then(|id| session.timeline_for(id))
}
