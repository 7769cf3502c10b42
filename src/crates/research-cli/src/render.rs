//! Terminal rendering of timelines and answers

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use research_agent::{ProcessedEvent, Source};

use crate::error::Result;

/// Writes chat output, with a spinner while a run is in flight.
pub struct Renderer<W: Write> {
    out: W,
    spinner: Option<ProgressBar>,
    animate: bool,
}

impl Renderer<std::io::Stdout> {
    /// Render to stdout with an animated spinner.
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
            spinner: None,
            animate: true,
        }
    }
}

impl<W: Write> Renderer<W> {
    /// Render to any writer without a spinner.
    pub fn plain(out: W) -> Self {
        Self {
            out,
            spinner: None,
            animate: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn question(&mut self, text: &str) -> Result<()> {
        writeln!(self.out, "\n{} {}", "You:".bold().cyan(), text)?;
        Ok(())
    }

    /// Start the in-flight indicator.
    pub fn start(&mut self) {
        if !self.animate {
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.yellow} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message("Researching...");
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    /// One live timeline entry.
    pub fn event(&mut self, event: &ProcessedEvent) -> Result<()> {
        let line = event_line(event);
        match &self.spinner {
            Some(spinner) => {
                spinner.println(line);
                spinner.set_message(format!("{}...", event.title));
            }
            None => writeln!(self.out, "{}", line)?,
        }
        Ok(())
    }

    /// Stop the in-flight indicator.
    pub fn stop(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn answer(&mut self, content: &str, sources: &[Source]) -> Result<()> {
        self.stop();
        writeln!(self.out, "\n{}\n{}", "Answer:".bold().green(), content)?;
        if !sources.is_empty() {
            writeln!(self.out, "\n{}", "Sources".bold().underline())?;
            for source in sources {
                writeln!(self.out, "  {} {}", format!("[{}]", source.label).cyan(), source.url)?;
            }
        }
        Ok(())
    }

    /// Collapsed timeline stored with a completed answer.
    pub fn timeline_summary(&mut self, timeline: &[ProcessedEvent]) -> Result<()> {
        writeln!(
            self.out,
            "{}",
            format!("Research: {} steps (/timeline to expand)", timeline.len()).dimmed()
        )?;
        Ok(())
    }

    /// Expanded timeline stored with a completed answer.
    pub fn timeline(&mut self, timeline: &[ProcessedEvent]) -> Result<()> {
        writeln!(self.out, "\n{}", "Research timeline".bold().underline())?;
        for event in timeline {
            writeln!(self.out, "{}", event_line(event))?;
        }
        Ok(())
    }

    pub fn warning(&mut self, message: &str) -> Result<()> {
        self.stop();
        writeln!(self.out, "{} {}", "⚠".yellow(), message)?;
        Ok(())
    }

    /// Error screen shown after a failed turn.
    pub fn error_screen(&mut self, message: &str) -> Result<()> {
        self.stop();
        writeln!(self.out, "\n{}", "Error".red().bold())?;
        writeln!(self.out, "{}", message.red())?;
        writeln!(self.out, "{}", "Press Enter to retry with a new session, or type /quit.".dimmed())?;
        Ok(())
    }

    pub fn info(&mut self, message: &str) -> Result<()> {
        writeln!(self.out, "{}", message.dimmed())?;
        Ok(())
    }

    pub fn prompt(&mut self) -> Result<()> {
        write!(self.out, "{} ", ">".bold())?;
        self.out.flush()?;
        Ok(())
    }
}

fn event_line(event: &ProcessedEvent) -> String {
    format!("  {} {}", format!("{}:", event.title).yellow().bold(), event.data.dimmed())
}
