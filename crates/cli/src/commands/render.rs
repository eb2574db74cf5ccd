//! Terminal rendering of a running turn.

use std::future::Future;
use std::io::{self, Write};

use repoloop_agent::{AgentStreamEvent, TurnOutcome};
use repoloop_core::error::Error;
use tokio::sync::mpsc::UnboundedReceiver;

/// Tool output lines shown before the rest is elided.
const PREVIEW_LINES: usize = 20;

const ASSISTANT_PREFIX: &str = "  Assistant > ";

/// How a driven turn ended.
pub enum TurnEnd {
    Finished(Result<TurnOutcome, Error>),
    /// Ctrl+C; the conversation holds whatever was committed before it.
    Cancelled,
}

/// Writes turn events as a transcript.
pub struct Renderer<W: Write> {
    out: W,
    mid_line: bool,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            mid_line: false,
        }
    }

    pub fn render(&mut self, event: AgentStreamEvent) -> io::Result<()> {
        match event {
            AgentStreamEvent::Chunk { content } => {
                if !self.mid_line {
                    write!(self.out, "{ASSISTANT_PREFIX}")?;
                    self.mid_line = true;
                }
                write!(self.out, "{content}")?;
                self.out.flush()?;
            }
            AgentStreamEvent::Completion { content, streamed } => {
                if streamed {
                    self.finish_line()?;
                } else {
                    for line in content.lines() {
                        writeln!(self.out, "{ASSISTANT_PREFIX}{line}")?;
                    }
                }
            }
            AgentStreamEvent::CommandStarted { command } => {
                self.finish_line()?;
                writeln!(self.out, "  [Running] {command}")?;
            }
            AgentStreamEvent::CommandFinished {
                command,
                output,
                success,
            } => {
                if success {
                    writeln!(self.out, "{}", preview(&output))?;
                } else {
                    let reason = output.strip_prefix("Error: ").unwrap_or(&output);
                    writeln!(self.out, "  [Failed] {command}: {reason}")?;
                }
            }
            AgentStreamEvent::CommandRejected { command, reason } => {
                self.finish_line()?;
                writeln!(self.out, "  [Rejected] {command}: {reason}")?;
            }
            AgentStreamEvent::Done {
                iterations,
                commands_dispatched,
            } => {
                tracing::debug!(iterations, commands_dispatched, "Turn done");
            }
        }
        Ok(())
    }

    /// Terminate a partially streamed line.
    pub fn finish_line(&mut self) -> io::Result<()> {
        if self.mid_line {
            writeln!(self.out)?;
            self.mid_line = false;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

/// Indented tool output, cut after [`PREVIEW_LINES`] lines.
pub fn preview(output: &str) -> String {
    let lines: Vec<&str> = output.lines().collect();
    let mut shown: Vec<String> = lines
        .iter()
        .take(PREVIEW_LINES)
        .map(|line| format!("    {line}"))
        .collect();
    if lines.len() > PREVIEW_LINES {
        shown.push(format!("    ... ({} more lines)", lines.len() - PREVIEW_LINES));
    }
    shown.join("\n")
}

/// Poll `turn` to completion while rendering its events, or stop it on
/// Ctrl+C.
///
/// Events still queued when the turn ends are rendered before returning.
pub async fn drive<F, W>(
    turn: F,
    events: &mut UnboundedReceiver<AgentStreamEvent>,
    renderer: &mut Renderer<W>,
) -> io::Result<TurnEnd>
where
    F: Future<Output = Result<TurnOutcome, Error>>,
    W: Write,
{
    tokio::pin!(turn);
    let end = loop {
        tokio::select! {
            biased;
            Some(event) = events.recv() => renderer.render(event)?,
            result = &mut turn => break TurnEnd::Finished(result),
            _ = tokio::signal::ctrl_c() => break TurnEnd::Cancelled,
        }
    };

    while let Ok(event) = events.try_recv() {
        renderer.render(event)?;
    }
    renderer.finish_line()?;
    Ok(end)
}
