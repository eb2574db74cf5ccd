//! Turn-level streaming events.
//!
//! `AgentStreamEvent` is the UI side channel of a turn: partial text while
//! the model is generating, and a notice for every command the loop handles.
//! Nothing sent here feeds back into the conversation.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted by the command loop during a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from a streamed completion.
    Chunk { content: String },

    /// A completion is final and has been recorded.
    Completion { content: String, streamed: bool },

    /// A command is about to be dispatched.
    CommandStarted { command: String },

    /// A dispatched command finished (successfully or not).
    CommandFinished {
        command: String,
        output: String,
        success: bool,
    },

    /// The grammar refused a command; it was never dispatched.
    CommandRejected { command: String, reason: String },

    /// The turn reached its fixed point.
    Done {
        iterations: u32,
        commands_dispatched: usize,
    },
}

impl AgentStreamEvent {
    /// Short event name, e.g. for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Completion { .. } => "completion",
            Self::CommandStarted { .. } => "command_started",
            Self::CommandFinished { .. } => "command_finished",
            Self::CommandRejected { .. } => "command_rejected",
            Self::Done { .. } => "done",
        }
    }
}

/// Optional destination for a turn's events.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<AgentStreamEvent>>,
}

impl EventSink {
    /// A sink that drops everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentStreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn emit(&self, event: AgentStreamEvent) {
        if let Some(tx) = &self.tx {
            // A closed receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}
