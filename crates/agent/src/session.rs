//! Interactive session state and input classification.

use repoloop_core::error::{Error, GrammarError};
use repoloop_core::message::{Conversation, Role};

use crate::grammar::{self, Command};
use crate::loop_runner::{CommandLoop, TurnOutcome};
use crate::stream_event::EventSink;

/// Commands handled entirely by the session; they never reach the model
/// or the tool provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Quit,
    History,
    Clear,
    Stream,
    Info,
}

impl SessionCommand {
    pub const ALL: [SessionCommand; 5] = [
        SessionCommand::Info,
        SessionCommand::History,
        SessionCommand::Clear,
        SessionCommand::Stream,
        SessionCommand::Quit,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            SessionCommand::Quit => "/quit",
            SessionCommand::History => "/history",
            SessionCommand::Clear => "/clear",
            SessionCommand::Stream => "/stream",
            SessionCommand::Info => "/info",
        }
    }

    pub fn help(&self) -> &'static str {
        match self {
            SessionCommand::Quit => "Exit the chat",
            SessionCommand::History => "Show chat history",
            SessionCommand::Clear => "Clear chat history",
            SessionCommand::Stream => "Toggle streaming mode",
            SessionCommand::Info => "List available tools and resources",
        }
    }
}

/// What one line of user input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Session(SessionCommand),
    /// A tool command typed directly by the user
    Tool(Result<Command, GrammarError>),
    /// Anything else starts a turn
    Chat(String),
}

/// Classify a line of user input.
///
/// Session commands match exactly (case-insensitive). A line whose first
/// token is a tool token goes through the command grammar; other lines,
/// including unknown slash words, are chat.
pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    if let Some(cmd) = SessionCommand::ALL
        .into_iter()
        .find(|c| c.token().eq_ignore_ascii_case(line))
    {
        return Input::Session(cmd);
    }

    let token = line.split_whitespace().next().unwrap_or_default();
    if grammar::operation_for_token(token).is_some() {
        return Input::Tool(grammar::parse_command(line));
    }

    Input::Chat(line.to_string())
}

/// One interactive session: the conversation plus the display mode.
pub struct Session {
    conversation: Conversation,
    stream: bool,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, stream: bool) -> Self {
        Self {
            conversation: Conversation::new(system_prompt),
            stream,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn streaming(&self) -> bool {
        self.stream
    }

    /// Flip streaming mode and return the new setting.
    pub fn toggle_stream(&mut self) -> bool {
        self.stream = !self.stream;
        self.stream
    }

    /// Back to the system prompt alone.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// `(label, content)` for every message, oldest first.
    pub fn history(&self) -> Vec<(&'static str, &str)> {
        self.conversation
            .messages()
            .iter()
            .map(|m| {
                let label = match m.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                    Role::System => "System",
                };
                (label, m.content.as_str())
            })
            .collect()
    }

    /// Run a chat turn for `message` in the current streaming mode.
    pub async fn turn(
        &mut self,
        agent: &CommandLoop,
        message: &str,
        sink: &EventSink,
    ) -> Result<TurnOutcome, Error> {
        agent
            .process(&mut self.conversation, Some(message), self.stream, sink)
            .await
    }
}
