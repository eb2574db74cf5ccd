//! The command loop implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use repoloop_config::AppConfig;
use repoloop_core::error::{Error, GrammarError, ProviderError, ToolError};
use repoloop_core::event::{DomainEvent, EventBus};
use repoloop_core::message::{Conversation, Message};
use repoloop_core::provider::{Provider, ProviderRequest};
use repoloop_core::tool::ToolProvider;
use tracing::{debug, info, warn};

use crate::grammar::{self, Command};
use crate::stream_event::{AgentStreamEvent, EventSink};

/// Metadata key tagging each command result message as `ok` or `error`.
pub const OUTCOME_KEY: &str = "outcome";

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Text to show the user. The last completion verbatim, or its prose
    /// when the turn ended on a batch the grammar rejected entirely.
    pub answer: String,

    /// Model calls made
    pub iterations: u32,

    pub commands_dispatched: usize,

    /// Grammar errors, in the order they were recorded
    pub rejected: Vec<GrammarError>,
}

/// Drives one user turn to its fixed point: call the model, dispatch the
/// commands in its completion, record the results, call the model again,
/// until a completion contains no commands.
pub struct CommandLoop {
    /// The model gateway
    provider: Arc<dyn Provider>,

    /// Where commands are dispatched
    tools: Arc<dyn ToolProvider>,

    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    /// Maximum model calls per turn
    max_iterations: u32,

    /// Upper bound on a single tool call
    call_timeout: Duration,

    event_bus: Arc<EventBus>,
}

impl CommandLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolProvider>,
        model: impl Into<String>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            tools,
            model: model.into(),
            temperature: 1.0,
            max_tokens: None,
            max_iterations: 10,
            call_timeout: Duration::from_secs(60),
            event_bus,
        }
    }

    /// Build a loop with the model, sampling and limit settings from `config`.
    pub fn from_config(
        provider: Arc<dyn Provider>,
        tools: Arc<dyn ToolProvider>,
        config: &AppConfig,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self::new(provider, tools, &config.default_model, event_bus)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_max_iterations(config.agent.max_iterations)
            .with_call_timeout(Duration::from_secs(config.tools.call_timeout_secs))
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set the maximum number of model calls per turn (at least one).
    ///
    /// A completion that still carries commands on the last allowed call
    /// aborts the turn with [`Error::IterationLimit`]; its commands are not
    /// dispatched.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn tools(&self) -> &Arc<dyn ToolProvider> {
        &self.tools
    }

    /// Run one turn.
    ///
    /// `user_input` is appended first when present; `None` continues from
    /// the conversation as it stands. The assistant completion is committed
    /// only once it is whole, so a gateway failure (or dropping this
    /// future) never leaves a partial assistant message behind.
    pub async fn process(
        &self,
        conversation: &mut Conversation,
        user_input: Option<&str>,
        stream: bool,
        sink: &EventSink,
    ) -> Result<TurnOutcome, Error> {
        if let Some(input) = user_input {
            conversation.push(Message::user(input));
        }

        info!(
            conversation_id = %conversation.id,
            messages = conversation.len(),
            stream,
            "Processing turn"
        );

        let mut iterations = 0u32;
        let mut commands_dispatched = 0usize;
        let mut rejected = Vec::new();

        loop {
            iterations += 1;

            debug!(
                conversation_id = %conversation.id,
                iteration = iterations,
                "Command loop iteration"
            );

            let text = match self.generate(conversation, stream, sink).await {
                Ok(text) => text,
                Err(e) => {
                    let error = Error::Provider(e);
                    warn!(conversation_id = %conversation.id, error = %error, "Model call failed");
                    self.publish_abort(conversation, &error);
                    return Err(error);
                }
            };

            conversation.push(Message::assistant(text.as_str()));
            self.event_bus.publish(DomainEvent::ResponseGenerated {
                conversation_id: conversation.id.to_string(),
                model: self.model.clone(),
                iteration: iterations,
                timestamp: Utc::now(),
            });
            sink.emit(AgentStreamEvent::Completion {
                content: text.clone(),
                streamed: stream,
            });

            let lines = grammar::extract_commands(&text);
            if lines.is_empty() {
                sink.emit(AgentStreamEvent::Done {
                    iterations,
                    commands_dispatched,
                });
                return Ok(TurnOutcome {
                    answer: text,
                    iterations,
                    commands_dispatched,
                    rejected,
                });
            }

            let prose = grammar::strip_commands(&text);
            let prose = prose.trim();
            if !prose.is_empty() {
                debug!(prose = %prose, "Discarding text around commands");
            }

            let parsed: Vec<_> = lines
                .into_iter()
                .map(|line| (line, grammar::parse_command(line)))
                .collect();

            // The results of this batch could never be read by the model.
            if iterations >= self.max_iterations && parsed.iter().any(|(_, p)| p.is_ok()) {
                let error = Error::IterationLimit {
                    limit: self.max_iterations,
                };
                warn!(
                    conversation_id = %conversation.id,
                    limit = self.max_iterations,
                    "Command loop did not reach a fixed point"
                );
                self.publish_abort(conversation, &error);
                return Err(error);
            }

            let mut dispatched_now = 0usize;
            for (line, parsed) in parsed {
                match parsed {
                    Ok(command) => {
                        self.run_recorded(conversation, &command, sink).await;
                        dispatched_now += 1;
                    }
                    Err(e) => {
                        self.record_rejection(conversation, line, &e, sink);
                        rejected.push(e);
                    }
                }
            }
            commands_dispatched += dispatched_now;

            // Only rejections: nothing new for the model to read.
            if dispatched_now == 0 {
                sink.emit(AgentStreamEvent::Done {
                    iterations,
                    commands_dispatched,
                });
                return Ok(TurnOutcome {
                    answer: prose.to_string(),
                    iterations,
                    commands_dispatched,
                    rejected,
                });
            }
        }
    }

    /// One model call, collected into a complete text.
    async fn generate(
        &self,
        conversation: &Conversation,
        stream: bool,
        sink: &EventSink,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: conversation.messages().to_vec(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream,
        };

        if !stream {
            let response = self.provider.complete(request).await?;
            if let Some(usage) = &response.usage {
                debug!(
                    model = %response.model,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Completion usage"
                );
            }
            return Ok(response.message.content);
        }

        let mut rx = self.provider.stream(request).await?;
        let mut text = String::new();
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(usage) = &chunk.usage {
                debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Completion usage"
                );
            }
            if let Some(content) = chunk.content
                && !content.is_empty()
            {
                text.push_str(&content);
                sink.emit(AgentStreamEvent::Chunk { content });
            }
            if chunk.done {
                return Ok(text);
            }
        }
        Err(ProviderError::StreamInterrupted(
            "stream closed before completion".into(),
        ))
    }

    /// Dispatch one command, bounded by the call timeout.
    pub async fn dispatch(&self, command: &Command) -> Result<String, ToolError> {
        let operation = command.operation;
        let start = Instant::now();

        let result = match tokio::time::timeout(
            self.call_timeout,
            self.tools.call(operation, command.args()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout {
                tool_name: operation.wire_name().to_string(),
                timeout_secs: self.call_timeout.as_secs(),
            }),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(output) => debug!(
                operation = %operation,
                duration_ms,
                bytes = output.len(),
                "Command completed"
            ),
            Err(e) => warn!(operation = %operation, duration_ms, error = %e, "Command failed"),
        }

        self.event_bus.publish(DomainEvent::CommandDispatched {
            operation: operation.wire_name().to_string(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        result
    }

    /// Dispatch and append announcement plus outcome together.
    async fn run_recorded(&self, conversation: &mut Conversation, command: &Command, sink: &EventSink) {
        let shown = command.to_string();
        sink.emit(AgentStreamEvent::CommandStarted {
            command: shown.clone(),
        });

        let (output, success) = match self.dispatch(command).await {
            Ok(output) => (output, true),
            Err(e) => (format!("Error: {}", describe_tool_error(&e)), false),
        };

        conversation.push(announcement(&shown));
        conversation.push(
            Message::system(output.as_str())
                .with_metadata(OUTCOME_KEY, if success { "ok" } else { "error" })
                .with_metadata("operation", command.operation.wire_name()),
        );

        sink.emit(AgentStreamEvent::CommandFinished {
            command: shown,
            output,
            success,
        });
    }

    fn record_rejection(
        &self,
        conversation: &mut Conversation,
        line: &str,
        error: &GrammarError,
        sink: &EventSink,
    ) {
        warn!(command = %line, reason = %error, "Command rejected");

        conversation.push(announcement(line));
        conversation.push(
            Message::system(format!("Error: {error}")).with_metadata(OUTCOME_KEY, "error"),
        );

        self.event_bus.publish(DomainEvent::GrammarRejected {
            command: line.to_string(),
            reason: error.to_string(),
            timestamp: Utc::now(),
        });
        sink.emit(AgentStreamEvent::CommandRejected {
            command: line.to_string(),
            reason: error.to_string(),
        });
    }

    fn publish_abort(&self, conversation: &Conversation, error: &Error) {
        self.event_bus.publish(DomainEvent::TurnAborted {
            conversation_id: conversation.id.to_string(),
            error_message: error.to_string(),
            timestamp: Utc::now(),
        });
    }
}

fn announcement(command: &str) -> Message {
    Message::system(format!("Executing command: {command}")).with_metadata("kind", "command")
}

/// Error text as recorded for the model: the provider's own reason when it
/// gave one.
pub fn describe_tool_error(error: &ToolError) -> String {
    match error {
        ToolError::ExecutionFailed { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}
