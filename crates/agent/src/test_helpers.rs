//! Scripted collaborators for command loop tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use repoloop_core::error::{ProviderError, ToolError};
use repoloop_core::message::Message;
use repoloop_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk,
};
use repoloop_core::tool::{Operation, ToolArgs, ToolDescriptor, ToolProvider};

/// One scripted model reply.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// Streamed as these fragments, in order
    Fragments(Vec<String>),
    Fail(ProviderError),
    /// Streams the fragments, then breaks
    BrokenStream(Vec<String>),
    /// Streams the fragments, then never finishes
    Stall(Vec<String>),
}

pub fn text(s: &str) -> Reply {
    Reply::Text(s.to_string())
}

/// A provider that returns scripted replies in sequence and records every
/// request it receives.
pub struct ScriptedProvider {
    replies: Mutex<Vec<Reply>>,
    /// Reply used once the script runs out
    fallback: Option<Reply>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies `reply` forever.
    pub fn repeating(reply: Reply) -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            fallback: Some(reply),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: ProviderRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        let next = self.replies.lock().unwrap().pop();
        match next.or_else(|| self.fallback.clone()) {
            Some(reply) => reply,
            None => panic!("ScriptedProvider exhausted after {} calls", self.calls()),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let content = match self.next(request) {
            Reply::Text(text) => text,
            Reply::Fragments(parts) => parts.concat(),
            Reply::Fail(e) => return Err(e),
            Reply::BrokenStream(_) => {
                return Err(ProviderError::StreamInterrupted("connection reset".into()));
            }
            Reply::Stall(_) => std::future::pending().await,
        };
        Ok(ProviderResponse {
            message: Message::assistant(content),
            usage: None,
            model: "scripted-model".into(),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (parts, broken) = match self.next(request) {
            Reply::Text(text) => (vec![text], false),
            Reply::Fragments(parts) => (parts, false),
            Reply::Fail(e) => return Err(e),
            Reply::BrokenStream(parts) => (parts, true),
            Reply::Stall(parts) => {
                let (tx, rx) = tokio::sync::mpsc::channel(parts.len() + 1);
                send_fragments(&tx, parts).await;
                // Hold the sender open forever
                tokio::spawn(async move {
                    let _tx = tx;
                    std::future::pending::<()>().await;
                });
                return Ok(rx);
            }
        };

        let (tx, rx) = tokio::sync::mpsc::channel(parts.len() + 2);
        send_fragments(&tx, parts).await;
        let last = if broken {
            Err(ProviderError::StreamInterrupted("connection reset".into()))
        } else {
            Ok(StreamChunk {
                done: true,
                ..Default::default()
            })
        };
        let _ = tx.send(last).await;
        Ok(rx)
    }
}

async fn send_fragments(
    tx: &tokio::sync::mpsc::Sender<Result<StreamChunk, ProviderError>>,
    parts: Vec<String>,
) {
    for part in parts {
        let _ = tx
            .send(Ok(StreamChunk {
                content: Some(part),
                ..Default::default()
            }))
            .await;
    }
}

/// A tool provider that records calls and answers from a script.
#[derive(Default)]
pub struct RecordingTools {
    calls: Mutex<Vec<(Operation, ToolArgs)>>,
    outcomes: HashMap<Operation, Result<String, ToolError>>,
    delay: Option<Duration>,
}

impl RecordingTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcome(mut self, operation: Operation, outcome: Result<String, ToolError>) -> Self {
        self.outcomes.insert(operation, outcome);
        self
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(Operation, ToolArgs)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls().into_iter().map(|(op, _)| op).collect()
    }
}

#[async_trait]
impl ToolProvider for RecordingTools {
    fn name(&self) -> &str {
        "recording"
    }

    async fn call(&self, operation: Operation, args: ToolArgs) -> Result<String, ToolError> {
        self.calls.lock().unwrap().push((operation, args));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes
            .get(&operation)
            .cloned()
            .unwrap_or_else(|| Ok(format!("{operation} ok")))
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(Operation::ALL
            .iter()
            .map(|op| ToolDescriptor {
                name: op.wire_name().to_string(),
                description: String::new(),
            })
            .collect())
    }
}
