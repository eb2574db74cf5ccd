//! # repoloop core
//!
//! Domain types, traits, and error definitions for the repoloop command loop.
//! This crate has no transport dependencies: it defines the conversation
//! model and the two seams every other crate implements against.
//!
//! ## Seams
//!
//! - [`Provider`] — the Model Gateway. Given the whole conversation, produce
//!   one assistant completion, either whole or as a stream of fragments.
//! - [`ToolProvider`] — the remote tool surface. Named operations taking a
//!   flat string map and returning opaque text.
//!
//! Implementations live in `repoloop-providers`, `repoloop-mcp` and
//! `repoloop-tools`; the loop in `repoloop-agent` only sees these traits.

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GrammarError, ProviderError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, Message, Role};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use tool::{
    Operation, ResourceDescriptor, Tool, ToolArgs, ToolDescriptor, ToolProvider, ToolRegistry,
};
