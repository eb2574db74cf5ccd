//! Error types for the repoloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the command loop decides
//! which of them are recoverable within a turn.

use thiserror::Error;

/// The top-level error type for all repoloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model gateway errors (abort the turn) ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors (recorded in the conversation, never abort a batch) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Command grammar errors ---
    #[error("Command error: {0}")]
    Grammar(#[from] GrammarError),

    // --- Loop runaway ---
    #[error("Command loop exceeded {limit} model calls in one turn")]
    IterationLimit { limit: u32 },

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Permission denied: {tool_name}: {reason}")]
    PermissionDenied { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool transport error: {0}")]
    Transport(String),
}

/// A command embedded in model output (or typed by the user) that the
/// grammar refused to dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("No path provided")]
    NoPath,

    #[error("No search query provided")]
    NoQuery,

    #[error("No repository name provided")]
    NoRepositoryName,

    #[error("No repository URL provided")]
    NoRepositoryUrl,

    #[error("Invalid repository URL")]
    InvalidRepositoryUrl,

    #[error("{0} takes no argument")]
    UnexpectedArgument(String),

    #[error("Invalid command: {0}")]
    InvalidCommand(String),
}
