//! Tool provider backed by a remote MCP server.
//!
//! Speaks JSON-RPC 2.0 over the Model Context Protocol's SSE transport:
//!
//! 1. `GET <sse url>` opens a long-lived event stream.
//! 2. The server's first `endpoint` event names the URL to POST requests to.
//! 3. Each POSTed request is answered by a `message` event on the stream,
//!    matched back to its caller by request id.

pub mod client;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use transport::{McpError, SseTransport};
