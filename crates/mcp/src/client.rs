//! MCP client exposed to the command loop as a [`ToolProvider`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, ResourceDescriptor, ToolArgs, ToolDescriptor, ToolProvider};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::transport::{McpError, SseTransport};
use crate::types::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    ListResourceTemplatesResult, ListResourcesResult, ListToolsResult, PROTOCOL_VERSION,
};

/// A connected, initialized MCP session.
pub struct McpClient {
    transport: SseTransport,
    server: Implementation,
    /// Remote tool names that differ from the operation's wire name
    aliases: HashMap<Operation, String>,
    call_timeout: Duration,
}

impl McpClient {
    /// Connect to `sse_url` and run the `initialize` handshake.
    pub async fn connect(sse_url: &str, call_timeout: Duration) -> Result<Self, McpError> {
        let transport = SseTransport::connect(sse_url, call_timeout).await?;

        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: json!({}),
            client_info: Implementation {
                name: "repoloop".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        let result = transport
            .request("initialize", Some(serde_json::to_value(&params)?))
            .await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Bad initialize result: {e}")))?;

        if result.protocol_version != PROTOCOL_VERSION {
            warn!(
                server = %result.protocol_version,
                client = PROTOCOL_VERSION,
                "MCP protocol version mismatch"
            );
        }

        transport.notify("notifications/initialized", None).await?;

        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            endpoint = %transport.endpoint(),
            "Connected to MCP server"
        );

        Ok(Self {
            transport,
            server: result.server_info,
            aliases: HashMap::new(),
            call_timeout,
        })
    }

    /// Map operations to the tool names a server actually publishes.
    ///
    /// Keys are operation wire names; unknown keys are skipped with a warning.
    pub fn with_aliases(mut self, aliases: &HashMap<String, String>) -> Self {
        for (operation, remote) in aliases {
            match Operation::from_wire_name(operation) {
                Some(op) => {
                    self.aliases.insert(op, remote.clone());
                }
                None => warn!(alias = %operation, "Ignoring alias for unknown operation"),
            }
        }
        self
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server
    }

    /// The tool name sent on the wire for `operation`.
    pub fn remote_name(&self, operation: Operation) -> &str {
        self.aliases
            .get(&operation)
            .map(String::as_str)
            .unwrap_or_else(|| operation.wire_name())
    }

    fn tool_error(&self, tool_name: &str, error: McpError) -> ToolError {
        match error {
            McpError::Timeout(_) => ToolError::Timeout {
                tool_name: tool_name.to_string(),
                timeout_secs: self.call_timeout.as_secs(),
            },
            McpError::Rpc { message, .. } => ToolError::ExecutionFailed {
                tool_name: tool_name.to_string(),
                reason: message,
            },
            other => ToolError::Transport(other.to_string()),
        }
    }

    async fn list(&self, method: &str) -> Result<Value, ToolError> {
        self.transport
            .request(method, None)
            .await
            .map_err(|e| self.tool_error(method, e))
    }
}

/// Turn a `tools/call` result into the text recorded in the conversation.
pub(crate) fn call_result_text(tool_name: &str, result: CallToolResult) -> Result<String, ToolError> {
    let text = result.text();
    if result.is_error {
        return Err(ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: text,
        });
    }
    Ok(text)
}

#[async_trait]
impl ToolProvider for McpClient {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn call(&self, operation: Operation, args: ToolArgs) -> Result<String, ToolError> {
        let tool_name = self.remote_name(operation).to_string();
        let params = CallToolParams {
            name: tool_name.clone(),
            arguments: serde_json::to_value(&args)
                .map_err(|e| ToolError::InvalidArguments(e.to_string()))?,
        };
        let params = serde_json::to_value(&params)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        debug!(tool = %tool_name, "Calling MCP tool");
        let result = self
            .transport
            .request("tools/call", Some(params))
            .await
            .map_err(|e| self.tool_error(&tool_name, e))?;

        let result: CallToolResult = serde_json::from_value(result)
            .map_err(|e| ToolError::Transport(format!("Bad tools/call result: {e}")))?;
        call_result_text(&tool_name, result)
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let result: ListToolsResult = serde_json::from_value(self.list("tools/list").await?)
            .map_err(|e| ToolError::Transport(e.to_string()))?;
        Ok(result
            .tools
            .into_iter()
            .map(|t| ToolDescriptor {
                name: t.name,
                description: t.description.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, ToolError> {
        let result: ListResourcesResult =
            serde_json::from_value(self.list("resources/list").await?)
                .map_err(|e| ToolError::Transport(e.to_string()))?;
        Ok(result
            .resources
            .into_iter()
            .map(|r| ResourceDescriptor {
                name: r.name,
                uri: r.uri,
            })
            .collect())
    }

    async fn list_resource_templates(&self) -> Result<Vec<ResourceDescriptor>, ToolError> {
        let result: ListResourceTemplatesResult =
            serde_json::from_value(self.list("resources/templates/list").await?)
                .map_err(|e| ToolError::Transport(e.to_string()))?;
        Ok(result
            .resource_templates
            .into_iter()
            .map(|r| ResourceDescriptor {
                name: r.name,
                uri: r.uri_template,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolContent;

    #[test]
    fn successful_result_is_text() {
        let result = CallToolResult {
            content: vec![ToolContent::Text {
                text: "  repos/demo".into(),
            }],
            is_error: false,
        };
        assert_eq!(call_result_text("list_repos", result).unwrap(), "  repos/demo");
    }

    #[test]
    fn error_result_becomes_execution_failure() {
        let result = CallToolResult {
            content: vec![ToolContent::Text {
                text: "File not found".into(),
            }],
            is_error: true,
        };
        let err = call_result_text("read_file", result).unwrap_err();
        match err {
            ToolError::ExecutionFailed { tool_name, reason } => {
                assert_eq!(tool_name, "read_file");
                assert_eq!(reason, "File not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_content_is_empty_text() {
        let result = CallToolResult {
            content: Vec::new(),
            is_error: false,
        };
        assert_eq!(call_result_text("list_repos", result).unwrap(), "");
    }

    #[tokio::test]
    async fn connect_to_closed_port_fails() {
        // Port 9 (discard) is reliably closed on test machines.
        let result = McpClient::connect("http://127.0.0.1:9/sse", Duration::from_secs(2)).await;
        assert!(result.is_err());
    }
}
