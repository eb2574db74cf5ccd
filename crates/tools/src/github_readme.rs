//! README lookup for a GitHub repository.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};
use serde::Deserialize;

use crate::github::GithubClient;
use crate::required_arg;

#[derive(Debug, Deserialize)]
struct ReadmeResponse {
    content: String,
}

/// GitHub wraps the base64 payload at 60 columns.
fn decode_content(encoded: &str) -> Result<String, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub struct GithubReadmeTool {
    client: GithubClient,
}

impl GithubReadmeTool {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GithubReadmeTool {
    fn operation(&self) -> Operation {
        Operation::GetReadme
    }

    fn description(&self) -> &str {
        "Fetch the README of a GitHub repository given its full name (owner/repo)."
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let full_name = required_arg(args, "full_name")?;

        let response = self
            .client
            .get("get_readme", &format!("/repos/{full_name}/readme"), &[])
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "get_readme".into(),
                reason: format!(
                    "README not found or inaccessible for {full_name} (status code: {})",
                    status.as_u16()
                ),
            });
        }

        let readme: ReadmeResponse =
            response
                .json()
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "get_readme".into(),
                    reason: format!("Unexpected README response: {e}"),
                })?;

        decode_content(&readme.content).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "get_readme".into(),
            reason: format!("README content is not valid base64: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_wrapped_base64() {
        let encoded = "IyBEZW1vCgpB\nIHNtYWxsIHJl\ncG8uCg==\n";
        assert_eq!(decode_content(encoded).unwrap(), "# Demo\n\nA small repo.\n");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_content("%%%not base64%%%").is_err());
    }

    #[tokio::test]
    async fn missing_full_name_argument() {
        let tool = GithubReadmeTool::new(GithubClient::new(None));
        let err = tool.execute(&ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
