//! File read tool — contents of a file inside a cloned repository.

use std::path::PathBuf;

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};

use crate::path::resolve_in_root;
use crate::required_arg;

pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn operation(&self) -> Operation {
        Operation::ReadFile
    }

    fn description(&self) -> &str {
        "Read a file, given its path relative to the repository directory."
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let file_path = required_arg(args, "file_path")?;

        let path = resolve_in_root(&self.root, file_path).map_err(|e| {
            ToolError::PermissionDenied {
                tool_name: "read_file".into(),
                reason: e.to_string(),
            }
        })?;

        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("Failed to read {file_path}: {e}"),
            })
    }
}
