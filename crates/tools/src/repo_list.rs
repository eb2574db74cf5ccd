//! Repository list tool: what has been cloned so far.

use std::path::PathBuf;

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};

pub struct RepoListTool {
    root: PathBuf,
}

impl RepoListTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for RepoListTool {
    fn operation(&self) -> Operation {
        Operation::ListRepos
    }

    fn description(&self) -> &str {
        "List the locally cloned repositories."
    }

    async fn execute(&self, _args: &ToolArgs) -> Result<String, ToolError> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "list_repos".into(),
                reason: format!("Cannot read {}: {e}", self.root.display()),
            }
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "list_repos".into(),
                reason: e.to_string(),
            }
        })? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(names
            .iter()
            .map(|name| format!("  {name}"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_entries_sorted_and_indented() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();

        let tool = RepoListTool::new(dir.path());
        let out = tool.execute(&ToolArgs::new()).await.unwrap();
        assert_eq!(out, "  alpha\n  zeta");
    }

    #[tokio::test]
    async fn empty_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = RepoListTool::new(dir.path())
            .execute(&ToolArgs::new())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = RepoListTool::new(dir.path().join("nope"));
        let err = tool.execute(&ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }
}
