//! Clone tool — `git clone` into the repository directory.

use std::path::PathBuf;

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::required_arg;

/// Directory name a clone of `repo_url` lands in: the last URL segment
/// without its `.git` suffix.
pub fn project_name(repo_url: &str) -> Option<&str> {
    let last = repo_url.trim_end_matches('/').rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

pub struct GitCloneTool {
    root: PathBuf,
}

impl GitCloneTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn failed(reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: "clone_repo".into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for GitCloneTool {
    fn operation(&self) -> Operation {
        Operation::CloneRepo
    }

    fn description(&self) -> &str {
        "Clone a Git repository into the repository directory."
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let repo_url = required_arg(args, "repo_url")?;
        let name = project_name(repo_url).ok_or_else(|| {
            ToolError::InvalidArguments(format!("Cannot derive a project name from {repo_url}"))
        })?;

        let dest = self.root.join(name);
        if dest.exists() {
            return Err(Self::failed(format!(
                "Error cloning repository: {} already exists",
                dest.display()
            )));
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| Self::failed(format!("Error cloning repository: {e}")))?;

        debug!(url = %repo_url, dest = %dest.display(), "Cloning repository");

        let output = Command::new("git")
            .arg("clone")
            .arg("--")
            .arg(repo_url)
            .arg(&dest)
            .output()
            .await
            .map_err(|e| Self::failed(format!("Error cloning repository: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            warn!(url = %repo_url, exit_code = code, "git clone failed");
            return Err(Self::failed(format!(
                "Error cloning repository: {}",
                stderr.trim()
            )));
        }

        Ok(format!(
            "Successfully cloned {repo_url} to {}",
            dest.display()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_strips_git_suffix() {
        assert_eq!(project_name("https://github.com/a/b.git"), Some("b"));
        assert_eq!(project_name("https://github.com/a/b.git/"), Some("b"));
        assert_eq!(project_name("git@github.com:a/tool.git"), Some("tool"));
        assert_eq!(project_name("git@host:tool.git"), Some("tool"));
        assert_eq!(project_name("https://github.com/a/.git"), None);
        assert_eq!(project_name("https://github.com/a/...git"), None);
    }

    #[tokio::test]
    async fn existing_destination_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        let tool = GitCloneTool::new(dir.path());
        let err = tool
            .execute(&Operation::CloneRepo.args("https://github.com/a/b.git"))
            .await
            .unwrap_err();
        match err {
            ToolError::ExecutionFailed { reason, .. } => assert!(reason.contains("already exists")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-source.git");

        let tool = GitCloneTool::new(dir.path().join("repos"));
        let result = tool
            .execute(&Operation::CloneRepo.args(&missing.to_string_lossy()))
            .await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
        assert!(!dir.path().join("repos/no-such-source").exists());
    }
}
