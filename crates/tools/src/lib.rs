//! In-process tool implementations for repoloop.
//!
//! The local backend serves the same six operations an MCP server would:
//! browse cloned repositories under a single root directory, search GitHub,
//! fetch READMEs, and clone new repositories into the root.

pub mod file_read;
pub mod file_structure;
pub mod git_clone;
pub mod github;
pub mod github_readme;
pub mod github_search;
pub mod path;
pub mod repo_list;

use repoloop_config::ToolsConfig;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{ToolArgs, ToolRegistry};

pub use github::GithubClient;

/// Fetch a required, non-empty argument.
pub(crate) fn required_arg<'a>(args: &'a ToolArgs, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{key}' argument")))
}

/// Create a registry serving every operation, rooted at `config.repos_dir`.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let root = config.repos_dir.clone();
    let github = GithubClient::new(config.github_token.clone());

    let mut registry = ToolRegistry::new();
    registry.register(Box::new(repo_list::RepoListTool::new(root.clone())));
    registry.register(Box::new(file_read::FileReadTool::new(root.clone())));
    registry.register(Box::new(file_structure::FileStructureTool::new(root.clone())));
    registry.register(Box::new(github_search::GithubSearchTool::new(github.clone())));
    registry.register(Box::new(github_readme::GithubReadmeTool::new(github)));
    registry.register(Box::new(git_clone::GitCloneTool::new(root)));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoloop_core::tool::{Operation, ToolProvider};

    #[test]
    fn registry_serves_every_operation() {
        let registry = default_registry(&ToolsConfig::default());
        for op in Operation::ALL {
            assert!(registry.get(op).is_some(), "missing tool for {op}");
        }
    }

    #[tokio::test]
    async fn registry_reads_from_configured_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("demo")).unwrap();
        std::fs::write(dir.path().join("demo/notes.txt"), "hi").unwrap();

        let config = ToolsConfig {
            repos_dir: dir.path().to_path_buf(),
            ..ToolsConfig::default()
        };
        let registry = default_registry(&config);

        let listing = registry
            .call(Operation::ListRepos, ToolArgs::new())
            .await
            .unwrap();
        assert_eq!(listing, "  demo");

        let content = registry
            .call(Operation::ReadFile, Operation::ReadFile.args("demo/notes.txt"))
            .await
            .unwrap();
        assert_eq!(content, "hi");
    }

    #[test]
    fn blank_arguments_are_missing() {
        let mut args = ToolArgs::new();
        args.insert("query".into(), "   ".into());
        assert!(required_arg(&args, "query").is_err());
        args.insert("query".into(), "tokio".into());
        assert_eq!(required_arg(&args, "query").unwrap(), "tokio");
    }
}
