//! GitHub repository search.

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};
use serde::Deserialize;

use crate::github::GithubClient;
use crate::required_arg;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
    #[serde(default)]
    items: Vec<RepoItem>,
}

#[derive(Debug, Deserialize)]
struct RepoItem {
    name: String,
    html_url: String,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    full_name: String,
}

fn format_results(response: &SearchResponse) -> String {
    let mut lines = vec![format!(
        "Total repositories found: {}\n",
        response.total_count
    )];
    for repo in &response.items {
        lines.push(format!("Name: {}", repo.name));
        lines.push(format!("URL: {}", repo.html_url));
        lines.push(format!(
            "Description: {}",
            repo.description.as_deref().unwrap_or("None")
        ));
        lines.push(format!("Stars: {}", repo.stargazers_count));
        lines.push(format!("Full Name: {}", repo.full_name));
        lines.push(format!("{}\n", "-".repeat(80)));
    }
    lines.join("\n")
}

pub struct GithubSearchTool {
    client: GithubClient,
}

impl GithubSearchTool {
    pub fn new(client: GithubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for GithubSearchTool {
    fn operation(&self) -> Operation {
        Operation::SearchRepos
    }

    fn description(&self) -> &str {
        "Search GitHub for repositories and return their metadata (without README)."
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let query = required_arg(args, "query")?;

        let response = self
            .client
            .get("search_repos", "/search/repositories", &[("q", query)])
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ToolError::ExecutionFailed {
                tool_name: "search_repos".into(),
                reason: format!("GitHub returned {}: {body}", status.as_u16()),
            });
        }

        let parsed: SearchResponse =
            response
                .json()
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "search_repos".into(),
                    reason: format!("Unexpected search response: {e}"),
                })?;
        Ok(format_results(&parsed))
    }
}
