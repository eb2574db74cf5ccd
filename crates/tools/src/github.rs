//! Minimal GitHub REST client shared by the search and README tools.

use repoloop_core::error::ToolError;
use tracing::debug;

pub const GITHUB_API: &str = "https://api.github.com";

#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl std::fmt::Debug for GithubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubClient")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GithubClient {
    /// Anonymous requests work but are heavily rate limited.
    pub fn new(token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: GITHUB_API.to_string(),
            token: token.filter(|t| !t.is_empty()),
        }
    }

    /// Point at a different API host (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// GET `path` and return the response whatever its status.
    pub(crate) async fn get(
        &self,
        tool_name: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, ToolError> {
        let url = format!("{}{path}", self.api_base);
        debug!(url = %url, "GitHub request");

        let mut request = self
            .http
            .get(&url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(reqwest::header::USER_AGENT, "repoloop")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        request.send().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: tool_name.to_string(),
            reason: format!("GitHub request failed: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_anonymous() {
        let client = GithubClient::new(Some(String::new()));
        assert!(client.token.is_none());
    }

    #[test]
    fn api_base_trailing_slash_trimmed() {
        let client = GithubClient::new(None).with_api_base("http://localhost:9000/");
        assert_eq!(client.api_base(), "http://localhost:9000");
    }

    #[test]
    fn debug_redacts_token() {
        let client = GithubClient::new(Some("ghp_secret".into()));
        let shown = format!("{client:?}");
        assert!(!shown.contains("ghp_secret"));
        assert!(shown.contains("REDACTED"));
    }
}
