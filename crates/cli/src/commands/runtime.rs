//! Wiring shared by every command: config, model gateway, tool provider.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use repoloop_agent::{CommandLoop, system_prompt};
use repoloop_config::{AppConfig, ToolsBackend};
use repoloop_core::event::EventBus;
use repoloop_core::tool::ToolProvider;
use repoloop_mcp::McpClient;

/// Providers that run locally and accept requests without a key.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm", "llamacpp", "llama.cpp"];

pub struct Runtime {
    pub config: AppConfig,
    pub agent: CommandLoop,
    pub system_prompt: String,
}

pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}

/// Everything a chat turn needs.
pub async fn build(local: bool) -> anyhow::Result<Runtime> {
    let config = load_config()?;
    require_api_key(&config)?;

    let router = repoloop_providers::router::build_from_config(&config);
    let provider = router
        .default()
        .context("No default provider configured")?;

    let tools = tool_provider(&config, local).await?;
    let agent = CommandLoop::from_config(provider, tools, &config, Arc::new(EventBus::default()));
    let system_prompt = system_prompt(config.agent.system_prompt_override.as_deref());

    tracing::debug!(
        provider = %config.default_provider,
        model = %config.default_model,
        tools = agent.tools().name(),
        "Runtime ready"
    );

    Ok(Runtime {
        config,
        agent,
        system_prompt,
    })
}

/// Connect to the MCP server, or build the in-process tools when the
/// config (or `--local`) asks for them.
pub async fn tool_provider(
    config: &AppConfig,
    local: bool,
) -> anyhow::Result<Arc<dyn ToolProvider>> {
    let backend = if local {
        ToolsBackend::Local
    } else {
        config.tools.backend
    };

    match backend {
        ToolsBackend::Mcp => {
            let url = &config.tools.mcp_url;
            let client = McpClient::connect(url, Duration::from_secs(config.tools.call_timeout_secs))
                .await
                .with_context(|| format!("Failed to connect to MCP server at {url}"))?
                .with_aliases(&config.tools.aliases);
            tracing::info!(
                server = %client.server_info().name,
                version = %client.server_info().version,
                "Connected to MCP server"
            );
            Ok(Arc::new(client))
        }
        ToolsBackend::Local => Ok(Arc::new(repoloop_tools::default_registry(&config.tools))),
    }
}

fn require_api_key(config: &AppConfig) -> anyhow::Result<()> {
    let has_provider_key = config
        .providers
        .get(&config.default_provider)
        .is_some_and(|p| p.api_key.is_some());
    if config.has_api_key()
        || has_provider_key
        || KEYLESS_PROVIDERS.contains(&config.default_provider.as_str())
    {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    REPOLOOP_API_KEY=sk-...");
    eprintln!("    OPENAI_API_KEY=sk-...");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    bail!("No API key found. See above for setup instructions.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoloop_config::ProviderConfig;

    #[test]
    fn hosted_provider_needs_a_key() {
        let config = AppConfig::default();
        assert!(require_api_key(&config).is_err());

        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".into());
        assert!(require_api_key(&config).is_ok());
    }

    #[test]
    fn per_provider_key_counts() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "openai".into(),
            ProviderConfig {
                api_key: Some("sk-test".into()),
                api_url: None,
            },
        );
        assert!(require_api_key(&config).is_ok());
    }

    #[test]
    fn local_providers_need_no_key() {
        let mut config = AppConfig::default();
        config.default_provider = "ollama".into();
        assert!(require_api_key(&config).is_ok());
    }

    #[tokio::test]
    async fn local_flag_overrides_mcp_backend() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.tools.backend = ToolsBackend::Mcp;
        config.tools.repos_dir = dir.path().to_path_buf();

        let tools = tool_provider(&config, true).await.unwrap();
        assert_eq!(tools.name(), "local");
    }
}
