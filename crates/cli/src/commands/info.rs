//! `repoloop info` — What the tool provider publishes.

use repoloop_core::error::ToolError;
use repoloop_core::tool::{ResourceDescriptor, ToolProvider};

use super::runtime;

pub async fn run(local: bool) -> anyhow::Result<()> {
    let config = runtime::load_config()?;
    let tools = runtime::tool_provider(&config, local).await?;
    print_catalog(tools.as_ref()).await?;
    Ok(())
}

pub async fn print_catalog(tools: &dyn ToolProvider) -> Result<(), ToolError> {
    print!("{}", catalog(tools).await?);
    Ok(())
}

/// Tools, resources and resource templates as a printable listing.
pub async fn catalog(tools: &dyn ToolProvider) -> Result<String, ToolError> {
    let mut out = format!("  Tool provider: {}\n\n  Tools:\n", tools.name());
    for tool in tools.list_tools().await? {
        if tool.description.is_empty() {
            out.push_str(&format!("    {}\n", tool.name));
        } else {
            out.push_str(&format!("    {:<20} {}\n", tool.name, tool.description));
        }
    }

    section(&mut out, "Resources", &tools.list_resources().await?);
    section(
        &mut out,
        "Resource templates",
        &tools.list_resource_templates().await?,
    );
    Ok(out)
}

fn section(out: &mut String, title: &str, items: &[ResourceDescriptor]) {
    out.push_str(&format!("\n  {title}:\n"));
    if items.is_empty() {
        out.push_str("    (none)\n");
    }
    for item in items {
        out.push_str(&format!("    {:<20} {}\n", item.name, item.uri));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoloop_config::ToolsConfig;

    #[tokio::test]
    async fn local_catalog_lists_every_operation() {
        let dir = tempfile::tempdir().unwrap();
        let config = ToolsConfig {
            repos_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let registry = repoloop_tools::default_registry(&config);

        let out = catalog(&registry).await.unwrap();
        assert!(out.starts_with("  Tool provider: local\n"));
        for name in [
            "list_repos",
            "read_file",
            "get_file_structure",
            "search_repos",
            "get_readme",
            "clone_repo",
        ] {
            assert!(out.contains(name), "missing {name}");
        }
        assert!(out.contains("  Resources:\n    (none)\n"));
        assert!(out.contains("  Resource templates:\n    (none)\n"));
    }
}
