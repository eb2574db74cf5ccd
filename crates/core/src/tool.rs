//! Tool seams — the remote operations commands dispatch to.
//!
//! [`ToolProvider`] is what the command loop talks to. It is implemented by
//! the MCP client (`repoloop-mcp`) and by [`ToolRegistry`], which hosts
//! in-process [`Tool`]s (`repoloop-tools`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use crate::error::ToolError;

/// Flat, string-keyed argument map sent with every operation.
pub type ToolArgs = BTreeMap<String, String>;

/// The fixed set of operations a tool provider exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ListRepos,
    ReadFile,
    GetFileStructure,
    SearchRepos,
    GetReadme,
    CloneRepo,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::ListRepos,
        Operation::ReadFile,
        Operation::GetFileStructure,
        Operation::SearchRepos,
        Operation::GetReadme,
        Operation::CloneRepo,
    ];

    /// The operation name on the wire.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Operation::ListRepos => "list_repos",
            Operation::ReadFile => "read_file",
            Operation::GetFileStructure => "get_file_structure",
            Operation::SearchRepos => "search_repos",
            Operation::GetReadme => "get_readme",
            Operation::CloneRepo => "clone_repo",
        }
    }

    /// The single named argument this operation takes, if any.
    pub fn argument_key(&self) -> Option<&'static str> {
        match self {
            Operation::ListRepos => None,
            Operation::ReadFile | Operation::GetFileStructure => Some("file_path"),
            Operation::SearchRepos => Some("query"),
            Operation::GetReadme => Some("full_name"),
            Operation::CloneRepo => Some("repo_url"),
        }
    }

    /// Look an operation up by its wire name.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.wire_name() == name)
    }

    /// Build the argument map for this operation from a positional argument.
    pub fn args(&self, argument: &str) -> ToolArgs {
        let mut args = ToolArgs::new();
        if let Some(key) = self.argument_key() {
            args.insert(key.to_string(), argument.to_string());
        }
        args
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// An operation as advertised by a provider (diagnostics only).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
}

/// A named resource or resource template published by a provider.
/// For templates `uri` holds the URI template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    pub uri: String,
}

/// The single seam between the command loop and every remote operation.
///
/// Results are opaque text: the loop records them verbatim and never
/// parses them.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "mcp", "local").
    fn name(&self) -> &str;

    /// Invoke an operation.
    async fn call(&self, operation: Operation, args: ToolArgs) -> Result<String, ToolError>;

    /// Enumerate the operations the provider exposes.
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError>;

    /// Enumerate published resources.
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, ToolError> {
        Ok(Vec::new())
    }

    /// Enumerate published resource templates.
    async fn list_resource_templates(&self) -> Result<Vec<ResourceDescriptor>, ToolError> {
        Ok(Vec::new())
    }
}

/// An in-process tool implementing one operation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The operation this tool serves.
    fn operation(&self) -> Operation;

    /// A description of what this tool does.
    fn description(&self) -> &str;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError>;

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.operation().wire_name().to_string(),
            description: self.description().to_string(),
        }
    }
}

/// A registry of in-process tools, usable directly as a [`ToolProvider`].
pub struct ToolRegistry {
    tools: HashMap<Operation, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool for the same operation.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.operation(), tool);
    }

    /// Get a tool by operation.
    pub fn get(&self, operation: Operation) -> Option<&dyn Tool> {
        self.tools.get(&operation).map(|t| t.as_ref())
    }

    /// Registered descriptors, in [`Operation::ALL`] order.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        Operation::ALL
            .iter()
            .filter_map(|op| self.tools.get(op))
            .map(|t| t.descriptor())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    fn name(&self) -> &str {
        "local"
    }

    async fn call(&self, operation: Operation, args: ToolArgs) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(&operation)
            .ok_or_else(|| ToolError::NotFound(operation.wire_name().to_string()))?;
        tool.execute(&args).await
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        Ok(self.descriptors())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Echoes its `file_path` argument back.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn operation(&self) -> Operation {
            Operation::ReadFile
        }
        fn description(&self) -> &str {
            "Echoes back the path"
        }
        async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
            args.get("file_path")
                .cloned()
                .ok_or_else(|| ToolError::InvalidArguments("Missing 'file_path' argument".into()))
        }
    }

    #[test]
    fn wire_names_round_trip() {
        for op in Operation::ALL {
            assert_eq!(Operation::from_wire_name(op.wire_name()), Some(op));
        }
        assert_eq!(Operation::from_wire_name("get_repo_list"), None);
    }

    #[test]
    fn args_use_the_operation_key() {
        let args = Operation::GetReadme.args("rust-lang/rust");
        assert_eq!(args.get("full_name").map(String::as_str), Some("rust-lang/rust"));
        assert!(Operation::ListRepos.args("ignored").is_empty());
    }

    #[test]
    fn args_pass_wildcards_through_literally() {
        let args = Operation::ReadFile.args("src/*.rs");
        assert_eq!(args["file_path"], "src/*.rs");
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));
        assert!(registry.get(Operation::ReadFile).is_some());
        assert!(registry.get(Operation::CloneRepo).is_none());
        assert_eq!(registry.descriptors()[0].name, "read_file");
    }

    #[tokio::test]
    async fn registry_dispatches_as_provider() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool));

        let out = registry
            .call(Operation::ReadFile, Operation::ReadFile.args("foo.py"))
            .await
            .unwrap();
        assert_eq!(out, "foo.py");
        assert!(registry.list_resources().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn registry_missing_tool() {
        let registry = ToolRegistry::new();
        let err = registry
            .call(Operation::ListRepos, ToolArgs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }
}
