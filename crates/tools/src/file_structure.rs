//! File structure tool — recursive listing of a repository directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use repoloop_core::error::ToolError;
use repoloop_core::tool::{Operation, Tool, ToolArgs};

use crate::path::{display_relative, resolve_in_root};
use crate::required_arg;

/// Reported when the walk finds nothing worth listing.
pub const EMPTY_LISTING: &str = "No files found or directory is empty";

/// Binary and office formats the model has no use for.
const EXCLUDED_EXTENSIONS: &[&str] = &[
    ".ipynb", ".jpg", ".png", ".jpeg", ".gif", ".bmp", ".tiff", ".ico", ".webp", ".svg", ".pdf",
    ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx", ".lock",
];

pub struct FileStructureTool {
    root: PathBuf,
}

impl FileStructureTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_excluded(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

/// Depth-first, name-sorted walk; one `  dir/file` line per kept file.
fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    let mut names: Vec<String> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    for name in names {
        if is_excluded(&name) {
            continue;
        }
        let path = dir.join(&name);
        if path.is_dir() {
            walk(root, &path, out)?;
        } else {
            out.push(format!("  {}/{name}", display_relative(root, dir)));
        }
    }
    Ok(())
}

#[async_trait]
impl Tool for FileStructureTool {
    fn operation(&self) -> Operation {
        Operation::GetFileStructure
    }

    fn description(&self) -> &str {
        "List every file below a directory, relative to the repository directory."
    }

    async fn execute(&self, args: &ToolArgs) -> Result<String, ToolError> {
        let file_path = required_arg(args, "file_path")?;

        let dir = resolve_in_root(&self.root, file_path).map_err(|e| {
            ToolError::PermissionDenied {
                tool_name: "get_file_structure".into(),
                reason: e.to_string(),
            }
        })?;

        let root = self.root.clone();
        let lines = tokio::task::spawn_blocking(move || {
            let mut lines = Vec::new();
            walk(&root, &dir, &mut lines).map(|_| lines)
        })
        .await
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "get_file_structure".into(),
            reason: e.to_string(),
        })?
        .map_err(|e| ToolError::ExecutionFailed {
            tool_name: "get_file_structure".into(),
            reason: format!("Error accessing directory: {e}"),
        })?;

        if lines.is_empty() {
            return Ok(EMPTY_LISTING.to_string());
        }
        Ok(lines.join("\n"))
    }
}
