//! Path validation: keep every tool path inside the repository root.

use std::path::{Component, Path, PathBuf};

/// Error returned when a requested path cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Absolute paths are not allowed: '{path}'")]
    Absolute { path: String },

    #[error("Path '{path}' resolves outside the repository directory")]
    OutsideRoot { path: String },
}

/// Resolve `relative` below `root`.
///
/// Rejects absolute paths and `..` components, then (when the target
/// exists) canonicalizes both sides so a symlink cannot lead out of `root`.
/// Wildcards and other characters are taken literally.
pub fn resolve_in_root(root: &Path, relative: &str) -> Result<PathBuf, PathValidationError> {
    let requested = Path::new(relative);

    for component in requested.components() {
        match component {
            Component::ParentDir => {
                return Err(PathValidationError::PathTraversal {
                    path: relative.into(),
                });
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathValidationError::Absolute {
                    path: relative.into(),
                });
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    let joined = root.join(requested);

    if let (Ok(canonical), Ok(canonical_root)) = (joined.canonicalize(), root.canonicalize())
        && !canonical.starts_with(&canonical_root)
    {
        return Err(PathValidationError::OutsideRoot {
            path: relative.into(),
        });
    }

    Ok(joined)
}

/// `path` relative to `root`, with `/` separators, for display.
pub fn display_relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
