//! The project being mirrored.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Ignore rules consumed at the project root.
pub const GITIGNORE_FILE: &str = ".gitignore";

/// Include globs consumed at the project root.
pub const INCLUDE_FILE: &str = ".include";

/// A source tree selected for mirroring.
///
/// Owned by whoever manages the project list; the engine only borrows it for
/// the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Display name
    pub name: String,

    /// Absolute path to the project root
    pub root: PathBuf,

    /// Free-text rules written next to the generated artifacts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl Project {
    /// Create a project named after the final component of its root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);

        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self {
            name,
            root,
            metadata: None,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach free-text metadata. Blank text clears it.
    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        let metadata = metadata.into();
        self.metadata = if metadata.trim().is_empty() {
            None
        } else {
            Some(metadata)
        };
        self
    }

    /// Metadata trimmed for rendering, if any.
    pub fn prompt(&self) -> Option<&str> {
        self.metadata
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    pub fn gitignore_path(&self) -> PathBuf {
        self.root.join(GITIGNORE_FILE)
    }

    pub fn include_path(&self) -> PathBuf {
        self.root.join(INCLUDE_FILE)
    }

    /// Location of the notes store for this project.
    pub fn notes_path(&self, notes_file: &str) -> PathBuf {
        self.root.join(notes_file)
    }

    /// Path relative to the project root, if `path` lies under it.
    pub fn relative<'a>(&self, path: &'a Path) -> Option<&'a Path> {
        path.strip_prefix(&self.root).ok()
    }
}
