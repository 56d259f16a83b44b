//! Sync error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a refresh pass or a watcher setup.
///
/// Per-file failures never surface here; they are logged and counted in the
/// pass summary instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Project root does not exist
    #[error("Source directory not found: {0}")]
    SourceMissing(PathBuf),

    /// Project root is not a directory
    #[error("Source path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Staging directory could not be prepared
    #[error("Staging directory unavailable at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Staging directory is, or contains, the project root
    #[error("Staging directory {0} contains the source directory")]
    StagingContainsSource(PathBuf),

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(String),

    /// Pass ended by a panic; staging output may be partial
    #[error("Refresh aborted: {0}")]
    Aborted(String),
}

impl From<notify::Error> for SyncError {
    fn from(e: notify::Error) -> Self {
        SyncError::Watcher(e.to_string())
    }
}
