//! The disposable staging directory.
//!
//! Cleared at the start of every pass. Tracks every name written during the
//! pass so that no two sources ever land on the same destination.

use crate::SyncError;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Joins directory segments of a flattened name.
pub const FLAT_SEPARATOR: &str = "-";

/// Extension appended to converted copies.
pub const TEXT_SUFFIX: &str = ".txt";

/// Result of a flattened copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The file was written under this name
    Copied(String),
    /// The name was already taken in this pass; nothing was written
    Collision(String),
}

/// What a reset removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResetReport {
    pub removed: usize,
    pub failed: usize,
}

/// Owns the staging directory for one project session.
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
    written: HashSet<String>,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: HashSet::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name already produced in the current pass.
    pub fn contains(&self, name: &str) -> bool {
        self.written.contains(name)
    }

    /// Delete everything under the staging directory, creating it if missing.
    ///
    /// Individual deletion failures are logged and counted; only a directory
    /// that cannot be created or listed is an error.
    pub fn reset(&mut self) -> Result<ResetReport, SyncError> {
        self.written.clear();
        let mut report = ResetReport::default();

        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|source| SyncError::Staging {
                path: self.dir.clone(),
                source,
            })?;
            debug!(path = %self.dir.display(), "Created staging directory");
            return Ok(report);
        }

        let entries = std::fs::read_dir(&self.dir).map_err(|source| SyncError::Staging {
            path: self.dir.clone(),
            source,
        })?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Error listing staging directory");
                    report.failed += 1;
                    continue;
                }
            };

            let path = entry.path();
            let result = match entry.file_type() {
                Ok(ft) if ft.is_dir() => std::fs::remove_dir_all(&path),
                Ok(_) => std::fs::remove_file(&path),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    warn!(item = %entry.file_name().to_string_lossy(), error = %e, "Error deleting staging item");
                    report.failed += 1;
                }
            }
        }

        debug!(removed = report.removed, failed = report.failed, "Cleared staging directory");
        Ok(report)
    }

    /// Claim a name for a generated artifact so no copy can take it.
    pub fn reserve(&mut self, name: &str) {
        self.written.insert(name.to_string());
    }

    /// Write a generated artifact and record its name.
    pub fn write_artifact(&mut self, name: &str, contents: &[u8]) -> std::io::Result<PathBuf> {
        let path = self.dir.join(name);
        std::fs::write(&path, contents)?;
        self.written.insert(name.to_string());
        Ok(path)
    }

    /// Copy `source` into the staging directory under its flattened name.
    ///
    /// A name already produced in this pass is never overwritten.
    pub fn write_flat_copy(
        &mut self,
        source: &Path,
        relative: &Path,
        convert: bool,
    ) -> std::io::Result<CopyOutcome> {
        let name = flat_name(relative, convert);

        if self.written.contains(&name) {
            warn!(
                source = %relative.display(),
                target = %name,
                "Skipping copy (collision)"
            );
            return Ok(CopyOutcome::Collision(name));
        }

        let dest = self.dir.join(&name);
        if let Err(e) = std::fs::copy(source, &dest) {
            if dest.exists() {
                let _ = std::fs::remove_file(&dest);
            }
            return Err(e);
        }

        self.written.insert(name.clone());
        Ok(CopyOutcome::Copied(name))
    }
}

/// Flatten a relative path: `a/b/c.rs` becomes `a-b-c.rs`.
pub fn flat_name(relative: &Path, convert: bool) -> String {
    let parts: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();

    let mut name = parts.join(FLAT_SEPARATOR);
    if convert {
        name.push_str(TEXT_SUFFIX);
    }
    name
}
