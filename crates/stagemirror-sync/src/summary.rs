//! Counters reported by one refresh pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of a refresh pass. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    /// Files that passed every filter
    pub accepted: usize,
    /// Directories pruned plus files skipped by ignore rules
    pub ignored_by_rule: usize,
    /// Files skipped because no include pattern matched
    pub excluded_by_include: usize,
    /// Flattened copies written
    pub copied: usize,
    /// Copies written with the text suffix
    pub converted: usize,
    /// Copies skipped because the name was taken
    pub collisions: usize,
    /// Files that could not be read
    pub read_errors: usize,
    /// Files that could not be copied
    pub copy_errors: usize,
    /// Stale staging entries that survived the reset
    pub reset_failures: usize,
    /// Files in the content snapshot
    pub snapshot_entries: usize,
    /// Files in the structure manifest
    pub tree_entries: usize,
    /// Sections in the path manifest
    pub manifest_entries: usize,
    /// Artifacts written to the staging directory
    pub artifacts: Vec<String>,
    /// Artifacts that failed to write
    pub failed_artifacts: Vec<String>,
    /// Wall-clock duration of the pass
    pub elapsed_ms: u64,
    /// When the pass finished
    pub finished_at: Option<DateTime<Utc>>,
}

impl RefreshSummary {
    /// Total files and directories left out.
    pub fn skipped(&self) -> usize {
        self.ignored_by_rule + self.excluded_by_include
    }

    /// Total per-file failures.
    pub fn errors(&self) -> usize {
        self.read_errors + self.copy_errors
    }
}

impl fmt::Display for RefreshSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Accepted: {}", self.accepted)?;
        if !self.artifacts.is_empty() {
            write!(f, ", Created: {}", self.artifacts.join(", "))?;
        }
        if !self.failed_artifacts.is_empty() {
            write!(f, ", Failed: {}", self.failed_artifacts.join(", "))?;
        }
        if self.copied > 0 {
            write!(f, ", Copied: {}", self.copied)?;
        }
        if self.converted > 0 {
            write!(f, ", Converted: {}", self.converted)?;
        }
        write!(
            f,
            ", Skipped: {} ({} gitignore, {} include)",
            self.skipped(),
            self.ignored_by_rule,
            self.excluded_by_include
        )?;
        if self.collisions > 0 {
            write!(f, ", CopyCollisions: {}", self.collisions)?;
        }
        if self.errors() > 0 {
            write!(f, ", Read/Copy Errors: {}", self.errors())?;
        }
        if self.reset_failures > 0 {
            write!(f, ", Stale Entries: {}", self.reset_failures)?;
        }
        write!(f, " ({:.2}s)", self.elapsed_ms as f64 / 1000.0)
    }
}
