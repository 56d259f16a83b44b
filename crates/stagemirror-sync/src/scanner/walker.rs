//! Top-down tree walker with directory pruning.

use crate::filter::PatternFilterEngine;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// A path produced by the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkEntry {
    /// Absolute path
    pub path: PathBuf,
    /// Whether the entry is a directory (symlinks are not followed)
    pub is_dir: bool,
}

/// Walks a project tree, pruning ignored directories before descent.
pub struct TreeWalker {
    root: PathBuf,
    filter: Arc<PatternFilterEngine>,
}

impl TreeWalker {
    /// Create a new walker for the given root directory.
    pub fn new(root: &Path, filter: Arc<PatternFilterEngine>) -> Self {
        Self {
            root: root.to_path_buf(),
            filter,
        }
    }

    /// Start a lazy pre-order walk. Siblings are visited in file-name order.
    pub fn walk(&self) -> Walk {
        let pruned = Arc::new(AtomicUsize::new(0));
        let filter = Arc::clone(&self.filter);
        let counter = Arc::clone(&pruned);

        let inner = WalkBuilder::new(&self.root)
            .standard_filters(false)
            .hidden(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                if is_dir_entry(entry) && filter.is_ignored(entry.path(), true) {
                    debug!(path = %entry.path().display(), "Pruned directory");
                    counter.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                true
            })
            .build();

        Walk {
            inner,
            pruned,
            errors: 0,
        }
    }
}

/// A symlink to a directory counts as a directory. It is never descended
/// into because links are not followed.
fn is_dir_entry(entry: &ignore::DirEntry) -> bool {
    match entry.file_type() {
        Some(ft) if ft.is_dir() => true,
        Some(ft) if ft.is_symlink() => entry.path().is_dir(),
        _ => false,
    }
}

/// Iterator over the entries of one walk. The root itself is not yielded.
pub struct Walk {
    inner: ignore::Walk,
    pruned: Arc<AtomicUsize>,
    errors: usize,
}

impl Walk {
    /// Directories removed before descent so far.
    pub fn pruned(&self) -> usize {
        self.pruned.load(Ordering::Relaxed)
    }

    /// Entries that could not be read so far.
    pub fn errors(&self) -> usize {
        self.errors
    }
}

impl Iterator for Walk {
    type Item = WalkEntry;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(entry) => {
                    if entry.depth() == 0 {
                        continue;
                    }
                    let is_dir = is_dir_entry(&entry);
                    return Some(WalkEntry {
                        path: entry.into_path(),
                        is_dir,
                    });
                }
                Err(e) => {
                    // Unreadable entries are skipped, the walk goes on.
                    warn!(error = %e, "Walk error");
                    self.errors += 1;
                }
            }
        }
    }
}
