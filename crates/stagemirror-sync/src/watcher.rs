//! File system watcher for detecting changes.
//!
//! Raw events are coalesced by `notify-debouncer-full`, filtered, and then
//! passed through a [`Debounce`] gate before a single refresh request is
//! handed to the scheduler. The watcher never touches the staging directory.

use crate::filter::VCS_DIR;
use crate::scheduler::{SchedulerHandle, Trigger};
use crate::SyncError;
use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, RecommendedCache};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// Leading-edge debounce: lets a signal through only if `delay` has passed
/// since the last one it let through.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self { delay, last: None }
    }

    /// Decide whether a signal at `now` is forwarded, recording it if so.
    pub fn admit(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.delay => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Options for the change watcher.
#[derive(Debug, Clone)]
pub struct WatcherOptions {
    /// Minimum delay between forwarded refresh signals
    pub debounce: Duration,
    /// Window used to coalesce raw events
    pub settle: Duration,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_secs(1),
            settle: Duration::from_millis(100),
        }
    }
}

impl From<&stagemirror_core::MirrorConfig> for WatcherOptions {
    fn from(config: &stagemirror_core::MirrorConfig) -> Self {
        Self {
            debounce: config.debounce(),
            settle: config.watch_settle(),
        }
    }
}

/// Background observer of one project root.
pub struct ChangeWatcher {
    root: PathBuf,
    debouncer: Debouncer<RecommendedWatcher, RecommendedCache>,
}

impl ChangeWatcher {
    /// Start watching `root` recursively, requesting refreshes through `handle`.
    pub fn start(
        root: &Path,
        staging_dir: &Path,
        options: WatcherOptions,
        handle: SchedulerHandle,
    ) -> Result<Self, SyncError> {
        let root = root
            .canonicalize()
            .map_err(|_| SyncError::SourceMissing(root.to_path_buf()))?;

        let staging_name = staging_dir.file_name().map(|n| n.to_os_string());
        let mut gate = Debounce::new(options.debounce);

        let mut debouncer = new_debouncer(
            options.settle,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    let relevant = events
                        .iter()
                        .any(|event| is_relevant(&event.event, staging_name.as_ref()));
                    if !relevant {
                        return;
                    }
                    if gate.admit(Instant::now()) {
                        debug!("Change detected, requesting refresh");
                        handle.request(Trigger::Change);
                    } else {
                        trace!("Change inside debounce window dropped");
                    }
                }
                Err(errors) => {
                    for e in errors {
                        warn!(error = %e, "Watcher error");
                    }
                }
            },
        )?;

        debouncer.watch(&root, RecursiveMode::Recursive)?;

        info!(path = %root.display(), "File watching started");

        Ok(Self { root, debouncer })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Release the OS subscription and join the background thread.
    pub fn stop(self) {
        self.debouncer.stop();
        info!(path = %self.root.display(), "File watching stopped");
    }
}

/// Whether an event should cause a refresh.
fn is_relevant(event: &Event, staging_name: Option<&OsString>) -> bool {
    let interesting = match &event.kind {
        EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => false,
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => false,
        EventKind::Modify(_) => true,
        EventKind::Access(_) | EventKind::Any | EventKind::Other => false,
    };

    interesting
        && event
            .paths
            .iter()
            .any(|path| !is_excluded_path(path, staging_name))
}

fn is_excluded_path(path: &Path, staging_name: Option<&OsString>) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => {
            name == VCS_DIR || staging_name.is_some_and(|staging| name == staging.as_os_str())
        }
        _ => false,
    })
}
