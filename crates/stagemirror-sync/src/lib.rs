//! Stagemirror sync engine
//!
//! This crate rebuilds a flat staging directory from a project tree:
//! - Directory walking with gitignore-style pruning and include patterns
//! - Content snapshot, structure tree and path manifest generation
//! - Flattened file copies with collision detection
//! - Single-flight refresh scheduling
//! - File watching with debounced refresh requests

mod error;
pub mod filter;
pub mod pass;
pub mod scanner;
pub mod scheduler;
pub mod staging;
pub mod summary;
pub mod synth;
pub mod watcher;

pub use error::SyncError;
pub use filter::{FilterSpec, PatternFilterEngine};
pub use pass::SyncSession;
pub use scanner::{detect_language, Language, TreeWalker};
pub use scheduler::{RefreshScheduler, SchedulerHandle, SchedulerState, Trigger, TriggerOutcome};
pub use staging::{CopyOutcome, StagingArea};
pub use summary::RefreshSummary;
pub use watcher::{ChangeWatcher, Debounce, WatcherOptions};
