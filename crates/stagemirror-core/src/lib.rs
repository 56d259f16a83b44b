//! Stagemirror Core Components
//!
//! This crate provides the types shared by the synchronization engine and
//! the command-line front end: the project being mirrored, its file notes,
//! and the user configuration.

mod config;
mod error;
mod notes;
mod project;

pub use config::{MirrorConfig, OutputOptions};
pub use error::CoreError;
pub use notes::FileNotes;
pub use project::{Project, GITIGNORE_FILE, INCLUDE_FILE};
