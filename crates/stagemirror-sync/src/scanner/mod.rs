//! Source tree traversal.
//!
//! Provides the pruning walker and extension-based language detection.

mod language;
mod walker;

pub use language::{detect_language, Language};
pub use walker::{TreeWalker, Walk, WalkEntry};
