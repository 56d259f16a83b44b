//! Output synthesizers.
//!
//! Each generator consumes the same accepted-file stream independently:
//! - content snapshot: path tree with file text
//! - structure manifest: path tree with file markers only
//! - path manifest: paths, notes and function signatures as text

mod manifest;
mod signatures;
mod tree;

pub use manifest::{ManifestEntry, PathManifest};
pub use signatures::{extract_signatures, supports};
pub use tree::{FileMarker, PathNode, PathTree};

use serde::Serialize;

/// Content snapshot artifact.
pub const CONTENT_SNAPSHOT_FILE: &str = "project_files.json";

/// Structure-only artifact.
pub const FILE_TREE_FILE: &str = "project_file_tree.json";

/// Path/notes/functions artifact.
pub const MANIFEST_FILE: &str = "project_manifest.txt";

/// Project metadata artifact.
pub const PROMPT_FILE: &str = "prompt.txt";

/// Path tree holding each file's text.
pub type ContentSnapshot = PathTree<String>;

/// Path tree holding a marker per file.
pub type StructureManifest = PathTree<FileMarker>;

/// Serialize as pretty JSON with four-space indentation.
pub fn to_json<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}
