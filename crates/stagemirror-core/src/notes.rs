//! Per-file notes rendered into the manifest.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Annotations keyed by project-relative, forward-slash path.
///
/// Edited elsewhere; the engine only reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileNotes {
    notes: BTreeMap<String, String>,
}

impl FileNotes {
    /// Create an empty notes store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a notes store from disk.
    ///
    /// A missing file yields empty notes.
    pub fn read(path: &Path) -> Result<Self, CoreError> {
        if !path.is_file() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)?;

        Ok(raw.into_iter().collect())
    }

    /// Read a notes store, logging and falling back to empty notes on error.
    pub fn load(path: &Path) -> Self {
        match Self::read(path) {
            Ok(notes) => {
                debug!(path = %path.display(), count = notes.len(), "Loaded file notes");
                notes
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable notes file");
                Self::new()
            }
        }
    }

    /// Set or clear the note for a path.
    pub fn set(&mut self, path: &str, note: impl Into<String>) {
        let note = note.into();
        let key = normalize(path);
        if note.trim().is_empty() {
            self.notes.remove(&key);
        } else {
            self.notes.insert(key, note);
        }
    }

    /// Note for an exact relative path. Blank notes are treated as absent.
    pub fn get(&self, path: &str) -> Option<&str> {
        self.notes
            .get(path)
            .map(String::as_str)
            .filter(|note| !note.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl FromIterator<(String, String)> for FileNotes {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        let mut notes = Self::new();
        for (path, note) in iter {
            notes.set(&path, note);
        }
        notes
    }
}

fn normalize(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp_dir = tempdir().unwrap();
        let notes = FileNotes::read(&temp_dir.path().join("absent.json")).unwrap();
        assert!(notes.is_empty());
    }

    #[test]
    fn test_read_and_lookup() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("notes.json");
        std::fs::write(
            &path,
            r#"{"src/main.py": "Entry point.\nKeep it thin.", "src\\util.py": "helpers", "README.md": "  "}"#,
        )
        .unwrap();

        let notes = FileNotes::read(&path).unwrap();
        assert_eq!(notes.get("src/main.py"), Some("Entry point.\nKeep it thin."));
        assert_eq!(notes.get("src/util.py"), Some("helpers"));
        assert_eq!(notes.get("README.md"), None);
        assert_eq!(notes.get("src/other.py"), None);
    }

    #[test]
    fn test_malformed_file_loads_empty() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("notes.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(FileNotes::read(&path).is_err());
        assert!(FileNotes::load(&path).is_empty());
    }

    #[test]
    fn test_set_blank_clears() {
        let mut notes = FileNotes::new();
        notes.set("a.rs", "first");
        assert_eq!(notes.len(), 1);
        notes.set("a.rs", "");
        assert!(notes.is_empty());
    }
}
