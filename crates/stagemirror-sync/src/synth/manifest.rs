//! The path/notes/functions manifest.

/// One accepted file in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Project-relative, forward-slash path
    pub path: String,
    /// Note from the notes store, if any
    pub note: Option<String>,
    /// Extracted function signatures
    pub signatures: Vec<String>,
}

/// Flat, ordered document with one section per accepted file.
#[derive(Debug, Clone, Default)]
pub struct PathManifest {
    entries: Vec<ManifestEntry>,
}

impl PathManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: ManifestEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the manifest text. Sections are separated by a blank line.
    pub fn render(&self) -> String {
        let sections: Vec<String> = self.entries.iter().map(render_entry).collect();
        sections.join("\n")
    }
}

fn render_entry(entry: &ManifestEntry) -> String {
    let mut out = format!("=== {} ===\n", entry.path);

    if let Some(note) = entry.note.as_deref().filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("Note: \"{}\"\n", note.trim_end()));
    }

    if !entry.signatures.is_empty() {
        out.push_str("Functions:\n");
        for sig in &entry.signatures {
            out.push_str("  ");
            out.push_str(sig);
            out.push('\n');
        }
    }

    out
}
