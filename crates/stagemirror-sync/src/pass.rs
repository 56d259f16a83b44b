//! One full synchronization pass.

use crate::filter::{FilterSpec, PatternFilterEngine};
use crate::scanner::TreeWalker;
use crate::staging::{CopyOutcome, StagingArea};
use crate::summary::RefreshSummary;
use crate::synth::{
    self, ContentSnapshot, FileMarker, ManifestEntry, PathManifest, StructureManifest,
    CONTENT_SNAPSHOT_FILE, FILE_TREE_FILE, MANIFEST_FILE, PROMPT_FILE,
};
use crate::SyncError;
use chrono::Utc;
use stagemirror_core::{FileNotes, MirrorConfig, OutputOptions, Project};
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// State owned for the lifetime of one project selection.
#[derive(Debug)]
pub struct SyncSession {
    project: Project,
    options: OutputOptions,
    notes_file: String,
    create_include_file: bool,
    staging: StagingArea,
}

impl SyncSession {
    /// Create a session for `project` using the configured staging directory and outputs.
    pub fn new(project: Project, config: &MirrorConfig) -> Self {
        Self {
            project,
            options: config.outputs,
            notes_file: config.notes_file.clone(),
            create_include_file: config.create_include_file,
            staging: StagingArea::new(&config.staging_dir),
        }
    }

    /// Replace the output toggles.
    pub fn with_options(mut self, options: OutputOptions) -> Self {
        self.options = options;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn options(&self) -> OutputOptions {
        self.options
    }

    pub fn staging_dir(&self) -> &Path {
        self.staging.dir()
    }

    /// Rebuild the staging directory from the current source tree.
    ///
    /// Fails only on structural problems; per-file problems are counted in
    /// the returned summary.
    pub fn run(&mut self) -> Result<RefreshSummary, SyncError> {
        let start = Instant::now();
        info!(project = %self.project.name, "Refreshing output");

        self.check_staging_location()?;
        let reset = self.staging.reset()?;
        if reset.failed > 0 {
            warn!(failed = reset.failed, "Staging directory not fully cleared");
        }

        let root = self.project.root.clone();
        if !root.exists() {
            error!(path = %root.display(), "Source directory not found");
            return Err(SyncError::SourceMissing(root));
        }
        if !root.is_dir() {
            error!(path = %root.display(), "Source path is not a directory");
            return Err(SyncError::NotADirectory(root));
        }

        let options = self.options;
        let spec = FilterSpec::load(&self.project, self.create_include_file);
        let notes = if options.manifest {
            FileNotes::load(&self.project.notes_path(&self.notes_file))
        } else {
            FileNotes::new()
        };
        let filter = Arc::new(PatternFilterEngine::new(&root, self.staging.dir(), spec));

        for name in artifact_names(options, self.project.prompt().is_some()) {
            self.staging.reserve(name);
        }

        let mut summary = RefreshSummary {
            reset_failures: reset.failed,
            ..RefreshSummary::default()
        };

        if let Some(prompt) = self.project.prompt() {
            emit(&mut self.staging, PROMPT_FILE, Ok(prompt.as_bytes().to_vec()), &mut summary);
        }

        let mut content = options.content_snapshot.then(ContentSnapshot::new);
        let mut structure = options.file_tree.then(StructureManifest::new);
        let mut manifest = options.manifest.then(PathManifest::new);
        let convert = options.converts();

        let walker = TreeWalker::new(&root, Arc::clone(&filter));
        let mut walk = walker.walk();

        for entry in walk.by_ref() {
            if entry.is_dir {
                continue;
            }
            let path = entry.path;

            if filter.is_ignored(&path, false) {
                summary.ignored_by_rule += 1;
                continue;
            }
            if !filter.is_included(&path) {
                summary.excluded_by_include += 1;
                continue;
            }

            let Some(relative) = self.project.relative(&path) else {
                debug!(path = %path.display(), "Skipping path outside project root");
                continue;
            };
            let parts = segments(relative);
            let rel_str = parts.join("/");
            summary.accepted += 1;

            let wants_signatures = manifest.is_some()
                && options.extract_functions
                && synth::supports(&path);
            let text = if content.is_some() || wants_signatures {
                match read_text(&path) {
                    Ok(text) => Some(text),
                    Err(e) => {
                        warn!(path = %rel_str, error = %e, "Could not read file");
                        summary.read_errors += 1;
                        None
                    }
                }
            } else {
                None
            };

            if let Some(manifest) = manifest.as_mut() {
                let signatures = match (&text, wants_signatures) {
                    (Some(text), true) => synth::extract_signatures(&path, text),
                    _ => Vec::new(),
                };
                manifest.push(ManifestEntry {
                    note: notes.get(&rel_str).map(str::to_string),
                    path: rel_str.clone(),
                    signatures,
                });
            }

            if let Some(tree) = structure.as_mut() {
                if !tree.insert(parts.iter().cloned(), FileMarker) {
                    debug!(path = %rel_str, "Path conflicts with an existing tree entry");
                }
            }

            if let (Some(tree), Some(text)) = (content.as_mut(), text) {
                if !tree.insert(parts, text) {
                    debug!(path = %rel_str, "Path conflicts with an existing snapshot entry");
                }
            }

            if options.copy_files {
                match self.staging.write_flat_copy(&path, relative, convert) {
                    Ok(CopyOutcome::Copied(_)) => {
                        summary.copied += 1;
                        if convert {
                            summary.converted += 1;
                        }
                    }
                    Ok(CopyOutcome::Collision(_)) => summary.collisions += 1,
                    Err(e) => {
                        warn!(path = %rel_str, error = %e, "Error copying file");
                        summary.copy_errors += 1;
                    }
                }
            }
        }

        summary.ignored_by_rule += walk.pruned();
        summary.read_errors += walk.errors();

        if let Some(tree) = content {
            summary.snapshot_entries = tree.file_count();
            info!(entries = tree.file_count(), "Writing content snapshot");
            emit(&mut self.staging, CONTENT_SNAPSHOT_FILE, synth::to_json(&tree), &mut summary);
        }

        if let Some(tree) = structure {
            summary.tree_entries = tree.file_count();
            info!(entries = tree.file_count(), "Writing file tree");
            emit(&mut self.staging, FILE_TREE_FILE, synth::to_json(&tree), &mut summary);
        }

        if let Some(manifest) = manifest {
            summary.manifest_entries = manifest.len();
            info!(entries = manifest.len(), "Writing manifest");
            emit(
                &mut self.staging,
                MANIFEST_FILE,
                Ok(manifest.render().into_bytes()),
                &mut summary,
            );
        }

        summary.elapsed_ms = start.elapsed().as_millis() as u64;
        summary.finished_at = Some(Utc::now());

        info!(
            accepted = summary.accepted,
            skipped = summary.skipped(),
            errors = summary.errors(),
            elapsed_ms = summary.elapsed_ms,
            "Refresh finished"
        );
        info!("Summary: {}", summary);

        Ok(summary)
    }

    /// Refuse a staging directory that contains the project root.
    fn check_staging_location(&self) -> Result<(), SyncError> {
        let staging = self
            .staging
            .dir()
            .canonicalize()
            .unwrap_or_else(|_| self.staging.dir().to_path_buf());
        let root = self
            .project
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.project.root.clone());

        if root.starts_with(&staging) {
            error!(staging = %staging.display(), root = %root.display(), "Staging directory contains the project");
            return Err(SyncError::StagingContainsSource(staging));
        }
        Ok(())
    }
}

/// Artifact names claimed up front so no flattened copy can take them.
fn artifact_names(options: OutputOptions, has_prompt: bool) -> Vec<&'static str> {
    let mut names = Vec::new();
    if has_prompt {
        names.push(PROMPT_FILE);
    }
    if options.content_snapshot {
        names.push(CONTENT_SNAPSHOT_FILE);
    }
    if options.file_tree {
        names.push(FILE_TREE_FILE);
    }
    if options.manifest {
        names.push(MANIFEST_FILE);
    }
    names
}

fn emit(
    staging: &mut StagingArea,
    name: &str,
    bytes: Result<Vec<u8>, serde_json::Error>,
    summary: &mut RefreshSummary,
) {
    let result = bytes
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        .and_then(|bytes| staging.write_artifact(name, &bytes));

    match result {
        Ok(path) => {
            debug!(path = %path.display(), "Wrote artifact");
            summary.artifacts.push(name.to_string());
        }
        Err(e) => {
            error!(artifact = name, error = %e, "Error writing artifact");
            summary.failed_artifacts.push(name.to_string());
        }
    }
}

/// Read a file as text, replacing invalid UTF-8.
fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn segments(relative: &Path) -> Vec<String> {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}
