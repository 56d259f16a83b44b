//! Configuration for stagemirror.

use crate::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mirror configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Disposable output directory, rebuilt on every refresh pass
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// Minimum delay between two change-triggered refreshes, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Settle window used to coalesce raw filesystem events, in milliseconds
    #[serde(default = "default_watch_settle_ms")]
    pub watch_settle_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Create `.include` with a comment header when the project has none
    #[serde(default = "default_true")]
    pub create_include_file: bool,

    /// Name of the notes store at the project root
    #[serde(default = "default_notes_file")]
    pub notes_file: String,

    /// Which artifacts a refresh pass produces
    #[serde(default)]
    pub outputs: OutputOptions,
}

/// Output toggles for a refresh pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// Write `project_files.json` (path tree with file contents)
    #[serde(default = "default_true")]
    pub content_snapshot: bool,

    /// Write `project_file_tree.json` (path tree without contents)
    #[serde(default)]
    pub file_tree: bool,

    /// Write `project_manifest.txt` (paths, notes, signatures)
    #[serde(default = "default_true")]
    pub manifest: bool,

    /// List function signatures in the manifest
    #[serde(default = "default_true")]
    pub extract_functions: bool,

    /// Copy every accepted file into the staging directory under a flattened name
    #[serde(default)]
    pub copy_files: bool,

    /// Give flattened copies a `.txt` suffix
    #[serde(default)]
    pub convert_to_txt: bool,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            content_snapshot: true,
            file_tree: false,
            manifest: true,
            extract_functions: true,
            copy_files: false,
            convert_to_txt: false,
        }
    }
}

impl OutputOptions {
    /// Conversion only applies to copied files.
    pub fn converts(&self) -> bool {
        self.copy_files && self.convert_to_txt
    }
}

fn default_staging_dir() -> PathBuf {
    std::env::temp_dir().join("stagemirror_files")
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_watch_settle_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_notes_file() -> String {
    ".filenotes.json".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".stagemirror")
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            staging_dir: default_staging_dir(),
            debounce_ms: default_debounce_ms(),
            watch_settle_ms: default_watch_settle_ms(),
            log_level: default_log_level(),
            create_include_file: true,
            notes_file: default_notes_file(),
            outputs: OutputOptions::default(),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let config_path = Self::default_path();

        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_yaml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %config_path.display(), "Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %config_path.display(), "Failed to read config file: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| CoreError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Path of the user configuration file
    pub fn default_path() -> PathBuf {
        default_data_dir().join("config.yaml")
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn watch_settle(&self) -> Duration {
        Duration::from_millis(self.watch_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = MirrorConfig::default();
        assert_eq!(config.debounce(), Duration::from_secs(1));
        assert_eq!(config.notes_file, ".filenotes.json");
        assert!(config.create_include_file);
        assert!(config.staging_dir.ends_with("stagemirror_files"));
    }

    #[test]
    fn test_default_outputs() {
        let outputs = OutputOptions::default();
        assert!(outputs.content_snapshot);
        assert!(outputs.manifest);
        assert!(!outputs.file_tree);
        assert!(!outputs.copy_files);
    }

    #[test]
    fn test_convert_requires_copy() {
        let outputs = OutputOptions {
            convert_to_txt: true,
            ..OutputOptions::default()
        };
        assert!(!outputs.converts());

        let outputs = OutputOptions {
            copy_files: true,
            ..outputs
        };
        assert!(outputs.converts());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "debounce_ms: 250\noutputs:\n  file_tree: true\n  content_snapshot: false\n",
        )
        .unwrap();

        let config = MirrorConfig::load_from(&path).unwrap();
        assert_eq!(config.debounce_ms, 250);
        assert_eq!(config.watch_settle_ms, 100);
        assert!(config.outputs.file_tree);
        assert!(!config.outputs.content_snapshot);
        assert!(config.outputs.manifest);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.yaml");
        std::fs::write(&path, "debounce_ms: [not, a, number]\n").unwrap();

        let err = MirrorConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::Config { .. }));
    }

    #[test]
    fn test_config_serialization() {
        let config = MirrorConfig::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: MirrorConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.staging_dir, parsed.staging_dir);
        assert_eq!(config.outputs, parsed.outputs);
    }
}
