//! Ignore and include rules for one project root.
//!
//! `.gitignore` decides what is pruned (directories) or skipped (files);
//! `.include` narrows the surviving files down by base name.

use glob::Pattern;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use stagemirror_core::Project;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// Version-control directory that is never mirrored.
pub const VCS_DIR: &str = ".git";

/// Written to a freshly created `.include`.
pub const INCLUDE_HEADER: &str = "# Include patterns (*.py, *.html)\n";

/// One line of `.include`.
#[derive(Debug, Clone)]
pub struct IncludePattern {
    raw: String,
    matcher: Option<Pattern>,
}

impl IncludePattern {
    fn compile(raw: &str) -> Self {
        let matcher = match Pattern::new(&collapse_stars(raw)) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!(pattern = raw, error = %e, "Invalid include pattern, it will match nothing");
                None
            }
        };

        Self {
            raw: raw.to_string(),
            matcher,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn matches(&self, name: &str) -> bool {
        self.matcher
            .as_ref()
            .map(|pattern| pattern.matches(name))
            .unwrap_or(false)
    }
}

/// Reduce every run of `*` to one. Base names have no separators, so `**`
/// means the same as `*`, but `glob` rejects it inside a component.
fn collapse_stars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Compiled filter rules for a project.
#[derive(Debug, Clone, Default)]
pub struct FilterSpec {
    ignore: Option<Gitignore>,
    include: Vec<IncludePattern>,
}

impl FilterSpec {
    /// No ignore rules, include everything.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `.gitignore` and `.include` from the project root.
    ///
    /// Unreadable files are logged and treated as absent.
    pub fn load(project: &Project, create_include_file: bool) -> Self {
        let gitignore_path = project.gitignore_path();
        let gitignore = if gitignore_path.is_file() {
            match std::fs::read(&gitignore_path) {
                Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
                Err(e) => {
                    warn!(path = %gitignore_path.display(), error = %e, "Error reading .gitignore");
                    None
                }
            }
        } else {
            None
        };

        if create_include_file {
            if let Err(e) = ensure_include_file(project) {
                warn!(path = %project.include_path().display(), error = %e, "Could not create .include");
            }
        }

        let include_path = project.include_path();
        let include = if include_path.is_file() {
            match std::fs::read(&include_path) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(e) => {
                    warn!(path = %include_path.display(), error = %e, "Error reading .include");
                    String::new()
                }
            }
        } else {
            String::new()
        };

        let spec = Self::parse(&project.root, gitignore.as_deref(), &include);

        info!(
            gitignore = spec.has_ignore_rules(),
            include_patterns = spec.include.len(),
            "Loaded filter rules"
        );

        spec
    }

    /// Compile rules from file contents.
    pub fn parse(root: &Path, gitignore: Option<&str>, include: &str) -> Self {
        Self {
            ignore: gitignore.and_then(|content| compile_gitignore(root, content)),
            include: parse_include(include),
        }
    }

    pub fn has_ignore_rules(&self) -> bool {
        self.ignore.as_ref().is_some_and(|gi| !gi.is_empty())
    }

    /// Raw include patterns in file order.
    pub fn include_patterns(&self) -> impl Iterator<Item = &str> {
        self.include.iter().map(IncludePattern::as_str)
    }

    pub fn has_include_patterns(&self) -> bool {
        !self.include.is_empty()
    }
}

fn compile_gitignore(root: &Path, content: &str) -> Option<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    let from = root.join(stagemirror_core::GITIGNORE_FILE);

    for line in content.lines() {
        if let Err(e) = builder.add_line(Some(from.clone()), line) {
            warn!(line, error = %e, "Skipping malformed .gitignore rule");
        }
    }

    match builder.build() {
        Ok(gitignore) => Some(gitignore),
        Err(e) => {
            warn!(error = %e, "Failed to compile .gitignore, ignoring nothing");
            None
        }
    }
}

/// Parse `.include` content: one glob per line, blanks and `#` comments skipped.
fn parse_include(content: &str) -> Vec<IncludePattern> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(IncludePattern::compile)
        .collect()
}

/// Create `.include` with a comment header if the project has none.
///
/// Returns whether the file was created.
pub fn ensure_include_file(project: &Project) -> std::io::Result<bool> {
    let path = project.include_path();
    if path.exists() {
        return Ok(false);
    }

    std::fs::write(&path, INCLUDE_HEADER)?;
    info!(path = %path.display(), "Created missing .include file");
    Ok(true)
}

/// Decides, per path, whether it is ignored or included.
#[derive(Debug, Clone)]
pub struct PatternFilterEngine {
    root: PathBuf,
    staging: PathBuf,
    spec: FilterSpec,
}

impl PatternFilterEngine {
    /// Create an engine for `root`, never accepting anything under `staging_dir`.
    pub fn new(root: &Path, staging_dir: &Path, spec: FilterSpec) -> Self {
        let staging = staging_dir
            .canonicalize()
            .unwrap_or_else(|_| staging_dir.to_path_buf());

        Self {
            root: root.to_path_buf(),
            staging,
            spec,
        }
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    /// Whether `path` is excluded from the mirror.
    ///
    /// Fails open: a path that cannot be resolved or related to the root is
    /// not ignored.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let rel = path.strip_prefix(&self.root).ok();

        let segments = rel.unwrap_or(path);
        if segments
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == VCS_DIR))
        {
            return true;
        }

        if let Ok(resolved) = path.canonicalize() {
            if resolved.starts_with(&self.staging) {
                debug!(path = %path.display(), "Skipping staging directory");
                return true;
            }
        }

        let Some(gitignore) = &self.spec.ignore else {
            return false;
        };
        let Some(rel) = rel else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }

        gitignore
            .matched_path_or_any_parents(rel, is_dir)
            .is_ignore()
    }

    /// Whether a file passes the include patterns.
    ///
    /// An empty pattern list includes everything.
    pub fn is_included(&self, path: &Path) -> bool {
        if self.spec.include.is_empty() {
            return true;
        }

        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();

        self.spec.include.iter().any(|pattern| pattern.matches(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn engine(root: &Path, gitignore: Option<&str>, include: &str) -> PatternFilterEngine {
        let staging = root.join("__staging_absent__");
        PatternFilterEngine::new(root, &staging, FilterSpec::parse(root, gitignore, include))
    }

    #[test]
    fn test_git_dir_always_ignored() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let filter = engine(root, None, "");

        assert!(filter.is_ignored(&root.join(".git"), true));
        assert!(filter.is_ignored(&root.join("sub/.git/config"), false));
        assert!(!filter.is_ignored(&root.join(".gitignore"), false));
        assert!(!filter.is_ignored(&root.join("src/main.rs"), false));
    }

    #[test]
    fn test_directory_pattern_only_matches_directories() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let filter = engine(root, Some("build/\n"), "");

        assert!(filter.is_ignored(&root.join("build"), true));
        assert!(!filter.is_ignored(&root.join("build"), false));
        assert!(filter.is_ignored(&root.join("build/out.o"), false));
    }

    #[test]
    fn test_negation_reincludes() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let filter = engine(root, Some("*.log\n!keep.log\n"), "");

        assert!(filter.is_ignored(&root.join("debug.log"), false));
        assert!(!filter.is_ignored(&root.join("keep.log"), false));
    }

    #[test]
    fn test_later_rule_wins() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let filter = engine(root, Some("!keep.log\n*.log\n"), "");

        assert!(filter.is_ignored(&root.join("keep.log"), false));
    }

    #[test]
    fn test_staging_dir_ignored() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let staging = root.join("out");
        fs::create_dir_all(staging.join("nested")).unwrap();
        fs::write(staging.join("nested/file.txt"), "x").unwrap();

        let filter = PatternFilterEngine::new(root, &staging, FilterSpec::empty());
        assert!(filter.is_ignored(&staging, true));
        assert!(filter.is_ignored(&staging.join("nested/file.txt"), false));
        assert!(!filter.is_ignored(&root.join("other"), true));
    }

    #[cfg(unix)]
    #[test]
    fn test_staging_dir_ignored_through_symlink() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("project");
        let staging = temp_dir.path().join("staging");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&staging).unwrap();
        std::os::unix::fs::symlink(&staging, root.join("link")).unwrap();

        let filter = PatternFilterEngine::new(&root, &staging, FilterSpec::empty());
        assert!(filter.is_ignored(&root.join("link"), false));
    }

    #[test]
    fn test_path_outside_root_fails_open() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path().join("project");
        let filter = engine(&root, Some("*\n"), "");

        assert!(!filter.is_ignored(Path::new("/somewhere/else/file.txt"), false));
    }

    #[test]
    fn test_malformed_gitignore_line_is_inert() {
        let temp_dir = tempdir().unwrap();
        let root = temp_dir.path();
        let filter = engine(root, Some("[\n*.log\n"), "");

        assert!(filter.is_ignored(&root.join("a.log"), false));
        assert!(!filter.is_ignored(&root.join("a.txt"), false));
    }

    #[test]
    fn test_empty_include_allows_everything() {
        let temp_dir = tempdir().unwrap();
        let filter = engine(temp_dir.path(), None, "# only a comment\n\n");

        assert!(!filter.spec().has_include_patterns());
        assert!(filter.is_included(Path::new("anything.bin")));
    }

    #[test]
    fn test_include_matches_base_name() {
        let temp_dir = tempdir().unwrap();
        let filter = engine(temp_dir.path(), None, "*.py\nMakefile\nv?.[ch]\n");

        assert!(filter.is_included(Path::new("src/deep/main.py")));
        assert!(filter.is_included(Path::new("Makefile")));
        assert!(filter.is_included(Path::new("v1.c")));
        assert!(filter.is_included(Path::new("v2.h")));
        assert!(!filter.is_included(Path::new("v10.c")));
        assert!(!filter.is_included(Path::new("README.md")));
    }

    #[test]
    fn test_include_double_star_inside_name() {
        let temp_dir = tempdir().unwrap();
        let filter = engine(temp_dir.path(), None, "test_**.py\n");

        assert_eq!(filter.spec().include_patterns().collect::<Vec<_>>(), vec!["test_**.py"]);
        assert!(filter.is_included(Path::new("tests/test_api.py")));
        assert!(filter.is_included(Path::new("test_.py")));
        assert!(!filter.is_included(Path::new("api_test.py")));
    }

    #[test]
    fn test_collapse_stars() {
        assert_eq!(collapse_stars("a**.py"), "a*.py");
        assert_eq!(collapse_stars("***"), "*");
        assert_eq!(collapse_stars("*.rs"), "*.rs");
    }

    #[test]
    fn test_include_is_case_sensitive() {
        let temp_dir = tempdir().unwrap();
        let filter = engine(temp_dir.path(), None, "*.py\n");

        assert!(!filter.is_included(Path::new("SCRIPT.PY")));
    }

    #[test]
    fn test_invalid_include_pattern_matches_nothing() {
        let temp_dir = tempdir().unwrap();
        let filter = engine(temp_dir.path(), None, "[\n*.rs\n");

        assert_eq!(filter.spec().include_patterns().count(), 2);
        assert!(filter.is_included(Path::new("lib.rs")));
        assert!(!filter.is_included(Path::new("[")));
    }

    #[test]
    fn test_load_creates_include_file() {
        let temp_dir = tempdir().unwrap();
        let project = Project::new(temp_dir.path());

        let spec = FilterSpec::load(&project, true);
        assert!(!spec.has_include_patterns());
        assert_eq!(
            fs::read_to_string(project.include_path()).unwrap(),
            INCLUDE_HEADER
        );
        assert!(!ensure_include_file(&project).unwrap());
    }

    #[test]
    fn test_load_reads_both_files() {
        let temp_dir = tempdir().unwrap();
        let project = Project::new(temp_dir.path());
        fs::write(project.gitignore_path(), "target/\n").unwrap();
        fs::write(project.include_path(), "# header\n*.rs\n\n*.toml\n").unwrap();

        let spec = FilterSpec::load(&project, false);
        assert!(spec.has_ignore_rules());
        assert_eq!(spec.include_patterns().collect::<Vec<_>>(), vec!["*.rs", "*.toml"]);
    }
}
