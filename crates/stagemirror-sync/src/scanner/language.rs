//! Language detection for source files.

use std::path::Path;

/// Languages with function signature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Rust,
    TypeScript,
    JavaScript,
    Python,
    Go,
}

/// Detect the language of a file based on its extension.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();

    match ext.as_str() {
        "rs" => Some(Language::Rust),

        "ts" | "tsx" => Some(Language::TypeScript),
        "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),

        "py" | "pyi" | "pyw" => Some(Language::Python),

        "go" => Some(Language::Go),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_detect_rust() {
        assert_eq!(
            detect_language(&PathBuf::from("main.rs")),
            Some(Language::Rust)
        );
    }

    #[test]
    fn test_detect_typescript_and_javascript() {
        assert_eq!(
            detect_language(&PathBuf::from("App.tsx")),
            Some(Language::TypeScript)
        );
        assert_eq!(
            detect_language(&PathBuf::from("index.mjs")),
            Some(Language::JavaScript)
        );
    }

    #[test]
    fn test_detect_python_case_insensitive() {
        assert_eq!(
            detect_language(&PathBuf::from("SETUP.PY")),
            Some(Language::Python)
        );
    }

    #[test]
    fn test_detect_unsupported() {
        assert_eq!(detect_language(&PathBuf::from("README.md")), None);
        assert_eq!(detect_language(&PathBuf::from("Makefile")), None);
    }
}
