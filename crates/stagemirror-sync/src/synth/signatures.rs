//! Function signature extraction by line-oriented regular expressions.
//!
//! This is text scanning, not parsing: string literals, comments and nesting
//! are invisible to it, so it both misses definitions and reports some that
//! are not real.

use crate::scanner::{detect_language, Language};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static PYTHON_DEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:async[ \t]+)?def[ \t]+[A-Za-z_]\w*[ \t]*\([^)]*\)(?:[ \t]*->[ \t]*[^:\n]+)?)[ \t]*:",
    )
    .expect("python signature pattern")
});

static RUST_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*((?:pub(?:\([^)]*\))?[ \t]+)?(?:(?:const|async|unsafe)[ \t]+)*(?:extern[ \t]+"[^"]*"[ \t]+)?fn[ \t]+[A-Za-z_]\w*[^{;]*)"#,
    )
    .expect("rust signature pattern")
});

static JS_FUNCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function\b[ \t]*\*?[ \t]*[A-Za-z_$][\w$]*[ \t]*(?:<[^>\n]*>)?[ \t]*\([^)]*\)(?:[ \t]*:[ \t]*[^{\n]+)?)",
    )
    .expect("function declaration pattern")
});

static JS_ARROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*((?:export[ \t]+)?(?:const|let|var)[ \t]+[A-Za-z_$][\w$]*[ \t]*(?::[^=\n]+)?=[ \t]*(?:async[ \t]+)?(?:\([^)]*\)|[A-Za-z_$][\w$]*)[ \t]*(?::[ \t]*[^=\n]+)?=>)",
    )
    .expect("arrow function pattern")
});

static GO_FUNC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^(func[ \t]*(?:\([^)]*\)[ \t]*)?[A-Za-z_]\w*[ \t]*(?:\[[^\]\n]*\])?[ \t]*\([^)]*\)[^{\n]*)",
    )
    .expect("go signature pattern")
});

fn patterns(language: Language) -> Vec<&'static Regex> {
    match language {
        Language::Python => vec![&*PYTHON_DEF],
        Language::Rust => vec![&*RUST_FN],
        Language::JavaScript | Language::TypeScript => vec![&*JS_FUNCTION, &*JS_ARROW],
        Language::Go => vec![&*GO_FUNC],
    }
}

/// Whether signatures can be extracted from this file at all.
pub fn supports(path: &Path) -> bool {
    detect_language(path).is_some()
}

/// Extract function signatures from `content`, in source order.
///
/// Unsupported extensions yield nothing.
pub fn extract_signatures(path: &Path, content: &str) -> Vec<String> {
    let Some(language) = detect_language(path) else {
        return Vec::new();
    };

    let mut found: Vec<(usize, String)> = patterns(language)
        .into_iter()
        .flat_map(|re| re.captures_iter(content))
        .filter_map(|caps| caps.get(1))
        .map(|m| (m.start(), collapse_whitespace(m.as_str())))
        .filter(|(_, sig)| !sig.is_empty())
        .collect();

    found.sort_by_key(|(start, _)| *start);
    found.dedup_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, sig)| sig).collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
