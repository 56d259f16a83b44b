//! Nested path trees for the JSON snapshots.

use serde::Serialize;
use std::collections::BTreeMap;

/// A node of a [`PathTree`]: either a directory or a file leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathNode<L> {
    Dir(BTreeMap<String, PathNode<L>>),
    Leaf(L),
}

/// Marker leaf for trees that record structure only. Serializes as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileMarker;

/// Files keyed by path segments.
///
/// Insertion never lets a directory replace a file or a file replace a
/// directory; the conflicting insert is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathTree<L> {
    root: BTreeMap<String, PathNode<L>>,
    #[serde(skip)]
    files: usize,
}

impl<L> Default for PathTree<L> {
    fn default() -> Self {
        Self {
            root: BTreeMap::new(),
            files: 0,
        }
    }
}

impl<L> PathTree<L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `leaf` at the path given by `parts`.
    ///
    /// Returns `false` if the path conflicts with an existing entry.
    pub fn insert<I, S>(&mut self, parts: I, leaf: L) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts: Vec<String> = parts.into_iter().map(Into::into).collect();
        let Some(name) = parts.pop() else {
            return false;
        };

        let mut level = &mut self.root;
        for part in parts {
            let node = level
                .entry(part)
                .or_insert_with(|| PathNode::Dir(BTreeMap::new()));
            match node {
                PathNode::Dir(children) => level = children,
                PathNode::Leaf(_) => return false,
            }
        }

        let replaces = match level.get(&name) {
            Some(PathNode::Dir(_)) => return false,
            Some(PathNode::Leaf(_)) => true,
            None => false,
        };

        level.insert(name, PathNode::Leaf(leaf));
        if !replaces {
            self.files += 1;
        }
        true
    }

    /// Number of file leaves.
    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_structure_tree_shape() {
        let mut tree = PathTree::new();
        assert!(tree.insert(["src", "main.py"], FileMarker));
        assert!(tree.insert(["src", "util.py"], FileMarker));

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"src": {"main.py": null, "util.py": null}})
        );
        assert_eq!(tree.file_count(), 2);
    }

    #[test]
    fn test_content_tree_shape() {
        let mut tree = PathTree::new();
        tree.insert(["README.md"], "# hi".to_string());
        tree.insert(["a", "b", "c.txt"], "deep".to_string());

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"README.md": "# hi", "a": {"b": {"c.txt": "deep"}}})
        );
    }

    #[test]
    fn test_directory_cannot_replace_file() {
        let mut tree = PathTree::new();
        assert!(tree.insert(["docs"], "file".to_string()));
        assert!(!tree.insert(["docs", "guide.md"], "nested".to_string()));

        assert_eq!(serde_json::to_value(&tree).unwrap(), json!({"docs": "file"}));
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn test_file_cannot_replace_directory() {
        let mut tree = PathTree::new();
        assert!(tree.insert(["docs", "guide.md"], FileMarker));
        assert!(!tree.insert(["docs"], FileMarker));

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({"docs": {"guide.md": null}})
        );
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn test_replacing_file_keeps_count() {
        let mut tree = PathTree::new();
        assert!(tree.insert(["a", "b.txt"], "old".to_string()));
        assert!(tree.insert(["a", "b.txt"], "new".to_string()));

        assert_eq!(serde_json::to_value(&tree).unwrap(), json!({"a": {"b.txt": "new"}}));
        assert_eq!(tree.file_count(), 1);
    }

    #[test]
    fn test_empty_path_rejected() {
        let mut tree: PathTree<FileMarker> = PathTree::new();
        assert!(!tree.insert(Vec::<String>::new(), FileMarker));
        assert!(tree.is_empty());
    }
}
