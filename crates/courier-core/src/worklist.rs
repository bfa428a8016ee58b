//! The entries an operation targets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::OperationError;

/// One entry, named relative to its work list's base path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub name: String,
}

impl WorkItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A base directory plus the ordered, non-empty set of entries under it.
///
/// The base is kept as the caller wrote it, so volume prefixes such as
/// `ux0:` survive for partition comparison. Joining never doubles a
/// separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkList {
    base: String,
    items: Vec<WorkItem>,
}

impl WorkList {
    /// Create a work list; fails when `items` is empty.
    pub fn new(base: impl Into<String>, items: Vec<WorkItem>) -> Result<Self, OperationError> {
        if items.is_empty() {
            return Err(OperationError::EmptyWorkList);
        }
        Ok(Self {
            base: with_end_separator(base.into()),
            items,
        })
    }

    /// A work list holding a single entry.
    pub fn single(base: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            base: with_end_separator(base.into()),
            items: vec![WorkItem::new(name)],
        }
    }

    /// Resolve what a command acts on: the whole marked set when the
    /// selection is itself marked, otherwise just the selection.
    pub fn resolve(base: impl Into<String>, selected: &str, marked: &[String]) -> Self {
        if marked.iter().any(|name| name == selected) {
            let items = marked.iter().map(WorkItem::new).collect();
            Self {
                base: with_end_separator(base.into()),
                items,
            }
        } else {
            Self::single(base, selected)
        }
    }

    /// The base path, always ending with a separator.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Full path string of an item under the base.
    pub fn path_string(&self, item: &WorkItem) -> String {
        format!("{}{}", self.base, item.name)
    }

    /// Full path of an item under the base.
    pub fn path_of(&self, item: &WorkItem) -> PathBuf {
        PathBuf::from(self.path_string(item))
    }

    /// Full paths of every item, in order.
    pub fn paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.items.iter().map(|item| self.path_of(item))
    }

    /// Path of an item re-rooted under another directory.
    pub fn target_of(&self, item: &WorkItem, destination: &Path) -> PathBuf {
        destination.join(&item.name)
    }
}

fn with_end_separator(mut base: String) -> String {
    if !base.is_empty() && !base.ends_with(['/', '\\', ':']) {
        base.push('/');
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_gets_separator() {
        let list = WorkList::single("/tmp/dir", "a.txt");
        assert_eq!(list.base(), "/tmp/dir/");
        assert_eq!(list.path_of(&list.items()[0]), PathBuf::from("/tmp/dir/a.txt"));

        let list = WorkList::single("ux0:", "a.txt");
        assert_eq!(list.path_string(&list.items()[0]), "ux0:a.txt");

        let list = WorkList::single("", "inner/file");
        assert_eq!(list.path_string(&list.items()[0]), "inner/file");
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            WorkList::new("/tmp", vec![]),
            Err(OperationError::EmptyWorkList)
        ));
    }

    #[test]
    fn test_resolve_marked() {
        let marked = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let list = WorkList::resolve("/base/", "b", &marked);
        assert_eq!(list.len(), 3);

        let list = WorkList::resolve("/base/", "z", &marked);
        assert_eq!(list.len(), 1);
        assert_eq!(list.items()[0].name, "z");
    }
}
