//! Flat path → mutation mappings.

use crate::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A single patch entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum PatchOp {
    /// Assign this value at the path.
    Set(Value),
    /// Remove the value at the path.
    Unset,
}

impl PatchOp {
    /// The assigned value, if this is a `Set`.
    #[must_use]
    pub fn as_set(&self) -> Option<&Value> {
        match self {
            PatchOp::Set(value) => Some(value),
            PatchOp::Unset => None,
        }
    }

    /// Whether this entry removes a value.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, PatchOp::Unset)
    }
}

/// Minimal set of mutations between two value trees.
///
/// Keys are dot-delimited paths; the root path is `""`. An empty patch means
/// "nothing changed", which is distinct from [`Patch::is_delete`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    entries: BTreeMap<String, PatchOp>,
}

impl Patch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the patch has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the patch deletes the whole value.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.entries.len() == 1 && matches!(self.entries.get(""), Some(PatchOp::Unset))
    }

    /// Looks up the entry at a dotted path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&PatchOp> {
        self.entries.get(path)
    }

    /// Whether an entry exists at a dotted path.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Records an assignment.
    pub fn set(&mut self, path: &FieldPath, value: Value) {
        self.entries.insert(path.to_string(), PatchOp::Set(value));
    }

    /// Records a removal.
    pub fn unset(&mut self, path: &FieldPath) {
        self.entries.insert(path.to_string(), PatchOp::Unset);
    }

    /// Iterates entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PatchOp)> {
        self.entries.iter().map(|(path, op)| (path.as_str(), op))
    }

    /// Iterates the paths touched by this patch.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterates `Set` entries.
    pub fn sets(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter()
            .filter_map(|(path, op)| op.as_set().map(|value| (path, value)))
    }

    /// Iterates `Unset` paths.
    pub fn unsets(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, op)| op.is_unset())
            .map(|(path, _)| path)
    }
}

impl<'a> IntoIterator for &'a Patch {
    type Item = (&'a String, &'a PatchOp);
    type IntoIter = std::collections::btree_map::Iter<'a, String, PatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
