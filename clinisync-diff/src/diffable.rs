//! The `Diffable` capability and its implementations for std containers.

use crate::{DiffError, DiffResult, FieldPath, Patch};
use chrono::{DateTime, NaiveDate, Utc};
use clinisync_types::ExternalId;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Runtime kind of a node in a value tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Object,
    Map,
    List,
    Null,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Scalar => "scalar",
            NodeKind::Object => "object",
            NodeKind::Map => "map",
            NodeKind::List => "list",
            NodeKind::Null => "null",
        };
        f.write_str(name)
    }
}

/// A value that can be structurally compared against an older version of
/// itself.
///
/// Implementations only handle the "both present" case in [`diff_from`];
/// absence, insertion and deletion are handled uniformly by [`diff_at`].
///
/// [`diff_from`]: Diffable::diff_from
pub trait Diffable {
    /// Kind of this node, checked against the old node before diffing.
    fn kind(&self) -> NodeKind;

    /// Whether this node stands for "no value" (`None`, JSON `null`).
    fn is_absent(&self) -> bool {
        false
    }

    /// Serializes this node for a `Set` entry.
    fn to_value(&self) -> DiffResult<Value>;

    /// Records this node as freshly inserted at `path`.
    ///
    /// The default assigns the whole value.
    fn insert_into(&self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        patch.set(path, self.to_value()?);
        Ok(())
    }

    /// Records the changes from `old` to `self` at `path`. Both are present
    /// and of the same kind.
    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()>;
}

/// Diffs two optional nodes at `path`, appending entries to `patch`.
pub fn diff_at<T: Diffable + ?Sized>(
    old: Option<&T>,
    new: Option<&T>,
    path: &FieldPath,
    patch: &mut Patch,
) -> DiffResult<()> {
    let old = old.filter(|value| !value.is_absent());
    let new = new.filter(|value| !value.is_absent());

    match (old, new) {
        (None, None) => Ok(()),
        (Some(_), None) => {
            patch.unset(path);
            Ok(())
        }
        (None, Some(new)) => new.insert_into(path, patch),
        (Some(old), Some(new)) => {
            let (old_kind, new_kind) = (old.kind(), new.kind());
            if old_kind != new_kind {
                return Err(DiffError::KindMismatch {
                    path: path.to_string(),
                    old: old_kind,
                    new: new_kind,
                });
            }
            new.diff_from(old, path, patch)
        }
    }
}

/// Computes the minimal patch that turns `old` into `new`.
///
/// - both absent, or equal: empty patch
/// - `new` absent: a single root `Unset` ([`Patch::is_delete`])
/// - `old` absent: an insert of `new`
pub fn diff<T: Diffable + ?Sized>(old: Option<&T>, new: Option<&T>) -> DiffResult<Patch> {
    let mut patch = Patch::new();
    diff_at(old, new, &FieldPath::root(), &mut patch)?;
    Ok(patch)
}

// ── Scalars ─────────────────────────────────────────────────────

crate::diffable_scalar!(
    String,
    bool,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f64,
    DateTime<Utc>,
    NaiveDate,
    ExternalId,
);

// ── Option ──────────────────────────────────────────────────────

impl<T: Diffable> Diffable for Option<T> {
    fn kind(&self) -> NodeKind {
        match self {
            Some(value) => value.kind(),
            None => NodeKind::Null,
        }
    }

    fn is_absent(&self) -> bool {
        match self {
            Some(value) => value.is_absent(),
            None => true,
        }
    }

    fn to_value(&self) -> DiffResult<Value> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn insert_into(&self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        match self {
            Some(value) => value.insert_into(path, patch),
            None => Ok(()),
        }
    }

    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        diff_at(old.as_ref(), self.as_ref(), path, patch)
    }
}

// ── Keyed maps ──────────────────────────────────────────────────

pub(crate) fn check_key(path: &FieldPath, key: &str) -> DiffResult<()> {
    if key.is_empty() || key.contains('.') {
        return Err(DiffError::InvalidKey {
            path: path.to_string(),
            key: key.to_string(),
        });
    }
    Ok(())
}

fn map_to_value<'a, V, I>(entries: I) -> DiffResult<Value>
where
    V: Diffable + 'a,
    I: Iterator<Item = (&'a String, &'a V)>,
{
    let mut map = Map::new();
    for (key, value) in entries {
        map.insert(key.clone(), value.to_value()?);
    }
    Ok(Value::Object(map))
}

fn diff_maps<'a, V, I, F>(
    new_entries: I,
    old_keys: impl Iterator<Item = &'a String>,
    lookup_old: F,
    contains_new: impl Fn(&str) -> bool,
    path: &FieldPath,
    patch: &mut Patch,
) -> DiffResult<()>
where
    V: Diffable + 'a,
    I: Iterator<Item = (&'a String, &'a V)>,
    F: Fn(&str) -> Option<&'a V>,
{
    for (key, value) in new_entries {
        check_key(path, key)?;
        diff_at(lookup_old(key), Some(value), &path.child(key.as_str()), patch)?;
    }
    for key in old_keys {
        if !contains_new(key) {
            check_key(path, key)?;
            diff_at(lookup_old(key), None, &path.child(key.as_str()), patch)?;
        }
    }
    Ok(())
}

impl<V: Diffable> Diffable for BTreeMap<String, V> {
    fn kind(&self) -> NodeKind {
        NodeKind::Map
    }

    fn to_value(&self) -> DiffResult<Value> {
        map_to_value(self.iter())
    }

    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        diff_maps(
            self.iter(),
            old.keys(),
            |key| old.get(key),
            |key| self.contains_key(key),
            path,
            patch,
        )
    }
}

impl<V: Diffable, S: std::hash::BuildHasher> Diffable for HashMap<String, V, S> {
    fn kind(&self) -> NodeKind {
        NodeKind::Map
    }

    fn to_value(&self) -> DiffResult<Value> {
        map_to_value(self.iter())
    }

    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        diff_maps(
            self.iter(),
            old.keys(),
            |key| old.get(key),
            |key| self.contains_key(key),
            path,
            patch,
        )
    }
}

// ── Identity lists ──────────────────────────────────────────────

/// A list element with a stable identity.
pub trait Keyed {
    /// Key used to correlate old and new versions of this element.
    fn diff_key(&self) -> String;
}

impl<T: Diffable + Keyed> Diffable for Vec<T> {
    fn kind(&self) -> NodeKind {
        NodeKind::List
    }

    fn to_value(&self) -> DiffResult<Value> {
        self.iter()
            .map(Diffable::to_value)
            .collect::<DiffResult<Vec<_>>>()
            .map(Value::Array)
    }

    /// Matched elements are diffed in place at their old position; unmatched
    /// elements are appended after the old list. Elements missing from `self`
    /// are left alone.
    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(old.len());
        for (index, item) in old.iter().enumerate() {
            positions.entry(item.diff_key()).or_insert(index);
        }

        let mut seen = HashSet::with_capacity(self.len());
        let mut next_index = old.len();
        for item in self {
            let key = item.diff_key();
            match positions.get(&key) {
                Some(&index) => diff_at(Some(&old[index]), Some(item), &path.index(index), patch)?,
                None => {
                    patch.set(&path.index(next_index), item.to_value()?);
                    next_index += 1;
                }
            }
            if !seen.insert(key.clone()) {
                return Err(DiffError::DuplicateKey {
                    path: path.to_string(),
                    key,
                });
            }
        }
        Ok(())
    }
}
