//! Applying patches to JSON documents.
//!
//! Mirrors the set/unset update primitives of a document store: `Set` creates
//! any missing intermediate objects, numeric segments index into arrays
//! (padding with `null`), and `Unset` of a missing path is a no-op.

use crate::{DiffError, DiffResult, FieldPath, Patch, PatchOp};
use serde_json::{Map, Value};

/// Applies every entry of `patch` to `doc`.
///
/// A root `Set` replaces the document and a root `Unset` leaves `null`.
pub fn apply_patch(doc: &mut Value, patch: &Patch) -> DiffResult<()> {
    for (path, op) in patch.iter() {
        apply_op(doc, &FieldPath::parse(path), op)?;
    }
    Ok(())
}

/// Reads the value at a dotted path. The empty path is the document itself.
pub fn value_at<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    let path = FieldPath::parse(path);
    let mut node = doc;
    for segment in path.segments() {
        node = match node {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn apply_op(doc: &mut Value, path: &FieldPath, op: &PatchOp) -> DiffResult<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *doc = match op {
            PatchOp::Set(value) => value.clone(),
            PatchOp::Unset => Value::Null,
        };
        return Ok(());
    };

    match op {
        PatchOp::Set(value) => {
            let mut node = doc;
            for (depth, segment) in parents.iter().enumerate() {
                node = child_or_create(node, segment, path, depth)?;
            }
            *child_or_create(node, last, path, parents.len())? = value.clone();
        }
        PatchOp::Unset => {
            let mut node = doc;
            for segment in parents {
                node = match child_mut(node, segment) {
                    Some(child) => child,
                    None => return Ok(()),
                };
            }
            match node {
                Value::Object(map) => {
                    map.remove(last);
                }
                Value::Array(items) => {
                    if let Some(slot) = last.parse::<usize>().ok().and_then(|i| items.get_mut(i)) {
                        *slot = Value::Null;
                    }
                }
                _ => {}
            }
        }
    }
    Ok(())
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?),
        _ => None,
    }
}

fn child_or_create<'a>(
    node: &'a mut Value,
    segment: &str,
    path: &FieldPath,
    depth: usize,
) -> DiffResult<&'a mut Value> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => Ok(map.entry(segment.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = segment
                .parse::<usize>()
                .map_err(|_| conflict(path, depth))?;
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => Err(conflict(path, depth)),
    }
}

fn conflict(path: &FieldPath, depth: usize) -> DiffError {
    DiffError::PathConflict {
        path: path.to_string(),
        blocked_at: path.segments()[..depth].join("."),
    }
}
