//! `Diffable` for dynamic JSON values.
//!
//! Objects are keyed maps, arrays carry no element identity and are replaced
//! whole, `null` is absent.

use crate::diffable::check_key;
use crate::{diff_at, Diffable, DiffResult, FieldPath, NodeKind, Patch};
use serde_json::Value;

impl Diffable for Value {
    fn kind(&self) -> NodeKind {
        match self {
            Value::Null => NodeKind::Null,
            Value::Object(_) => NodeKind::Map,
            Value::Array(_) => NodeKind::List,
            Value::Bool(_) | Value::Number(_) | Value::String(_) => NodeKind::Scalar,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_null()
    }

    fn to_value(&self) -> DiffResult<Value> {
        Ok(self.clone())
    }

    fn diff_from(&self, old: &Self, path: &FieldPath, patch: &mut Patch) -> DiffResult<()> {
        match (old, self) {
            (Value::Object(old_map), Value::Object(new_map)) => {
                for (key, value) in new_map {
                    check_key(path, key)?;
                    diff_at(old_map.get(key), Some(value), &path.child(key.as_str()), patch)?;
                }
                for (key, value) in old_map {
                    if !new_map.contains_key(key) {
                        check_key(path, key)?;
                        diff_at(Some(value), None, &path.child(key.as_str()), patch)?;
                    }
                }
            }
            _ => {
                if old != self {
                    patch.set(path, self.clone());
                }
            }
        }
        Ok(())
    }
}
