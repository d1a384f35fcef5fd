//! Translation of field lookups into SQL.

use crate::{StoreError, StoreResult};
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Converts a dotted field path into a SQLite JSON path (`source.id` →
/// `$.source.id`, `appointments.2.id` → `$.appointments[2].id`).
pub(crate) fn json_path(path: &str) -> StoreResult<String> {
    let mut out = String::from("$");
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(StoreError::InvalidQuery(format!("empty segment in `{path}`")));
        }
        if let Ok(index) = segment.parse::<usize>() {
            out.push_str(&format!("[{index}]"));
            continue;
        }
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(StoreError::InvalidQuery(format!(
                "unsupported segment `{segment}` in `{path}`"
            )));
        }
        out.push('.');
        out.push_str(segment);
    }
    Ok(out)
}

/// Converts a JSON scalar into the value `json_extract` would return for it.
/// `None` means SQL `NULL`.
pub(crate) fn sql_value(value: &Value) -> StoreResult<Option<SqlValue>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(SqlValue::Integer(i64::from(*b)))),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(SqlValue::Integer(i)))
            } else if let Some(f) = n.as_f64() {
                Ok(Some(SqlValue::Real(f)))
            } else {
                Err(StoreError::InvalidQuery(format!("number out of range: {n}")))
            }
        }
        Value::String(s) => Ok(Some(SqlValue::Text(s.clone()))),
        Value::Array(_) | Value::Object(_) => Err(StoreError::InvalidQuery(
            "lookups only match scalar values".into(),
        )),
    }
}

/// Index name for a field path, safe to splice into DDL.
///
/// Non-alphanumeric characters are escaped as `_` plus six hex digits, so
/// `__` never occurs inside a part and distinct pairs get distinct names.
pub(crate) fn index_name(collection: &str, path: &str) -> String {
    let escape = |s: &str| -> String {
        s.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_string()
                } else {
                    format!("_{:06x}", u32::from(c))
                }
            })
            .collect()
    };
    format!("idx_{}__{}", escape(collection), escape(path))
}
