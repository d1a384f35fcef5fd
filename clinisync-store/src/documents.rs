//! Document operations on a raw connection, shared by the auto-commit store
//! API and by transactions.

use crate::query::{index_name, json_path, sql_value};
use crate::{StoreError, StoreResult, StoredDocument, WriteOutcome, ID_FIELD};
use clinisync_diff::{apply_patch, Patch};
use clinisync_types::StorageId;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

pub(crate) const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        version INTEGER NOT NULL,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );

    CREATE TABLE IF NOT EXISTS singletons (
        name TEXT PRIMARY KEY,
        body TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
";

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(String, i64, String)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn decode_row((id, version, body): (String, i64, String)) -> StoreResult<StoredDocument> {
    let id = StorageId::parse(&id)
        .map_err(|e| StoreError::InvalidData(format!("bad storage id `{id}`: {e}")))?;
    Ok(StoredDocument {
        id,
        version,
        body: serde_json::from_str(&body)?,
    })
}

pub(crate) fn get(
    conn: &Connection,
    collection: &str,
    id: StorageId,
) -> StoreResult<Option<StoredDocument>> {
    conn.query_row(
        "SELECT id, version, body FROM documents WHERE collection = ?1 AND id = ?2",
        params![collection, id.to_string()],
        read_row,
    )
    .optional()?
    .map(decode_row)
    .transpose()
}

pub(crate) fn find_by_field(
    conn: &Connection,
    collection: &str,
    path: &str,
    value: &Value,
) -> StoreResult<Option<StoredDocument>> {
    if path == ID_FIELD {
        let id = value
            .as_str()
            .ok_or_else(|| StoreError::InvalidQuery(format!("`{ID_FIELD}` must be a string")))?;
        let id = StorageId::parse(id)
            .map_err(|e| StoreError::InvalidQuery(format!("bad storage id `{id}`: {e}")))?;
        return get(conn, collection, id);
    }

    // The JSON path is inlined so expression indexes from `ensure_index`
    // match; `json_path` only emits `$`, `.`, `[n]` and identifier characters.
    let json_path = json_path(path)?;
    let row = match sql_value(value)? {
        Some(sql) => conn
            .query_row(
                &format!(
                    "SELECT id, version, body FROM documents
                     WHERE collection = ?1 AND json_extract(body, '{json_path}') = ?2
                     ORDER BY rowid LIMIT 1"
                ),
                params![collection, sql],
                read_row,
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT id, version, body FROM documents
                     WHERE collection = ?1 AND json_extract(body, '{json_path}') IS NULL
                     ORDER BY rowid LIMIT 1"
                ),
                params![collection],
                read_row,
            )
            .optional()?,
    };
    row.map(decode_row).transpose()
}

pub(crate) fn list(conn: &Connection, collection: &str) -> StoreResult<Vec<StoredDocument>> {
    let mut stmt = conn.prepare(
        "SELECT id, version, body FROM documents WHERE collection = ?1 ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![collection], read_row)?;

    let mut result = Vec::new();
    for row in rows {
        result.push(decode_row(row?)?);
    }
    Ok(result)
}

pub(crate) fn count(conn: &Connection, collection: &str) -> StoreResult<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM documents WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or_default())
}

pub(crate) fn update_or_insert(
    conn: &Connection,
    collection: &str,
    id: StorageId,
    patch: &Patch,
    upsert: bool,
) -> StoreResult<WriteOutcome> {
    match get(conn, collection, id)? {
        Some(existing) => {
            if patch.is_delete() {
                conn.execute(
                    "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
                    params![collection, id.to_string()],
                )?;
                debug!("Deleted {}/{}", collection, id);
                return Ok(WriteOutcome::Deleted);
            }

            let mut body = existing.body;
            apply_patch(&mut body, patch)?;
            conn.execute(
                "UPDATE documents SET body = ?3, version = version + 1, updated_at = ?4
                 WHERE collection = ?1 AND id = ?2",
                params![collection, id.to_string(), serde_json::to_string(&body)?, now()],
            )?;
            debug!("Updated {}/{} ({} paths)", collection, id, patch.len());
            Ok(WriteOutcome::Updated)
        }
        None if !upsert || patch.is_delete() => Ok(WriteOutcome::NotFound),
        None => {
            let mut body = Value::Object(Map::new());
            apply_patch(&mut body, patch)?;
            conn.execute(
                "INSERT INTO documents (collection, id, version, body, updated_at)
                 VALUES (?1, ?2, 1, ?3, ?4)",
                params![collection, id.to_string(), serde_json::to_string(&body)?, now()],
            )?;
            debug!("Inserted {}/{} ({} paths)", collection, id, patch.len());
            Ok(WriteOutcome::Inserted)
        }
    }
}

pub(crate) fn ensure_index(conn: &Connection, collection: &str, path: &str) -> StoreResult<()> {
    let json_path = json_path(path)?;
    conn.execute_batch(&format!(
        "CREATE INDEX IF NOT EXISTS {} ON documents(collection, json_extract(body, '{}'));",
        index_name(collection, path),
        json_path,
    ))?;
    debug!("Ensured index on {}.{}", collection, path);
    Ok(())
}

pub(crate) fn get_singleton<T: DeserializeOwned>(
    conn: &Connection,
    name: &str,
) -> StoreResult<Option<T>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM singletons WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|body| serde_json::from_str(&body).map_err(StoreError::from))
        .transpose()
}

pub(crate) fn put_singleton<T: Serialize>(
    conn: &Connection,
    name: &str,
    value: &T,
) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO singletons (name, body, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        params![name, serde_json::to_string(value)?, now()],
    )?;
    Ok(())
}
