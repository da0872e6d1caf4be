//! Database operations for the documents table.
//!
//! Each collection lives under one path as a single JSON document. Writing
//! `null` removes the document.

use fairway_engine::Shape;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};

/// Read the document stored at `path`.
pub async fn get_document(pool: &PgPool, path: &str) -> Result<Option<Value>, sqlx::Error> {
    let row = sqlx::query("SELECT value FROM documents WHERE path = $1")
        .bind(path)
        .fetch_optional(pool)
        .await?;

    row.map(|r| r.try_get::<Value, _>("value")).transpose()
}

/// Overwrite the document at `path`, returning the previous value.
pub async fn put_document(
    pool: &PgPool,
    path: &str,
    value: &Value,
) -> Result<Option<Value>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let before = sqlx::query("SELECT value FROM documents WHERE path = $1 FOR UPDATE")
        .bind(path)
        .fetch_optional(&mut *tx)
        .await?
        .map(|r| r.try_get::<Value, _>("value"))
        .transpose()?;

    write_locked(&mut tx, path, value).await?;
    tx.commit().await?;

    Ok(before)
}

/// Read one child of the document at `path`.
pub async fn get_child(pool: &PgPool, path: &str, key: &str) -> Result<Option<Value>, sqlx::Error> {
    let document = get_document(pool, path).await?;
    Ok(Shape::ingest(document).into_entries().remove(key))
}

/// Set or remove (`None`) one child of the document at `path`.
///
/// The row is locked for the duration so concurrent child writes to the
/// same document do not lose each other. A legacy array document is
/// rewritten in keyed form. Returns the child before and after the write.
pub async fn put_child(
    pool: &PgPool,
    path: &str,
    key: &str,
    value: Option<&Value>,
) -> Result<(Option<Value>, Option<Value>), sqlx::Error> {
    let mut tx = pool.begin().await?;

    let current = sqlx::query("SELECT value FROM documents WHERE path = $1 FOR UPDATE")
        .bind(path)
        .fetch_optional(&mut *tx)
        .await?
        .map(|r| r.try_get::<Value, _>("value"))
        .transpose()?;

    let mut entries: Map<String, Value> = Shape::ingest(current).into_entries().into_iter().collect();
    let before = entries.remove(key);
    let after = value.filter(|v| !v.is_null()).cloned();
    if let Some(after) = &after {
        entries.insert(key.to_string(), after.clone());
    }

    let document = if entries.is_empty() {
        Value::Null
    } else {
        Value::Object(entries)
    };
    write_locked(&mut tx, path, &document).await?;
    tx.commit().await?;

    Ok((before, after))
}

async fn write_locked(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    path: &str,
    value: &Value,
) -> Result<(), sqlx::Error> {
    if value.is_null() {
        sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path)
            .execute(&mut **tx)
            .await?;
    } else {
        sqlx::query(
            r#"
            INSERT INTO documents (path, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (path) DO UPDATE SET
                value = EXCLUDED.value,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(path)
        .bind(value)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
