//! PostgreSQL implementation of the document store.
//!
//! Documents are JSONB bodies in the `documents` table. Set-valued fields are
//! JSON arrays of strings; a union write appends the value only when the array
//! does not already contain it.

use async_trait::async_trait;
use relation_sync_shared::{DocumentKey, UnionWrite};
use serde_json::Value;
use tracing::debug;

use crate::errors::StoreError;
use crate::DocumentStore;

/// Shape of the target document and field, locked for the rest of the transaction.
const SHAPE_SQL: &str = r#"
SELECT jsonb_typeof(data) AS body_type, jsonb_typeof(data -> $3::text) AS field_type
FROM documents
WHERE collection = $1 AND id = $2
FOR UPDATE
"#;

/// Append `$4` to the array at `$3`, treating a missing or `null` field as empty.
const UNION_SQL: &str = r#"
UPDATE documents
SET data = jsonb_set(
        data,
        ARRAY[$3::text],
        CASE
            WHEN jsonb_typeof(data -> $3::text) IS DISTINCT FROM 'array'
                THEN jsonb_build_array($4::text)
            WHEN (data -> $3::text) @> jsonb_build_array($4::text)
                THEN data -> $3::text
            ELSE (data -> $3::text) || jsonb_build_array($4::text)
        END,
        true
    ),
    updated_at = now()
WHERE collection = $1 AND id = $2
"#;

/// Document store over a PostgreSQL `documents` table.
pub struct PostgresDocumentStore {
    pool: sqlx::PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }

    /// Create or replace a document body.
    ///
    /// Used to seed documents; relation sync itself only ever updates.
    pub async fn insert_document(&self, key: &DocumentKey, data: &Value) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, id) DO UPDATE SET data = $3, updated_at = now()",
        )
        .bind(key.collection.as_str())
        .bind(&key.id)
        .bind(data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn apply_union_tx(
        &self,
        write: &UnionWrite,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<(), StoreError> {
        let shape = sqlx::query_as::<_, (Option<String>, Option<String>)>(SHAPE_SQL)
            .bind(write.key.collection.as_str())
            .bind(&write.key.id)
            .bind(write.field.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        match shape {
            None => return Err(StoreError::document_not_found(write.key.path())),
            Some((body_type, _)) if body_type.as_deref() != Some("object") => {
                return Err(StoreError::serialization(format!(
                    "{} is not a JSON object",
                    write.key.path()
                )));
            }
            Some((_, Some(field_type))) if field_type != "array" && field_type != "null" => {
                return Err(StoreError::serialization(format!(
                    "{}.{} is not an array",
                    write.key.path(),
                    write.field
                )));
            }
            Some(_) => {}
        }

        sqlx::query(UNION_SQL)
            .bind(write.key.collection.as_str())
            .bind(&write.key.id)
            .bind(write.field.as_str())
            .bind(&write.value)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn get(&self, key: &DocumentKey) -> Result<Option<Value>, StoreError> {
        let data = sqlx::query_scalar::<_, Value>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(key.collection.as_str())
        .bind(&key.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(data)
    }

    async fn batch_write(&self, writes: &[UnionWrite]) -> Result<(), StoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for write in writes {
            // Dropping the transaction on error rolls it back.
            self.apply_union_tx(write, &mut tx).await?;
        }
        tx.commit().await?;

        debug!(writes = writes.len(), "Committed union batch");
        Ok(())
    }
}
