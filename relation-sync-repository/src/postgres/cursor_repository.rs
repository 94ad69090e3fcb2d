//! PostgreSQL implementation of the cursor repository.
//!
//! Stores cursor state in a `meta` table so consumption resumes after restarts.

use async_trait::async_trait;

use crate::errors::FeedError;
use crate::CursorRepository;

/// PostgreSQL-backed cursor repository.
pub struct PostgresCursorRepository {
    pool: sqlx::PgPool,
}

impl PostgresCursorRepository {
    /// Creates a new cursor repository over a pool whose schema includes the `meta` table.
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CursorRepository for PostgresCursorRepository {
    async fn get_cursor(&self, id: &str) -> Result<Option<i64>, FeedError> {
        let sequence = sqlx::query_scalar::<_, i64>("SELECT sequence FROM meta WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sequence)
    }

    async fn save_cursor(&self, id: &str, sequence: i64) -> Result<(), FeedError> {
        sqlx::query(
            "INSERT INTO meta (id, sequence, updated_at) VALUES ($1, $2, now()) \
             ON CONFLICT (id) DO UPDATE SET sequence = $2, updated_at = now()",
        )
        .bind(id)
        .bind(sequence)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
