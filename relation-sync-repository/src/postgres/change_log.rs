//! PostgreSQL implementation of the change log, reading the `change_events` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use relation_sync_shared::{ChangeEvent, ChangeKind};
use serde_json::Value;

use crate::errors::FeedError;
use crate::types::ChangeRecord;
use crate::ChangeLogRepository;

/// Transactions that are complete and older than every running transaction.
/// Events of one transaction share its position and are never split across pages.
const FETCH_SQL: &str = r#"
WITH horizon AS (
    SELECT pg_snapshot_xmin(pg_current_snapshot())::text::bigint AS xmin
),
ready AS (
    SELECT DISTINCT tx_id
    FROM change_events, horizon
    WHERE tx_id > $1 AND tx_id < horizon.xmin
    ORDER BY tx_id
    LIMIT $2
)
SELECT e.tx_id AS sequence, e.collection, e.document_id, e.kind, e.before, e.after, e.recorded_at
FROM change_events e
JOIN ready USING (tx_id)
ORDER BY e.tx_id, e.id
"#;

#[derive(sqlx::FromRow)]
struct ChangeEventRow {
    sequence: i64,
    collection: String,
    document_id: String,
    kind: String,
    before: Option<Value>,
    after: Option<Value>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<ChangeEventRow> for ChangeRecord {
    type Error = FeedError;

    fn try_from(row: ChangeEventRow) -> Result<Self, Self::Error> {
        let kind: ChangeKind = row
            .kind
            .parse()
            .map_err(|e: String| FeedError::malformed(row.sequence, e))?;

        Ok(ChangeRecord {
            sequence: row.sequence,
            event: ChangeEvent {
                collection: row.collection,
                document_id: row.document_id,
                kind,
                before: row.before,
                after: row.after,
            },
            recorded_at: row.recorded_at,
        })
    }
}

/// Change log backed by the `change_events` outbox table.
///
/// The position of a record is the id of the transaction that wrote it, so
/// `limit` bounds the number of transactions per page rather than events.
pub struct PostgresChangeLog {
    pool: sqlx::PgPool,
}

impl PostgresChangeLog {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChangeLogRepository for PostgresChangeLog {
    async fn fetch_after(&self, after: i64, limit: usize) -> Result<Vec<ChangeRecord>, FeedError> {
        let rows = sqlx::query_as::<_, ChangeEventRow>(FETCH_SQL)
            .bind(after)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ChangeRecord::try_from).collect()
    }
}
