//! Records returned by the change log.

use chrono::{DateTime, Utc};
use relation_sync_shared::ChangeEvent;

/// A change event together with its position in the change log.
///
/// Sequences never decrease in log order, and records written together may
/// share one. The cursor stores the sequence of the last record that was
/// fully handled.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRecord {
    pub sequence: i64,
    pub event: ChangeEvent,
    pub recorded_at: DateTime<Utc>,
}

impl ChangeRecord {
    pub fn new(sequence: i64, event: ChangeEvent) -> Self {
        Self {
            sequence,
            event,
            recorded_at: Utc::now(),
        }
    }
}
