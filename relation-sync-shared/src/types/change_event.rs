//! Change events delivered by the change feed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::types::document::Collection;

/// The kind of mutation observed on a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Updated,
    Deleted,
}

impl ChangeKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown change kind '{}'", other)),
        }
    }
}

/// A single observed mutation on a document.
///
/// `before` is absent for creations and `after` is absent for deletions.
/// Snapshots are the raw document bodies, with camelCase field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub collection: String,
    pub document_id: String,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Value>,
}

impl ChangeEvent {
    /// Create a creation event.
    pub fn created(collection: impl Into<String>, document_id: impl Into<String>, after: Value) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind: ChangeKind::Created,
            before: None,
            after: Some(after),
        }
    }

    /// Create an update event carrying both snapshots.
    pub fn updated(
        collection: impl Into<String>,
        document_id: impl Into<String>,
        before: Value,
        after: Value,
    ) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind: ChangeKind::Updated,
            before: Some(before),
            after: Some(after),
        }
    }

    /// Create a deletion event.
    pub fn deleted(collection: impl Into<String>, document_id: impl Into<String>, before: Value) -> Self {
        Self {
            collection: collection.into(),
            document_id: document_id.into(),
            kind: ChangeKind::Deleted,
            before: Some(before),
            after: None,
        }
    }

    /// The collection this event belongs to, if it is one relation sync knows.
    pub fn known_collection(&self) -> Option<Collection> {
        Collection::from_name(&self.collection)
    }

    /// The pre-mutation snapshot, treating `null` and `{}` as absent.
    pub fn before_snapshot(&self) -> Option<&Value> {
        non_empty(self.before.as_ref())
    }

    /// The post-mutation snapshot, treating `null` and `{}` as absent.
    pub fn after_snapshot(&self) -> Option<&Value> {
        non_empty(self.after.as_ref())
    }
}

fn non_empty(snapshot: Option<&Value>) -> Option<&Value> {
    match snapshot {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) if map.is_empty() => None,
        Some(value) => Some(value),
    }
}
