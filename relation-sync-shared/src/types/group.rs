//! Group documents.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A group, as stored in the `groups` collection.
///
/// `owner_id` is set once by the creation path and never changes;
/// `member_ids` only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Document id; not part of the stored body.
    #[serde(skip)]
    pub group_id: String,
    pub owner_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub member_ids: BTreeSet<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<String>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Group {
    /// Decode a group from its document body.
    pub fn from_snapshot(group_id: &str, snapshot: &Value) -> Result<Self, serde_json::Error> {
        let mut group: Group = serde_json::from_value(snapshot.clone())?;
        group.group_id = group_id.to_string();
        Ok(group)
    }
}
