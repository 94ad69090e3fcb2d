//! Reaction to group creation.

use relation_sync_shared::{DocumentKey, SetField, UnionWrite, WriteBatch};
use serde_json::Value;

use crate::errors::ReactionError;

/// Derives the owner-profile update for a newly created group.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupCreationReactor;

impl GroupCreationReactor {
    pub fn new() -> Self {
        Self
    }

    /// Derive `UserProfile(ownerId).groups ∪= {groupId}`.
    ///
    /// Produces exactly one write. The group document itself is never touched.
    pub fn derive(&self, group_id: &str, snapshot: Option<&Value>) -> Result<WriteBatch, ReactionError> {
        let snapshot = snapshot.ok_or_else(|| {
            ReactionError::missing_data(format!("no data associated with created group {}", group_id))
        })?;

        if group_id.trim().is_empty() {
            return Err(ReactionError::validation("created group has a blank id"));
        }

        // Only the owner matters here; the rest of the body is not validated.
        let owner_id = match snapshot.get("ownerId") {
            Some(Value::String(owner_id)) if !owner_id.trim().is_empty() => owner_id,
            Some(Value::String(_)) => {
                return Err(ReactionError::validation(format!(
                    "group {} has a blank ownerId",
                    group_id
                )));
            }
            Some(other) if !other.is_null() => {
                return Err(ReactionError::validation(format!(
                    "group {} has a non-string ownerId: {}",
                    group_id, other
                )));
            }
            _ => {
                return Err(ReactionError::validation(format!(
                    "group {} has no ownerId",
                    group_id
                )));
            }
        };

        let mut batch = WriteBatch::new();
        batch.push(UnionWrite::new(
            DocumentKey::user_profile(owner_id.as_str()),
            SetField::Groups,
            group_id,
        ));
        Ok(batch)
    }
}
