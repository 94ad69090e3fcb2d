//! Private user profile documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A user's private profile, holding the denormalized relationship sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Document id; not part of the stored body.
    #[serde(skip)]
    pub user_id: String,
    #[serde(default)]
    pub groups: BTreeSet<String>,
    #[serde(default)]
    pub friends: BTreeSet<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    /// Decode a profile from its document body.
    pub fn from_snapshot(user_id: &str, snapshot: &Value) -> Result<Self, serde_json::Error> {
        let mut profile: UserProfile = serde_json::from_value(snapshot.clone())?;
        profile.user_id = user_id.to_string();
        Ok(profile)
    }

    /// Encode the profile as a document body.
    pub fn to_snapshot(&self) -> Value {
        serde_json::json!({
            "groups": self.groups,
            "friends": self.friends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_sets_default_to_empty() {
        let profile = UserProfile::from_snapshot("u1", &json!({ "displayName": "Ann" })).unwrap();
        assert_eq!(profile.user_id, "u1");
        assert!(profile.groups.is_empty());
        assert!(profile.friends.is_empty());
    }

    #[test]
    fn test_snapshot_round_trip_keeps_sets() {
        let mut profile = UserProfile::new("u1");
        profile.friends.insert("u2".to_string());

        let decoded = UserProfile::from_snapshot("u1", &profile.to_snapshot()).unwrap();
        assert_eq!(decoded, profile);
    }
}
