//! Document addressing and set-union write types.
//!
//! Every derived write produced by relation sync is a set insertion into a
//! set-valued field of a single document. Writes are grouped into a
//! [`WriteBatch`] which the store applies all-or-nothing.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collections known to relation sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Group documents, keyed by group id.
    Groups,
    /// Notification documents, keyed by notification id.
    Notifications,
    /// Private user profile documents, keyed by user id.
    UserProfiles,
}

impl Collection {
    /// The collection name as stored and as delivered by the change feed.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Notifications => "notifications",
            Self::UserProfiles => "user_profiles",
        }
    }

    /// Resolve a collection from its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "groups" => Some(Self::Groups),
            "notifications" => Some(Self::Notifications),
            "user_profiles" => Some(Self::UserProfiles),
            _ => None,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set-valued document fields that relation sync writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SetField {
    /// `UserProfile.groups`
    #[serde(rename = "groups")]
    Groups,
    /// `UserProfile.friends`
    #[serde(rename = "friends")]
    Friends,
    /// `Group.memberIds`
    #[serde(rename = "memberIds")]
    MemberIds,
}

impl SetField {
    /// The field name inside the document body.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Groups => "groups",
            Self::Friends => "friends",
            Self::MemberIds => "memberIds",
        }
    }
}

impl fmt::Display for SetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a single document in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentKey {
    pub collection: Collection,
    pub id: String,
}

impl DocumentKey {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }

    /// Key of a group document.
    pub fn group(group_id: impl Into<String>) -> Self {
        Self::new(Collection::Groups, group_id)
    }

    /// Key of a user's private profile document.
    pub fn user_profile(user_id: impl Into<String>) -> Self {
        Self::new(Collection::UserProfiles, user_id)
    }

    /// Key of a notification document.
    pub fn notification(notification_id: impl Into<String>) -> Self {
        Self::new(Collection::Notifications, notification_id)
    }

    /// Human-readable document path, used in logs and error messages.
    ///
    /// Profiles are addressed the way the client applications address them,
    /// under the user's private sub-collection.
    pub fn path(&self) -> String {
        match self.collection {
            Collection::UserProfiles => format!("users/{}/private/profile", self.id),
            collection => format!("{}/{}", collection, self.id),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Insert `value` into the set stored at `key.field` if it is not already present.
///
/// Applying the same write any number of times leaves the document in the
/// same state as applying it once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnionWrite {
    pub key: DocumentKey,
    pub field: SetField,
    pub value: String,
}

impl UnionWrite {
    pub fn new(key: DocumentKey, field: SetField, value: impl Into<String>) -> Self {
        Self {
            key,
            field,
            value: value.into(),
        }
    }
}

impl fmt::Display for UnionWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ∪= {{{}}}", self.key, self.field, self.value)
    }
}

/// An ordered set of union writes applied as one atomic unit.
///
/// Duplicate writes are collapsed on insertion, so a batch never carries the
/// same triple twice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteBatch {
    writes: Vec<UnionWrite>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Add a write to the batch. Returns `false` if an identical write was already present.
    pub fn push(&mut self, write: UnionWrite) -> bool {
        if self.writes.contains(&write) {
            return false;
        }
        self.writes.push(write);
        true
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, UnionWrite> {
        self.writes.iter()
    }

    pub fn as_slice(&self) -> &[UnionWrite] {
        &self.writes
    }

    /// Whether any write in the batch targets `key`.
    pub fn touches(&self, key: &DocumentKey) -> bool {
        self.writes.iter().any(|w| &w.key == key)
    }
}

impl FromIterator<UnionWrite> for WriteBatch {
    fn from_iter<I: IntoIterator<Item = UnionWrite>>(iter: I) -> Self {
        let mut batch = WriteBatch::new();
        for write in iter {
            batch.push(write);
        }
        batch
    }
}

impl IntoIterator for WriteBatch {
    type Item = UnionWrite;
    type IntoIter = std::vec::IntoIter<UnionWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.into_iter()
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a UnionWrite;
    type IntoIter = std::slice::Iter<'a, UnionWrite>;

    fn into_iter(self) -> Self::IntoIter {
        self.writes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_path_uses_private_subcollection() {
        let key = DocumentKey::user_profile("u1");
        assert_eq!(key.path(), "users/u1/private/profile");
        assert_eq!(DocumentKey::group("g1").path(), "groups/g1");
    }

    #[test]
    fn test_batch_collapses_duplicates() {
        let write = UnionWrite::new(DocumentKey::user_profile("u1"), SetField::Groups, "g1");

        let mut batch = WriteBatch::new();
        assert!(batch.push(write.clone()));
        assert!(!batch.push(write));
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn test_batch_keeps_distinct_writes_in_order() {
        let batch: WriteBatch = vec![
            UnionWrite::new(DocumentKey::group("g1"), SetField::MemberIds, "u2"),
            UnionWrite::new(DocumentKey::user_profile("u2"), SetField::Groups, "g1"),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.as_slice()[0].key, DocumentKey::group("g1"));
        assert!(batch.touches(&DocumentKey::user_profile("u2")));
        assert!(!batch.touches(&DocumentKey::user_profile("u1")));
    }

    #[test]
    fn test_collection_names() {
        for collection in [
            Collection::Groups,
            Collection::Notifications,
            Collection::UserProfiles,
        ] {
            assert_eq!(Collection::from_name(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::from_name("comments"), None);
    }
}
