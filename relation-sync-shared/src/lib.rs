//! # Relation Sync Shared
//!
//! This crate defines the data structures shared across the relation sync
//! ecosystem: the persisted entities (groups, user profiles, notifications),
//! the change events observed on them, and the set-union writes derived from
//! those events.

pub mod types;

pub use types::change_event::{ChangeEvent, ChangeKind};
pub use types::document::{Collection, DocumentKey, SetField, UnionWrite, WriteBatch};
pub use types::group::Group;
pub use types::notification::{Notification, NotificationType, ACCEPTED_STATUS};
pub use types::user_profile::UserProfile;
