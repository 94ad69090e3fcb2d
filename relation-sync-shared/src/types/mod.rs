//! This module defines the core data structures used across relation sync.
//! It re-exports the entity types, the change event and the write types.

pub mod change_event;
pub mod document;
pub mod group;
pub mod notification;
pub mod user_profile;

pub use change_event::{ChangeEvent, ChangeKind};
pub use document::{Collection, DocumentKey, SetField, UnionWrite, WriteBatch};
pub use group::Group;
pub use notification::{Notification, NotificationType, ACCEPTED_STATUS};
pub use user_profile::UserProfile;
