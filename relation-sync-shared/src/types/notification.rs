//! Notification documents.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The status value that marks a notification as accepted by its receiver.
pub const ACCEPTED_STATUS: &str = "accepted";

/// Category of a notification.
///
/// Values outside the known set are kept verbatim so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    Friend,
    GroupInvitation,
    Reaction,
    Comment,
    Unrecognized(String),
}

impl NotificationType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Friend => "friend",
            Self::GroupInvitation => "groupInvitation",
            Self::Reaction => "reaction",
            Self::Comment => "comment",
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl Default for NotificationType {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for NotificationType {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "friend" => Self::Friend,
            "groupInvitation" => Self::GroupInvitation,
            "reaction" => Self::Reaction,
            "comment" => Self::Comment,
            _ => Self::Unrecognized(raw),
        }
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Unrecognized(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A notification, as stored in the `notifications` collection.
///
/// Every field is optional on decode: which ones are required depends on
/// the transition being handled, and is checked by the reactor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Document id; not part of the stored body.
    #[serde(skip)]
    pub notification_id: String,
    #[serde(rename = "type", default)]
    pub notification_type: NotificationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub send_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receive_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Only meaningful for group invitations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_item_id: Option<String>,
}

impl Notification {
    /// Decode a notification from its document body.
    pub fn from_snapshot(notification_id: &str, snapshot: &Value) -> Result<Self, serde_json::Error> {
        let mut notification: Notification = serde_json::from_value(snapshot.clone())?;
        notification.notification_id = notification_id.to_string();
        Ok(notification)
    }

    pub fn is_accepted(&self) -> bool {
        self.status.as_deref() == Some(ACCEPTED_STATUS)
    }

    /// Whether going from `before` to `after` is the acceptance transition:
    /// not accepted before, exactly accepted after.
    pub fn is_acceptance(before: &Notification, after: &Notification) -> bool {
        !before.is_accepted() && after.is_accepted()
    }
}
