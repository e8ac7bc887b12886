//! Record types held by the store, plus the input shapes used to create
//! or patch them. All records serialize as camelCase JSON so the same
//! structs double as REST and WebSocket payloads.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type ActivityId = i64;
pub type MessageId = i64;

/// Default lifecycle tag for a freshly created activity.
pub const STATUS_UPCOMING: &str = "upcoming";

/// Status of a participant record. Only "joined" exists today.
pub const PARTICIPANT_JOINED: &str = "joined";

/// Registered user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_image: Option<String>,
    pub interests: BTreeSet<String>,
    pub wishlist: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub wishlist: BTreeSet<String>,
}

/// Partial profile update. Identity, username, email and timestamps
/// are not patchable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_image: Option<String>,
    pub interests: Option<BTreeSet<String>>,
    pub wishlist: Option<BTreeSet<String>>,
}

/// A user-created event/meetup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub title: String,
    pub description: String,
    pub creator_id: UserId,
    pub location: String,
    pub date_time: DateTime<Utc>,
    pub max_participants: Option<u32>,
    pub categories: BTreeSet<String>,
    pub image: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActivity {
    pub title: String,
    pub description: String,
    /// Filled in from the authenticated caller, never from the body.
    #[serde(skip)]
    pub creator_id: UserId,
    pub location: String,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub date_time: Option<DateTime<Utc>>,
    pub max_participants: Option<u32>,
    pub categories: Option<BTreeSet<String>>,
    pub image: Option<String>,
    pub status: Option<String>,
}

/// Join record linking a user to an activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityParticipant {
    pub id: i64,
    pub activity_id: ActivityId,
    pub user_id: UserId,
    pub status: String,
    pub joined_at: DateTime<Utc>,
}

/// Persisted chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub activity_id: ActivityId,
    pub sender_id: UserId,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub activity_id: ActivityId,
    pub sender_id: UserId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestCategory {
    pub id: i64,
    pub name: String,
    pub icon: Option<String>,
}

/// Follow edge: `follower_id` follows `following_id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConnection {
    pub id: i64,
    pub follower_id: UserId,
    pub following_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotificationKind {
    ActivityJoin,
    NewFollower,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub content: String,
    pub related_id: Option<i64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub content: String,
    pub related_id: Option<i64>,
}
