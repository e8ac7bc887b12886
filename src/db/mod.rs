pub mod memory;
pub mod models;
pub mod seed;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use models::{
    Activity, ActivityId, ActivityParticipant, ActivityUpdate, InterestCategory, Message, NewActivity,
    NewMessage, NewNotification, NewUser, Notification, User, UserConnection, UserId, UserUpdate,
};

/// Failure modes of the store. Lookups of unknown ids are not errors:
/// they come back as `Ok(None)` / `Ok(false)`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A referenced record does not exist (e.g. joining a missing activity).
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A uniqueness or capacity constraint would be violated.
    #[error("{0}")]
    Conflict(String),
    /// The store's lock was poisoned by a panicking writer.
    #[error("store unavailable")]
    Unavailable,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence interface for everything the server keeps.
///
/// Owns identity generation: every `create_*` assigns a strictly increasing
/// id, and `create_message` assigns a `sent_at` that never goes backwards.
pub trait Repository: Send + Sync {
    // Users
    fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    fn create_user(&self, user: NewUser) -> StoreResult<User>;
    fn update_user(&self, id: UserId, update: UserUpdate) -> StoreResult<Option<User>>;
    fn get_nearby_users(&self, location: &str, limit: usize) -> StoreResult<Vec<User>>;
    fn get_suggested_users(&self, user_id: UserId, limit: usize) -> StoreResult<Vec<User>>;

    // Activities
    fn get_activity(&self, id: ActivityId) -> StoreResult<Option<Activity>>;
    fn get_activities_by_user(&self, user_id: UserId) -> StoreResult<Vec<Activity>>;
    fn get_upcoming_activities(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Activity>>;
    fn get_nearby_activities(
        &self,
        location: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Activity>>;
    fn create_activity(&self, activity: NewActivity) -> StoreResult<Activity>;
    fn update_activity(&self, id: ActivityId, update: ActivityUpdate) -> StoreResult<Option<Activity>>;
    fn delete_activity(&self, id: ActivityId) -> StoreResult<bool>;

    // Participants
    fn get_activity_participants(&self, activity_id: ActivityId) -> StoreResult<Vec<User>>;
    fn is_participant(&self, activity_id: ActivityId, user_id: UserId) -> StoreResult<bool>;
    /// Join `user_id` to an activity. Returns the participant record and
    /// whether it was created by this call; joining twice hands back the
    /// original record with `false`.
    fn add_activity_participant(
        &self,
        activity_id: ActivityId,
        user_id: UserId,
    ) -> StoreResult<(ActivityParticipant, bool)>;
    fn remove_activity_participant(&self, activity_id: ActivityId, user_id: UserId) -> StoreResult<bool>;

    // Messages
    fn get_activity_messages(&self, activity_id: ActivityId) -> StoreResult<Vec<Message>>;
    fn create_message(&self, message: NewMessage) -> StoreResult<Message>;

    // Interest categories
    fn get_all_interest_categories(&self) -> StoreResult<Vec<InterestCategory>>;
    fn create_interest_category(&self, name: &str, icon: Option<&str>) -> StoreResult<InterestCategory>;

    // Follows
    fn get_user_followers(&self, user_id: UserId) -> StoreResult<Vec<User>>;
    fn get_user_following(&self, user_id: UserId) -> StoreResult<Vec<User>>;
    fn create_user_connection(&self, follower_id: UserId, following_id: UserId) -> StoreResult<UserConnection>;
    fn delete_user_connection(&self, follower_id: UserId, following_id: UserId) -> StoreResult<bool>;

    // Notifications
    fn get_user_notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>>;
    fn mark_notification_as_read(&self, id: i64) -> StoreResult<Option<Notification>>;
    fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification>;
}

/// Shared handle to the store, cloned into every handler via `AppState`.
pub type DbPool = Arc<dyn Repository>;

/// Create the in-memory store, optionally seeded with the default
/// interest categories.
pub fn init_db(seed_interests: bool) -> StoreResult<DbPool> {
    let store = memory::MemStore::new();
    if seed_interests {
        let seeded = seed::seed_interest_categories(&store)?;
        tracing::info!(categories = seeded, "Seeded interest categories");
    }
    Ok(Arc::new(store))
}
