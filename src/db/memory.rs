//! In-memory implementation of [`Repository`].
//!
//! All tables live behind one `Mutex` so id assignment, message timestamps
//! and the relational checks (uniqueness, capacity) happen atomically.
//! Tables are `BTreeMap`s keyed by id, so iteration is insertion order.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::models::{
    Activity, ActivityId, ActivityParticipant, ActivityUpdate, InterestCategory, Message, NewActivity,
    NewMessage, NewNotification, NewUser, Notification, User, UserConnection, UserId, UserUpdate,
    PARTICIPANT_JOINED, STATUS_UPCOMING,
};
use super::{Repository, StoreError, StoreResult};
use crate::matching;

#[derive(Default)]
struct Sequences {
    user: i64,
    activity: i64,
    participant: i64,
    message: i64,
    category: i64,
    connection: i64,
    notification: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    activities: BTreeMap<i64, Activity>,
    participants: BTreeMap<i64, ActivityParticipant>,
    messages: BTreeMap<i64, Message>,
    categories: BTreeMap<i64, InterestCategory>,
    connections: BTreeMap<i64, UserConnection>,
    notifications: BTreeMap<i64, Notification>,
    seq: Sequences,
    /// Highest `sent_at` handed out so far; wall-clock steps backwards are
    /// clamped to this.
    last_sent_at: Option<DateTime<Utc>>,
}

impl Tables {
    fn participant_users(&self, activity_id: ActivityId) -> Vec<User> {
        self.participants
            .values()
            .filter(|p| p.activity_id == activity_id)
            .filter_map(|p| self.users.get(&p.user_id).cloned())
            .collect()
    }

    fn users_by_ids(&self, ids: impl Iterator<Item = UserId>) -> Vec<User> {
        ids.filter_map(|id| self.users.get(&id).cloned()).collect()
    }
}

/// Critical sections are short map operations with no I/O, so callers
/// lock directly on the async worker instead of going through
/// `spawn_blocking`.
pub struct MemStore {
    tables: Mutex<Tables>,
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
        }
    }

    fn tables(&self) -> StoreResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| StoreError::Unavailable)
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl Repository for MemStore {
    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables()?.users.get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let mut t = self.tables()?;

        if t.users.values().any(|u| u.username.eq_ignore_ascii_case(&user.username)) {
            return Err(StoreError::Conflict("Username already taken".to_string()));
        }
        if t.users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }

        let id = next(&mut t.seq.user);
        let now = Utc::now();
        let created = User {
            id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            bio: user.bio,
            location: user.location,
            profile_image: user.profile_image,
            interests: user.interests,
            wishlist: user.wishlist,
            created_at: now,
            last_active: now,
        };
        t.users.insert(id, created.clone());
        Ok(created)
    }

    fn update_user(&self, id: UserId, update: UserUpdate) -> StoreResult<Option<User>> {
        let mut t = self.tables()?;
        let Some(user) = t.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        if let Some(bio) = update.bio {
            user.bio = Some(bio);
        }
        if let Some(location) = update.location {
            user.location = Some(location);
        }
        if let Some(profile_image) = update.profile_image {
            user.profile_image = Some(profile_image);
        }
        if let Some(interests) = update.interests {
            user.interests = interests;
        }
        if let Some(wishlist) = update.wishlist {
            user.wishlist = wishlist;
        }
        user.last_active = Utc::now();

        Ok(Some(user.clone()))
    }

    fn get_nearby_users(&self, location: &str, limit: usize) -> StoreResult<Vec<User>> {
        Ok(self
            .tables()?
            .users
            .values()
            .filter(|u| u.location.as_deref().is_some_and(|l| contains_ci(l, location)))
            .take(limit)
            .cloned()
            .collect())
    }

    fn get_suggested_users(&self, user_id: UserId, limit: usize) -> StoreResult<Vec<User>> {
        let t = self.tables()?;
        let Some(me) = t.users.get(&user_id) else {
            return Ok(Vec::new());
        };
        Ok(matching::rank_by_shared_interests(me, t.users.values(), limit))
    }

    fn get_activity(&self, id: ActivityId) -> StoreResult<Option<Activity>> {
        Ok(self.tables()?.activities.get(&id).cloned())
    }

    fn get_activities_by_user(&self, user_id: UserId) -> StoreResult<Vec<Activity>> {
        Ok(self
            .tables()?
            .activities
            .values()
            .filter(|a| a.creator_id == user_id)
            .cloned()
            .collect())
    }

    fn get_upcoming_activities(&self, now: DateTime<Utc>, limit: usize) -> StoreResult<Vec<Activity>> {
        let mut upcoming: Vec<Activity> = self
            .tables()?
            .activities
            .values()
            .filter(|a| a.date_time > now)
            .cloned()
            .collect();
        upcoming.sort_by_key(|a| a.date_time);
        upcoming.truncate(limit);
        Ok(upcoming)
    }

    fn get_nearby_activities(
        &self,
        location: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> StoreResult<Vec<Activity>> {
        let mut nearby: Vec<Activity> = self
            .tables()?
            .activities
            .values()
            .filter(|a| a.date_time > now && contains_ci(&a.location, location))
            .cloned()
            .collect();
        nearby.sort_by_key(|a| a.date_time);
        nearby.truncate(limit);
        Ok(nearby)
    }

    fn create_activity(&self, activity: NewActivity) -> StoreResult<Activity> {
        let mut t = self.tables()?;
        let id = next(&mut t.seq.activity);
        let created = Activity {
            id,
            title: activity.title,
            description: activity.description,
            creator_id: activity.creator_id,
            location: activity.location,
            date_time: activity.date_time,
            max_participants: activity.max_participants,
            categories: activity.categories,
            image: activity.image,
            status: STATUS_UPCOMING.to_string(),
            created_at: Utc::now(),
        };
        t.activities.insert(id, created.clone());
        Ok(created)
    }

    fn update_activity(&self, id: ActivityId, update: ActivityUpdate) -> StoreResult<Option<Activity>> {
        let mut t = self.tables()?;
        let Some(activity) = t.activities.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = update.title {
            activity.title = title;
        }
        if let Some(description) = update.description {
            activity.description = description;
        }
        if let Some(location) = update.location {
            activity.location = location;
        }
        if let Some(date_time) = update.date_time {
            activity.date_time = date_time;
        }
        if let Some(max) = update.max_participants {
            activity.max_participants = Some(max);
        }
        if let Some(categories) = update.categories {
            activity.categories = categories;
        }
        if let Some(image) = update.image {
            activity.image = Some(image);
        }
        if let Some(status) = update.status {
            activity.status = status;
        }

        Ok(Some(activity.clone()))
    }

    fn delete_activity(&self, id: ActivityId) -> StoreResult<bool> {
        let mut t = self.tables()?;
        if t.activities.remove(&id).is_none() {
            return Ok(false);
        }
        // Messages are kept; participant rows go with the activity.
        t.participants.retain(|_, p| p.activity_id != id);
        Ok(true)
    }

    fn get_activity_participants(&self, activity_id: ActivityId) -> StoreResult<Vec<User>> {
        Ok(self.tables()?.participant_users(activity_id))
    }

    fn is_participant(&self, activity_id: ActivityId, user_id: UserId) -> StoreResult<bool> {
        Ok(self
            .tables()?
            .participants
            .values()
            .any(|p| p.activity_id == activity_id && p.user_id == user_id))
    }

    fn add_activity_participant(
        &self,
        activity_id: ActivityId,
        user_id: UserId,
    ) -> StoreResult<(ActivityParticipant, bool)> {
        let mut t = self.tables()?;

        let max_participants = t
            .activities
            .get(&activity_id)
            .ok_or(StoreError::NotFound("Activity"))?
            .max_participants;
        if !t.users.contains_key(&user_id) {
            return Err(StoreError::NotFound("User"));
        }

        if let Some(existing) = t
            .participants
            .values()
            .find(|p| p.activity_id == activity_id && p.user_id == user_id)
        {
            return Ok((existing.clone(), false));
        }

        if let Some(max) = max_participants {
            let joined = t.participants.values().filter(|p| p.activity_id == activity_id).count();
            if joined >= max as usize {
                return Err(StoreError::Conflict("Activity is full".to_string()));
            }
        }

        let id = next(&mut t.seq.participant);
        let participant = ActivityParticipant {
            id,
            activity_id,
            user_id,
            status: PARTICIPANT_JOINED.to_string(),
            joined_at: Utc::now(),
        };
        t.participants.insert(id, participant.clone());
        Ok((participant, true))
    }

    fn remove_activity_participant(&self, activity_id: ActivityId, user_id: UserId) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let found = t
            .participants
            .iter()
            .find(|(_, p)| p.activity_id == activity_id && p.user_id == user_id)
            .map(|(id, _)| *id);
        Ok(match found {
            Some(id) => t.participants.remove(&id).is_some(),
            None => false,
        })
    }

    fn get_activity_messages(&self, activity_id: ActivityId) -> StoreResult<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .tables()?
            .messages
            .values()
            .filter(|m| m.activity_id == activity_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    fn create_message(&self, message: NewMessage) -> StoreResult<Message> {
        let mut t = self.tables()?;

        let now = Utc::now();
        let sent_at = match t.last_sent_at {
            Some(last) if last > now => last,
            _ => now,
        };
        t.last_sent_at = Some(sent_at);

        let id = next(&mut t.seq.message);
        let created = Message {
            id,
            activity_id: message.activity_id,
            sender_id: message.sender_id,
            content: message.content,
            sent_at,
        };
        t.messages.insert(id, created.clone());
        Ok(created)
    }

    fn get_all_interest_categories(&self) -> StoreResult<Vec<InterestCategory>> {
        Ok(self.tables()?.categories.values().cloned().collect())
    }

    fn create_interest_category(&self, name: &str, icon: Option<&str>) -> StoreResult<InterestCategory> {
        let mut t = self.tables()?;
        if t.categories.values().any(|c| c.name.eq_ignore_ascii_case(name)) {
            return Err(StoreError::Conflict(format!("Interest category {} already exists", name)));
        }

        let id = next(&mut t.seq.category);
        let category = InterestCategory {
            id,
            name: name.to_string(),
            icon: icon.map(str::to_string),
        };
        t.categories.insert(id, category.clone());
        Ok(category)
    }

    fn get_user_followers(&self, user_id: UserId) -> StoreResult<Vec<User>> {
        let t = self.tables()?;
        let ids = t
            .connections
            .values()
            .filter(|c| c.following_id == user_id)
            .map(|c| c.follower_id);
        Ok(t.users_by_ids(ids))
    }

    fn get_user_following(&self, user_id: UserId) -> StoreResult<Vec<User>> {
        let t = self.tables()?;
        let ids = t
            .connections
            .values()
            .filter(|c| c.follower_id == user_id)
            .map(|c| c.following_id);
        Ok(t.users_by_ids(ids))
    }

    fn create_user_connection(&self, follower_id: UserId, following_id: UserId) -> StoreResult<UserConnection> {
        let mut t = self.tables()?;
        if follower_id == following_id {
            return Err(StoreError::Conflict("You cannot follow yourself".to_string()));
        }
        if !t.users.contains_key(&following_id) || !t.users.contains_key(&follower_id) {
            return Err(StoreError::NotFound("User"));
        }
        if t
            .connections
            .values()
            .any(|c| c.follower_id == follower_id && c.following_id == following_id)
        {
            return Err(StoreError::Conflict("Already following this user".to_string()));
        }

        let id = next(&mut t.seq.connection);
        let connection = UserConnection {
            id,
            follower_id,
            following_id,
            created_at: Utc::now(),
        };
        t.connections.insert(id, connection.clone());
        Ok(connection)
    }

    fn delete_user_connection(&self, follower_id: UserId, following_id: UserId) -> StoreResult<bool> {
        let mut t = self.tables()?;
        let before = t.connections.len();
        t.connections
            .retain(|_, c| !(c.follower_id == follower_id && c.following_id == following_id));
        Ok(t.connections.len() < before)
    }

    fn get_user_notifications(&self, user_id: UserId) -> StoreResult<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self
            .tables()?
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(notifications)
    }

    fn mark_notification_as_read(&self, id: i64) -> StoreResult<Option<Notification>> {
        let mut t = self.tables()?;
        Ok(t.notifications.get_mut(&id).map(|n| {
            n.is_read = true;
            n.clone()
        }))
    }

    fn create_notification(&self, notification: NewNotification) -> StoreResult<Notification> {
        let mut t = self.tables()?;
        let id = next(&mut t.seq.notification);
        let created = Notification {
            id,
            user_id: notification.user_id,
            kind: notification.kind,
            content: notification.content,
            related_id: notification.related_id,
            is_read: false,
            created_at: Utc::now(),
        };
        t.notifications.insert(id, created.clone());
        Ok(created)
    }
}
