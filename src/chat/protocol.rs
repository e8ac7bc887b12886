//! Activity chat protocol: one inbound frame in, a list of outbound
//! effects out.
//!
//! [`ChatService::handle`] never touches a socket. It validates the
//! submission, persists it, snapshots the participant list and returns
//! what should be sent where; [`super::broadcast::dispatch`] then applies
//! those effects to the connection registry.

use crate::db::models::{ActivityId, Message, NewMessage, UserId};
use crate::db::{DbPool, StoreError};
use crate::ws::protocol::{decode_client_frame, ClientEnvelope, ServerEnvelope};

/// Default maximum message length, in characters.
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 4000;

/// Why a chat submission was refused. The `Display` text is what the
/// sender sees in the `error` envelope.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message content cannot be empty")]
    EmptyContent,
    #[error("Message content exceeds {max} characters")]
    ContentTooLong { max: usize },
    #[error("senderId does not match the connected user")]
    SenderMismatch,
    #[error("Activity not found")]
    ActivityNotFound,
    #[error("You are not a participant in this activity")]
    NotParticipant,
    #[error("Failed to process message")]
    Store(#[from] StoreError),
}

/// One effect produced by handling an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Push one envelope to each recipient's registered channel, skipping
    /// those who are not connected.
    Broadcast { to: Vec<UserId>, envelope: ServerEnvelope },
    /// Answer on the channel the frame arrived on.
    Reply(ServerEnvelope),
}

/// A persisted message and the participants it should be fanned out to.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub message: Message,
    pub recipients: Vec<UserId>,
}

#[derive(Clone)]
pub struct ChatService {
    db: DbPool,
    max_content_length: usize,
}

impl ChatService {
    pub fn new(db: DbPool, max_content_length: usize) -> Self {
        Self {
            db,
            max_content_length,
        }
    }

    /// Validate and persist one chat message.
    ///
    /// `connection_user` is the user the channel was opened for; the
    /// client-supplied `sender_id` must match it. The message's id and
    /// `sent_at` come from the store, never from the client. Recipients are
    /// the participants at the moment of persisting, sender included.
    pub fn submit(
        &self,
        connection_user: UserId,
        activity_id: ActivityId,
        sender_id: UserId,
        content: &str,
    ) -> Result<Delivery, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyContent);
        }
        if content.chars().count() > self.max_content_length {
            return Err(ChatError::ContentTooLong {
                max: self.max_content_length,
            });
        }
        if sender_id != connection_user {
            return Err(ChatError::SenderMismatch);
        }
        if self.db.get_activity(activity_id)?.is_none() {
            return Err(ChatError::ActivityNotFound);
        }
        if !self.db.is_participant(activity_id, sender_id)? {
            return Err(ChatError::NotParticipant);
        }

        let message = self.db.create_message(NewMessage {
            activity_id,
            sender_id,
            content: content.to_string(),
        })?;

        let recipients = self
            .db
            .get_activity_participants(activity_id)?
            .into_iter()
            .map(|user| user.id)
            .collect();

        Ok(Delivery {
            message,
            recipients,
        })
    }

    /// Full message history of an activity, oldest first.
    pub fn history(&self, activity_id: ActivityId) -> Result<Vec<Message>, ChatError> {
        if self.db.get_activity(activity_id)?.is_none() {
            return Err(ChatError::ActivityNotFound);
        }
        Ok(self.db.get_activity_messages(activity_id)?)
    }

    /// Handle one decoded frame from `connection_user`.
    pub fn handle(&self, connection_user: UserId, envelope: ClientEnvelope) -> Vec<Outbound> {
        match envelope {
            ClientEnvelope::ActivityChat {
                activity_id,
                sender_id,
                content,
            } => match self.submit(connection_user, activity_id, sender_id, &content) {
                Ok(delivery) => {
                    tracing::debug!(
                        user_id = connection_user,
                        activity_id = activity_id,
                        message_id = delivery.message.id,
                        recipients = delivery.recipients.len(),
                        "Chat message persisted"
                    );
                    vec![Outbound::Broadcast {
                        to: delivery.recipients,
                        envelope: ServerEnvelope::ActivityMessage {
                            message: delivery.message,
                        },
                    }]
                }
                Err(err) => {
                    match &err {
                        ChatError::Store(e) => tracing::error!(
                            user_id = connection_user,
                            activity_id = activity_id,
                            error = %e,
                            "Store failure while handling chat message"
                        ),
                        _ => tracing::debug!(
                            user_id = connection_user,
                            activity_id = activity_id,
                            reason = %err,
                            "Chat message rejected"
                        ),
                    }
                    vec![Outbound::Reply(ServerEnvelope::error(err.to_string()))]
                }
            },
        }
    }

    /// Decode and handle one raw text frame.
    pub fn handle_frame(&self, connection_user: UserId, text: &str) -> Vec<Outbound> {
        match decode_client_frame(text) {
            Ok(envelope) => self.handle(connection_user, envelope),
            Err(message) => {
                tracing::warn!(user_id = connection_user, reason = %message, "Malformed frame");
                vec![Outbound::Reply(ServerEnvelope::error(message))]
            }
        }
    }
}
