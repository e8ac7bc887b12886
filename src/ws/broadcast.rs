use super::protocol::ServerEnvelope;
use super::{ConnectionRegistry, ConnectionSender};
use crate::db::models::UserId;

/// Encode and send an envelope directly on one connection's channel.
pub fn send_envelope(tx: &ConnectionSender, envelope: &ServerEnvelope) {
    match envelope.to_ws_message() {
        Ok(msg) => {
            let _ = tx.send(msg);
        }
        Err(e) => tracing::error!(error = %e, "Failed to encode envelope"),
    }
}

/// Send one envelope to every user in `user_ids` that is connected.
/// The frame is encoded once and cloned per recipient.
/// Returns how many recipients had a live channel.
pub fn broadcast_to_users(registry: &ConnectionRegistry, user_ids: &[UserId], envelope: &ServerEnvelope) -> usize {
    let msg = match envelope.to_ws_message() {
        Ok(msg) => msg,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode envelope");
            return 0;
        }
    };

    let mut delivered = 0;
    for &user_id in user_ids {
        if registry.send(user_id, msg.clone()) {
            delivered += 1;
        } else {
            tracing::debug!(user_id = user_id, "Recipient offline, delivery skipped");
        }
    }
    delivered
}
