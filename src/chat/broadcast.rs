//! Applies chat protocol effects to live connections.

use super::protocol::Outbound;
use crate::ws::broadcast::{broadcast_to_users, send_envelope};
use crate::ws::{ConnectionRegistry, ConnectionSender};

/// Send every effect produced for one inbound frame.
///
/// Fan-out deliveries go through the registry and are silently skipped for
/// participants without a live channel. Replies go straight back on
/// `reply_tx`, the channel the frame arrived on, even if that channel has
/// since been displaced in the registry. Returns the number of fan-out
/// deliveries that reached a live channel.
pub fn dispatch(registry: &ConnectionRegistry, reply_tx: &ConnectionSender, effects: Vec<Outbound>) -> usize {
    let mut delivered = 0;
    for effect in effects {
        match effect {
            Outbound::Broadcast { to, envelope } => {
                delivered += broadcast_to_users(registry, &to, &envelope);
            }
            Outbound::Reply(envelope) => send_envelope(reply_tx, &envelope),
        }
    }
    delivered
}
