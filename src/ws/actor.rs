use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::chat::broadcast::dispatch;
use crate::db::models::UserId;
use crate::state::AppState;
use crate::ws::broadcast::send_envelope;
use crate::ws::protocol::ServerEnvelope;

/// Run the actor-per-connection pattern for an accepted WebSocket.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader loop: handles one inbound frame at a time, so a single
///   connection's chat messages are persisted and broadcast in the order
///   they arrived
///
/// The mpsc sender is what the connection registry hands out to the rest
/// of the system.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: UserId) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    let connection_id = state.connections.register(user_id, tx.clone());

    tracing::info!(
        user_id = user_id,
        connection = connection_id,
        "WebSocket actor started"
    );

    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    let effects = state.chat.handle_frame(user_id, text.as_str());
                    dispatch(&state.connections, &tx, effects);
                }
                Message::Binary(_) => {
                    tracing::debug!(user_id = user_id, "Received binary frame (expected JSON text)");
                    send_envelope(&tx, &ServerEnvelope::error("Expected a JSON text frame"));
                }
                // tungstenite queues the pong itself when it reads a ping
                Message::Ping(_) | Message::Pong(_) => {}
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = user_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = user_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(user_id = user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    state.connections.release(user_id, connection_id);

    tracing::info!(
        user_id = user_id,
        connection = connection_id,
        "WebSocket actor stopped"
    );
}

/// Writer task: receives messages from mpsc channel and forwards them to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}
