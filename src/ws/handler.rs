use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use serde::Deserialize;

use crate::db::models::UserId;
use crate::state::AppState;
use crate::ws::actor;

/// Query parameters for WebSocket connection.
/// The session layer has already authenticated the user; the id is trusted.
#[derive(Debug, Deserialize)]
pub struct WsConnectQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

/// Close code sent when the channel was opened without a usable user id.
pub const CLOSE_INVALID_USER: u16 = 4002;

/// Resolve the query's user id to an existing user.
fn resolve_user(state: &AppState, params: &WsConnectQuery) -> Result<UserId, &'static str> {
    let raw = params.user_id.as_deref().ok_or("Missing user id")?;
    let user_id: UserId = raw.trim().parse().map_err(|_| "Invalid user id")?;
    match state.db.get_user(user_id) {
        Ok(Some(_)) => Ok(user_id),
        Ok(None) => Err("Unknown user"),
        Err(e) => {
            tracing::error!(user_id = user_id, error = %e, "User lookup failed during WebSocket connect");
            Err("Unknown user")
        }
    }
}

/// GET /ws?userId=<id>
/// WebSocket upgrade endpoint. On a missing, unparsable or unknown id the
/// socket is upgraded then immediately closed, never registered.
/// On success, runs an actor for the connection.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match resolve_user(&state, &params) {
        Ok(user_id) => {
            tracing::info!(user_id = user_id, "WebSocket connection accepted");
            ws.on_upgrade(move |socket| handle_connected(socket, state, user_id))
        }
        Err(reason) => {
            tracing::warn!(
                close_code = CLOSE_INVALID_USER,
                reason = reason,
                "WebSocket connect rejected"
            );

            ws.on_upgrade(move |mut socket| async move {
                let close_frame = CloseFrame {
                    code: CLOSE_INVALID_USER,
                    reason: reason.into(),
                };
                let _ = socket.send(Message::Close(Some(close_frame))).await;
            })
        }
    }
}

async fn handle_connected(socket: WebSocket, state: AppState, user_id: UserId) {
    actor::run_connection(socket, state, user_id).await;
}
