//! REST endpoint for activity chat history.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::middleware::CurrentUser;
use crate::db::models::Message;
use crate::error::{parse_id, ApiResult};
use crate::state::AppState;

/// GET /api/activities/{id}/messages
/// Full chat history of an activity, oldest first. Used by the chat
/// surface once when it mounts, before live frames arrive over /ws.
pub async fn get_activity_messages(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(activity_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let activity_id = parse_id(&activity_id, "activity")?;
    Ok(Json(state.chat.history(activity_id)?))
}
