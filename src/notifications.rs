//! Per-user notifications (someone joined your activity, someone followed you).

use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::middleware::CurrentUser;
use crate::db::models::Notification;
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/notifications
/// Caller's notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.db.get_user_notifications(user.0)?))
}

/// PUT /api/notifications/{id}/read
/// Only the recipient can mark a notification; anyone else gets 404.
pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let id = parse_id(&id, "notification")?;
    let owned = state
        .db
        .get_user_notifications(user.0)?
        .iter()
        .any(|n| n.id == id);
    if !owned {
        return Err(ApiError::not_found("Notification not found"));
    }

    state
        .db
        .mark_notification_as_read(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Notification not found"))
}
