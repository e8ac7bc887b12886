use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::crud::StatusMessage;
use crate::auth::middleware::CurrentUser;
use crate::db::models::{ActivityParticipant, NewNotification, NotificationKind, User};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/activities/{id}/participants
pub async fn list_participants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<User>>> {
    let id = parse_id(&id, "activity")?;
    Ok(Json(state.db.get_activity_participants(id)?))
}

/// POST /api/activities/{id}/join
/// Joining again returns the existing record. The creator is notified
/// when someone else joins.
pub async fn join_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<ActivityParticipant>)> {
    let activity_id = parse_id(&id, "activity")?;
    let activity = state
        .db
        .get_activity(activity_id)?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;

    let (participant, created) = state.db.add_activity_participant(activity_id, user.0)?;
    if !created {
        return Ok((StatusCode::OK, Json(participant)));
    }

    tracing::info!(activity_id = activity_id, user_id = user.0, "User joined activity");

    if activity.creator_id != user.0 {
        if let Some(joiner) = state.db.get_user(user.0)? {
            state.db.create_notification(NewNotification {
                user_id: activity.creator_id,
                kind: NotificationKind::ActivityJoin,
                content: format!(
                    "{} joined your activity \"{}\"",
                    joiner.display_name, activity.title
                ),
                related_id: Some(activity_id),
            })?;
        }
    }

    Ok((StatusCode::CREATED, Json(participant)))
}

/// DELETE /api/activities/{id}/leave
pub async fn leave_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusMessage>> {
    let activity_id = parse_id(&id, "activity")?;
    if !state.db.remove_activity_participant(activity_id, user.0)? {
        return Err(ApiError::not_found("You are not a participant in this activity"));
    }

    tracing::info!(activity_id = activity_id, user_id = user.0, "User left activity");
    Ok(Json(StatusMessage {
        message: "Left activity successfully".to_string(),
    }))
}
