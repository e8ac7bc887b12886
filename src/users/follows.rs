use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::activities::crud::StatusMessage;
use crate::auth::middleware::CurrentUser;
use crate::db::models::{NewNotification, NotificationKind, User, UserConnection};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/users/{id}/followers
pub async fn followers(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<User>>> {
    let id = parse_id(&id, "user")?;
    Ok(Json(state.db.get_user_followers(id)?))
}

/// GET /api/users/{id}/following
pub async fn following(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Vec<User>>> {
    let id = parse_id(&id, "user")?;
    Ok(Json(state.db.get_user_following(id)?))
}

/// POST /api/users/{id}/follow
/// Notifies the followed user.
pub async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<UserConnection>)> {
    let following_id = parse_id(&id, "user")?;
    if following_id == user.0 {
        return Err(ApiError::bad_request("You cannot follow yourself"));
    }
    if state.db.get_user(following_id)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    let connection = state.db.create_user_connection(user.0, following_id)?;

    if let Some(follower) = state.db.get_user(user.0)? {
        state.db.create_notification(NewNotification {
            user_id: following_id,
            kind: NotificationKind::NewFollower,
            content: format!("{} started following you", follower.display_name),
            related_id: Some(follower.id),
        })?;
    }

    Ok((StatusCode::CREATED, Json(connection)))
}

/// DELETE /api/users/{id}/unfollow
pub async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusMessage>> {
    let following_id = parse_id(&id, "user")?;
    if !state.db.delete_user_connection(user.0, following_id)? {
        return Err(ApiError::not_found("You are not following this user"));
    }
    Ok(Json(StatusMessage {
        message: "Unfollowed successfully".to_string(),
    }))
}
