use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::middleware::CurrentUser;
use crate::db::models::{Activity, ActivityUpdate, NewActivity};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

/// Default number of activities returned by list endpoints.
const DEFAULT_LIMIT: usize = 20;

const MIN_TITLE_LENGTH: usize = 3;
const MIN_DESCRIPTION_LENGTH: usize = 10;

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub location: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}

fn validate_title(title: &str) -> ApiResult<()> {
    if title.trim().chars().count() < MIN_TITLE_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Title must be at least {} characters",
            MIN_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: &str) -> ApiResult<()> {
    if description.trim().chars().count() < MIN_DESCRIPTION_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Description must be at least {} characters",
            MIN_DESCRIPTION_LENGTH
        )));
    }
    Ok(())
}

/// Load an activity and check `user` created it.
fn owned_activity(state: &AppState, activity_id: i64, user: CurrentUser, verb: &str) -> ApiResult<Activity> {
    let activity = state
        .db
        .get_activity(activity_id)?
        .ok_or_else(|| ApiError::not_found("Activity not found"))?;
    if activity.creator_id != user.0 {
        return Err(ApiError::forbidden(format!(
            "You can only {} your own activities",
            verb
        )));
    }
    Ok(activity)
}

/// GET /api/activities
/// Upcoming activities, soonest first.
pub async fn list_upcoming(State(state): State<AppState>) -> ApiResult<Json<Vec<Activity>>> {
    Ok(Json(state.db.get_upcoming_activities(Utc::now(), DEFAULT_LIMIT)?))
}

/// GET /api/activities/nearby?location=..&limit=..
pub async fn list_nearby(
    State(state): State<AppState>,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Location is required"))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.db.get_nearby_activities(&location, Utc::now(), limit)?))
}

/// GET /api/activities/{id}
pub async fn get_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Activity>> {
    let id = parse_id(&id, "activity")?;
    state
        .db
        .get_activity(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Activity not found"))
}

/// POST /api/activities
/// The caller becomes the creator.
pub async fn create_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(mut body): Json<NewActivity>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    validate_title(&body.title)?;
    validate_description(&body.description)?;
    if body.location.trim().is_empty() {
        return Err(ApiError::bad_request("Location is required"));
    }
    if state.db.get_user(user.0)?.is_none() {
        return Err(ApiError::not_found("User not found"));
    }

    body.creator_id = user.0;
    let activity = state.db.create_activity(body)?;

    tracing::info!(
        activity_id = activity.id,
        creator_id = activity.creator_id,
        "Activity created"
    );
    Ok((StatusCode::CREATED, Json(activity)))
}

/// PUT /api/activities/{id}
/// Creator only.
pub async fn update_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ActivityUpdate>,
) -> ApiResult<Json<Activity>> {
    let id = parse_id(&id, "activity")?;
    owned_activity(&state, id, user, "update")?;

    if let Some(title) = &body.title {
        validate_title(title)?;
    }
    if let Some(description) = &body.description {
        validate_description(description)?;
    }

    state
        .db
        .update_activity(id, body)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Activity not found"))
}

/// DELETE /api/activities/{id}
/// Creator only.
pub async fn delete_activity(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<StatusMessage>> {
    let id = parse_id(&id, "activity")?;
    owned_activity(&state, id, user, "delete")?;

    if !state.db.delete_activity(id)? {
        return Err(ApiError::not_found("Activity not found"));
    }

    tracing::info!(activity_id = id, user_id = user.0, "Activity deleted");
    Ok(Json(StatusMessage {
        message: "Activity deleted successfully".to_string(),
    }))
}
