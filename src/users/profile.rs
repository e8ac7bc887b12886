use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::CurrentUser;
use crate::db::models::{NewUser, User, UserUpdate};
use crate::error::{parse_id, ApiError, ApiResult};
use crate::state::AppState;

/// Default number of users returned by suggestion/nearby lookups.
const DEFAULT_LIMIT: usize = 10;

const MIN_USERNAME_LENGTH: usize = 3;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub location: Option<String>,
    pub limit: Option<usize>,
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}

/// POST /api/users
/// Register a profile.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if body.username.trim().chars().count() < MIN_USERNAME_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Username must be at least {} characters",
            MIN_USERNAME_LENGTH
        )));
    }
    if !looks_like_email(&body.email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if body.display_name.trim().is_empty() {
        return Err(ApiError::bad_request("Display name is required"));
    }

    let user = state.db.create_user(body)?;
    tracing::info!(user_id = user.id, username = %user.username, "User registered");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/me
pub async fn get_me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<User>> {
    state
        .db
        .get_user(user.0)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// PUT /api/users/me
/// Patch own profile. Bumps `lastActive`.
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    if body.display_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("Display name is required"));
    }
    state
        .db
        .update_user(user.0, body)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /api/users/{id}
pub async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<User>> {
    let id = parse_id(&id, "user")?;
    state
        .db
        .get_user(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User not found"))
}

/// GET /api/users/suggested?limit=..
/// Users sharing the most interests.
pub async fn suggested(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.db.get_suggested_users(user.0, limit)?))
}

/// GET /api/users/nearby?location=..&limit=..
pub async fn nearby(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<NearbyQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let location = query
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Location is required"))?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Ok(Json(state.db.get_nearby_users(&location, limit)?))
}

#[cfg(test)]
mod tests {
    use super::looks_like_email;

    #[test]
    fn test_email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("ab.co"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a@bco"));
        assert!(!looks_like_email("a@.co"));
    }
}
