use axum::extract::State;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};

use crate::activities::{crud as activity_crud, participants};
use crate::chat::messages;
use crate::db::models::InterestCategory;
use crate::error::ApiResult;
use crate::notifications;
use crate::state::AppState;
use crate::users::{follows, profile};
use crate::ws::handler as ws_handler;

/// GET /api/interests
/// The interest category catalogue. Public.
async fn list_interests(State(state): State<AppState>) -> ApiResult<Json<Vec<InterestCategory>>> {
    Ok(Json(state.db.get_all_interest_categories()?))
}

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router<()> {
    // /api/users/suggested and /api/users/nearby are static segments, so they
    // win over /api/users/{id}.
    let user_routes = Router::new()
        .route("/api/users", post(profile::register))
        .route("/api/users/me", get(profile::get_me).put(profile::update_me))
        .route("/api/users/suggested", get(profile::suggested))
        .route("/api/users/nearby", get(profile::nearby))
        .route("/api/users/{id}", get(profile::get_user))
        .route("/api/users/{id}/followers", get(follows::followers))
        .route("/api/users/{id}/following", get(follows::following))
        .route("/api/users/{id}/follow", post(follows::follow))
        .route("/api/users/{id}/unfollow", delete(follows::unfollow));

    let activity_routes = Router::new()
        .route(
            "/api/activities",
            get(activity_crud::list_upcoming).post(activity_crud::create_activity),
        )
        .route("/api/activities/nearby", get(activity_crud::list_nearby))
        .route(
            "/api/activities/{id}",
            get(activity_crud::get_activity)
                .put(activity_crud::update_activity)
                .delete(activity_crud::delete_activity),
        )
        .route(
            "/api/activities/{id}/participants",
            get(participants::list_participants),
        )
        .route("/api/activities/{id}/join", post(participants::join_activity))
        .route("/api/activities/{id}/leave", delete(participants::leave_activity))
        .route(
            "/api/activities/{id}/messages",
            get(messages::get_activity_messages),
        );

    let notification_routes = Router::new()
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/{id}/read", put(notifications::mark_read));

    let public_routes = Router::new()
        .route("/api/interests", get(list_interests))
        .route("/health", get(health_check));

    // WebSocket endpoint (identity via ?userId= query param)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    Router::new()
        .merge(user_routes)
        .merge(activity_routes)
        .merge(notification_routes)
        .merge(public_routes)
        .merge(ws_routes)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
