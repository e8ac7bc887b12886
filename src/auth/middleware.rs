use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};

use crate::db::models::UserId;
use crate::error::ErrorBody;

/// Header carrying the authenticated user's id. Set by the session layer
/// in front of this service; its value is trusted as-is.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Authenticated caller, extracted from the `X-User-Id` header.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorBody>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<UserId>().ok())
            .map(CurrentUser)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(ErrorBody {
                        message: "Authentication required".to_string(),
                    }),
                )
            })
    }
}
