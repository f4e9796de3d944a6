//! Caller identity for REST routes.
//!
//! SYSTEM CONTEXT
//! ==============
//! Authentication happens upstream. The identity provider's proxy verifies
//! the user and forwards their id in `x-user-id`; this extractor only reads
//! it. WebSocket connections carry identity in query parameters instead.

use axum::http::StatusCode;
use axum::http::request::Parts;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Verified user id of the caller.
#[derive(Debug, Clone)]
pub struct ActingUser {
    pub user_id: String,
}

impl<S> axum::extract::FromRequestParts<S> for ActingUser
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user_id: user_id.to_owned() })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
