//! Caller identity extraction from request headers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use common::UserId;
use domain::Caller;

use crate::error::ApiError;

/// Header carrying the authenticated user's numeric id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the user's role; `admin` grants administrative access.
pub const USER_ROLE_HEADER: &str = "x-user-role";

/// The caller behind a request. No `x-user-id` header means anonymous.
#[derive(Debug, Clone, Copy)]
pub struct Identity(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(USER_ID_HEADER) else {
            return Ok(Identity(Caller::Anonymous));
        };

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(UserId::new)
            .ok_or_else(|| ApiError::BadRequest(format!("Invalid {USER_ID_HEADER} header")))?;

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case("admin"));

        Ok(Identity(if is_admin {
            Caller::Admin(user_id)
        } else {
            Caller::Customer(user_id)
        }))
    }
}
