//! Identity extractor for requests forwarded by an authenticating gateway.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use duoledger_core::error::CoreError;
use duoledger_core::types::DbId;

use crate::error::AppError;
use crate::state::AppState;

/// Header carrying the authenticated user's ID.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller.
///
/// Authentication happens upstream; this service trusts the user ID the
/// gateway forwards in `X-User-Id`. Whether the user exists is checked by
/// the operations that need it.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized("Missing X-User-Id header".into()))
            })?;

        let user_id = raw
            .trim()
            .parse::<DbId>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(format!("Invalid user id '{raw}'")))
            })?;

        Ok(AuthUser { user_id })
    }
}
