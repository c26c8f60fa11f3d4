use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::auth::{repo_types::User, services::authenticate};
use crate::error::AppError;
use crate::state::AppState;

/// Caller identity for routes open to anonymous callers. `None` when no
/// Authorization header was sent; a malformed header or unknown token
/// still rejects the request.
pub struct MaybeAuthUser(pub Option<User>);

/// Caller identity for routes that require a signed-in user.
pub struct AuthUser(pub User);

/// Extracts `<token>` from `Bearer <token>`; anything else is malformed.
pub(crate) fn parse_bearer(header: &str) -> Result<&str, AppError> {
    let mut parts = header.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AppError::unauthenticated("Invalid token header.")),
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(AUTHORIZATION) else {
            return Ok(MaybeAuthUser(None));
        };
        let header = value.to_str().map_err(|_| {
            warn!("non-ascii Authorization header");
            AppError::unauthenticated("Invalid token header.")
        })?;
        let token = parse_bearer(header)?;
        let user = authenticate(state.identities.as_ref(), token).await?;
        Ok(MaybeAuthUser(Some(user)))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let MaybeAuthUser(user) = MaybeAuthUser::from_request_parts(parts, state).await?;
        user.map(AuthUser).ok_or_else(|| {
            AppError::unauthenticated("Authentication credentials were not provided.")
        })
    }
}
