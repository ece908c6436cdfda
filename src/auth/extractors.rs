use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;
use tracing::warn;

use super::{
    claims::TokenKind,
    cookies::{cookie_value, ACCESS_COOKIE},
    repo_types::User,
};
use crate::{error::ApiError, state::AppState};

/// Authenticated caller. The token comes from `Authorization: Bearer`,
/// falling back to the `access` cookie.
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Option<String> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?;
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_value(&CookieJar::from_headers(&parts.headers), ACCESS_COOKIE))
            .ok_or(ApiError::Unauthenticated)?;

        let claims = state
            .keys
            .verify_kind(&token, TokenKind::Access)
            .map_err(|e| {
                warn!(error = %e, "invalid or expired token");
                ApiError::TokenInvalid
            })?;

        let user = state
            .users
            .find_by_id(claims.user_id)
            .await?
            .ok_or_else(|| {
                warn!(user_id = claims.user_id, "token for unknown user");
                ApiError::TokenInvalid
            })?;

        Ok(AuthUser(user))
    }
}
