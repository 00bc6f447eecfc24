//! Minimal bearer-token authentication at the HTTP boundary.
//!
//! Tokens are opaque values stored on the user record; issuing them is
//! owned by the (out of scope) authorization server.

use anyhow::anyhow;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::AppState;
use crate::error::Error;
use crate::models::User;

pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| Error::unauthorized(anyhow!("missing bearer token")))?;
        let user = state
            .user_port
            .find_by_token(token)
            .await?
            .ok_or_else(|| Error::unauthorized(anyhow!("unknown token")))?;
        Ok(Self(user))
    }
}

pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.admin {
            return Err(Error::forbidden(anyhow!("user {} is not an admin", user.name)));
        }
        Ok(Self(user))
    }
}
