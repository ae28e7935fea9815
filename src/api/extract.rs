//! Request extractors for the authenticated user.
//!
//! The bearer token only identifies the user; the user row is reloaded on
//! every request so deletions and role changes apply immediately.

use crate::api::AppState;
use crate::core::{Caller, user::get_user_by_id};
use crate::entities::UserModel;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};

/// Any signed-in user
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserModel);

impl CurrentUser {
    #[must_use]
    pub const fn caller(&self) -> Caller {
        Caller::of(&self.0)
    }
}

/// A signed-in user with the admin role
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserModel);

impl AdminUser {
    #[must_use]
    pub const fn caller(&self) -> Caller {
        Caller::of(&self.0)
    }
}

fn bearer_token(parts: &Parts) -> Result<&str> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| Error::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| Error::unauthorized("Malformed Authorization header"))?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| Error::unauthorized("Expected a bearer token"))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let claims = state.tokens.verify(bearer_token(parts)?)?;
        let user_id = claims.user_id()?;
        let user = get_user_by_id(&state.db, user_id)
            .await?
            .ok_or_else(|| Error::unauthorized(format!("User {user_id} no longer exists")))?;
        Ok(Self(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !Caller::of(&user).is_admin() {
            tracing::warn!(user_id = user.id, "Non-admin requested an admin endpoint");
            return Err(Error::forbidden("Admin role required"));
        }
        Ok(Self(user))
    }
}
