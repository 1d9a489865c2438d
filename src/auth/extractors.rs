use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{
    auth::tokens::AuthUser,
    error::{AppError, AuthFailure},
    state::AppState,
};

/// A validated bearer token together with the user it belongs to.
pub struct Session {
    pub user: AuthUser,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let header = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            warn!("missing or malformed Authorization header");
            return Err(AppError::Unauthenticated(AuthFailure::MissingToken));
        };
        let token = token.to_string();
        let user = state.tokens.validate(&token).await?;
        Ok(Session { user, token })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Session::from_request_parts(parts, state)
            .await
            .map(|session| session.user)
    }
}
