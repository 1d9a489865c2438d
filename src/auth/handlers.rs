use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, ProfileResponse, PublicUser,
            RegisterRequest, UpdateProfileRequest,
        },
        extractors::Session,
        services,
        tokens::AuthUser,
    },
    error::{AppJson, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new().route("/user/profile", get(get_profile).put(update_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let user = services::register(state.store.as_ref(), payload).await?;
    let issued = state.tokens.issue(user.id).await?;
    info!(user_id = %user.id, expires_at = %issued.expires_at, "token issued");
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully",
            user: user.into(),
            token: issued.token,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = services::authenticate(state.store.as_ref(), payload.email, payload.password).await?;
    let issued = state.tokens.issue(user.id).await?;
    info!(user_id = %user.id, expires_at = %issued.expires_at, "token issued");
    Ok(Json(AuthResponse {
        message: "Login successful",
        user: user.into(),
        token: issued.token,
    }))
}

#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> AppResult<Json<MessageResponse>> {
    state.tokens.revoke(&session.token).await?;
    info!(user_id = %session.user.id, "user logged out");
    Ok(Json(MessageResponse {
        message: "Logout successful",
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn get_profile(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<PublicUser>> {
    let user = services::profile(state.store.as_ref(), user.id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let user = services::update_profile(state.store.as_ref(), user.id, payload).await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}
