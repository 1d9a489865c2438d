use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, tokens::AuthUser},
    bookings::{
        dto::{BookingEnvelope, BookingResponse, CreateBookingRequest, DashboardStats, UpdateBookingRequest},
        services,
    },
    error::{AppJson, AppPath, AppResult},
    state::AppState,
};

pub fn booking_routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/:id", put(update_booking).delete(delete_booking))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard/stats", get(dashboard_stats))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list_bookings(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = services::list(state.store.as_ref(), user.id).await?;
    Ok(Json(bookings.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<BookingEnvelope>)> {
    let booking = services::create(state.store.as_ref(), user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingEnvelope {
            message: "Booking created successfully",
            booking: booking.into(),
        }),
    ))
}

#[instrument(skip(state, user, payload), fields(user_id = %user.id))]
pub async fn update_booking(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateBookingRequest>,
) -> AppResult<Json<BookingEnvelope>> {
    let booking = services::update(state.store.as_ref(), id, user.id, payload).await?;
    Ok(Json(BookingEnvelope {
        message: "Booking updated successfully",
        booking: booking.into(),
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_booking(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    services::delete(state.store.as_ref(), id, user.id).await?;
    Ok(Json(MessageResponse {
        message: "Booking deleted successfully",
    }))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DashboardStats>> {
    Ok(Json(services::stats(state.store.as_ref(), user.id).await?))
}
