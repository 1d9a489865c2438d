use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    error::{AppError, AppPath, AppResult},
    offers::dto::OfferResponse,
    state::AppState,
};

pub fn offer_routes() -> Router<AppState> {
    Router::new()
        .route("/offers", get(list_offers))
        .route("/offers/:id", get(get_offer))
}

#[instrument(skip(state))]
pub async fn list_offers(State(state): State<AppState>) -> AppResult<Json<Vec<OfferResponse>>> {
    let offers = state.store.list_active_offers().await?;
    Ok(Json(offers.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_offer(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<OfferResponse>> {
    let offer = state
        .store
        .find_active_offer(id)
        .await?
        .ok_or(AppError::NotFound("Offer not found"))?;
    Ok(Json(offer.into()))
}
