pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod seed;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::offer_routes()
}
