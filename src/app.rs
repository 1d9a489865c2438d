use std::net::SocketAddr;

use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use time::OffsetDateTime;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    auth, bookings,
    error::AppError,
    offers,
    rate_limit::rate_limit,
    state::AppState,
};

const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

const ENDPOINTS: &[&str] = &[
    "POST /auth/register",
    "POST /auth/login",
    "POST /auth/logout",
    "GET /user/profile",
    "PUT /user/profile",
    "GET /bookings",
    "POST /bookings",
    "PUT /bookings/:id",
    "DELETE /bookings/:id",
    "GET /offers",
    "GET /offers/:id",
    "GET /dashboard/stats",
];

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub database: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub endpoints: &'static [&'static str],
}

/// Answers 200 even when the database is unreachable.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.store.ping().await;
    Json(HealthResponse {
        status: if connected { "OK" } else { "DEGRADED" },
        message: "BeautyOnTheMove API is running",
        database: if connected { "connected" } else { "disconnected" },
        timestamp: OffsetDateTime::now_utc(),
        endpoints: ENDPOINTS,
    })
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found")
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(bookings::router())
        .merge(offers::router())
        .route("/health", get(health))
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
