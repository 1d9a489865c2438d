use std::{sync::Arc, time::Duration};

mod app;
mod auth;
mod bookings;
mod config;
mod db;
mod error;
#[cfg(test)]
mod memory;
mod offers;
mod rate_limit;
mod state;

use crate::{
    auth::tokens::spawn_token_sweep,
    config::AppConfig,
    db::PgStore,
    offers::seed::seed_offers,
    rate_limit::spawn_cleanup_task,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "beautyonthemove=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;

    let store = PgStore::connect(&config).await?;
    store.migrate().await?;
    if let Err(e) = seed_offers(&store).await {
        tracing::warn!(error = %e, "seeding offers failed; continuing");
    }

    let state = AppState::from_parts(Arc::new(store), &config);
    spawn_token_sweep(
        state.tokens.clone(),
        Duration::from_secs(config.token_sweep_interval_secs),
    );
    if config.rate_limit.enabled {
        spawn_cleanup_task(
            state.rate_limiter.clone(),
            Duration::from_secs(config.rate_limit.window_seconds),
        );
    }

    app::serve(app::build_app(state), &config.host, config.port).await
}
