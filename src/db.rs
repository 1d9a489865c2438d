use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    auth::repo::{TokenRepo, UserRepo},
    bookings::repo::BookingRepo,
    config::AppConfig,
    offers::repo::OfferRepo,
};

/// Everything the request handlers need from storage.
#[async_trait]
pub trait Store: UserRepo + TokenRepo + BookingRepo + OfferRepo + Send + Sync {
    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> bool;
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> bool {
        match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "database ping failed");
                false
            }
        }
    }
}
