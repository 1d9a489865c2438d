use std::sync::Arc;

use crate::{
    auth::{jwt::JwtKeys, tokens::TokenService},
    config::AppConfig,
    db::Store,
    rate_limit::RateLimiter,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenService,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn from_parts(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        let tokens = TokenService::new(store.clone(), JwtKeys::from_config(&config.jwt));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        Self {
            store,
            tokens,
            rate_limiter,
        }
    }

    #[cfg(test)]
    pub fn fake() -> (Self, Arc<crate::memory::MemoryStore>) {
        Self::fake_with(AppConfig::for_tests())
    }

    #[cfg(test)]
    pub fn fake_with(config: AppConfig) -> (Self, Arc<crate::memory::MemoryStore>) {
        let store = Arc::new(crate::memory::MemoryStore::default());
        (Self::from_parts(store.clone(), &config), store)
    }
}
