//! Shared application state

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::TokenService;
use crate::config::Config;
use crate::currency::{ExchangeRateService, StaticRateSource};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub tokens: TokenService,
    pub rates: ExchangeRateService,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let tokens = TokenService::from_config(&config);
        let rates = ExchangeRateService::new(
            Arc::new(StaticRateSource::new()),
            Duration::from_secs(config.exchange_rate_cache_secs),
        );

        Self {
            pool,
            config: Arc::new(config),
            tokens,
            rates,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

impl FromRef<AppState> for ExchangeRateService {
    fn from_ref(state: &AppState) -> Self {
        state.rates.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
