pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod providers;
pub mod routes;
pub mod scheduler;
pub mod schema;
pub mod services;
pub mod utils;
pub mod validation;

use crate::cache::RedisHandle;
use crate::config::Config;
use crate::db::DbPool;
use crate::middleware::auth::{AuthConfig, AuthService};
use crate::providers::Providers;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub redis: RedisHandle,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub providers: Providers,
}

impl AppState {
    pub fn new(db: DbPool, redis: redis::Client, config: Config) -> Self {
        let auth_service = AuthService::new(AuthConfig::from(&config.auth()));
        let providers = Providers::from_config(&config);
        Self::with_providers(db, redis, config, auth_service, providers)
    }

    /// State with explicit providers, used by tests to stub the outside world.
    pub fn with_providers(
        db: DbPool,
        redis: redis::Client,
        config: Config,
        auth_service: AuthService,
        providers: Providers,
    ) -> Self {
        Self {
            db,
            redis: RedisHandle::new(redis),
            config: Arc::new(config),
            auth_service,
            providers,
        }
    }
}

pub fn init_tracing(config: &Config) {
    let logging = config.logging();
    let level = match logging.level.as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_max_level(level).init();
        }
    }
}
