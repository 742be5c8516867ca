use axum::{
    Server,
    http::{HeaderValue, Method, header},
    middleware::from_fn,
};
use retreat_backend::{
    AppState,
    config::Config,
    db::build_pool,
    init_tracing,
    middleware::request_tracking_middleware,
    routes::create_router,
    scheduler::Scheduler,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(allowed))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(&config);

    // 数据库连接池
    let db = build_pool(&config.database())?;

    let redis = redis::Client::open(config.redis_url.as_str())?;

    let addr: SocketAddr = config.server_address().parse()?;
    let cors = cors_layer(&config.cors_origins);
    let scheduler_enabled = config.scheduler_enabled;

    let state = Arc::new(AppState::new(db, redis, config));

    if scheduler_enabled {
        Scheduler::new(
            state.db.clone(),
            state.providers.clone(),
            state.config.app_base_url(),
        )
        .spawn();
    } else {
        tracing::info!("scheduler disabled; run the worker binary for background jobs");
    }

    let app = create_router(state)
        .layer(cors)
        .layer(from_fn(request_tracking_middleware));

    tracing::info!(address = %addr, "server listening");
    Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
