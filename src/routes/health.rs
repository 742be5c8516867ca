use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use diesel::{RunQueryDsl, sql_query};
use serde_json::json;
use std::sync::Arc;

use crate::{AppState, cache::redis_health_check};

const SERVICE_NAME: &str = "retreat-backend";

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": SERVICE_NAME }))
}

/// Checks Postgres with `SELECT 1`; Redis is reported but does not fail the check.
pub async fn deep_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database_ok = match state.db.get() {
        Ok(mut conn) => match sql_query("SELECT 1").execute(&mut conn) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(error = %e, "database health query failed");
                false
            }
        },
        Err(e) => {
            tracing::error!(error = %e, "database pool unavailable");
            false
        }
    };

    let redis_ok = redis_health_check(state.redis.client()).await.unwrap_or(false);

    if !database_ok {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unhealthy", "database": "unavailable" })),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": SERVICE_NAME,
            "database": "connected",
            "redis": if redis_ok { "connected" } else { "unavailable" },
        })),
    )
}
