use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    AppState,
    db::models::{
        api::ApiResponse,
        registration::{CancelRequest, GroupRegisterRequest, RegisterRequest, SuccessQuery},
    },
    error::AppError,
    services::registration_service::RegistrationService,
    validation::ValidatedJson,
};

// 公开报名页所需的活动信息
pub async fn info(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let info = RegistrationService::info(&mut conn, &slug)?;
    Ok(Json(ApiResponse::success(info, "Event info retrieved successfully")))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let created =
        RegistrationService::register(&mut conn, &state.providers, &slug, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(created, "Registration created successfully")),
    ))
}

pub async fn register_group(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ValidatedJson(payload): ValidatedJson<GroupRegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let created =
        RegistrationService::register_group(&mut conn, &state.providers, &slug, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            created,
            "Group registration created successfully",
        )),
    ))
}

/// Stripe redirects here; payment state arrives separately through the webhook.
pub async fn success(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<SuccessQuery>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(session_id) = query.session_id.as_deref() {
        tracing::debug!(slug = %slug, session_id = %session_id, "checkout success redirect");
    }
    let mut conn = state.db.get()?;
    let body = RegistrationService::success(&mut conn, &slug)?;
    Ok(Json(body))
}

pub async fn cancelled(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let body = RegistrationService::cancelled(&mut conn, &slug)?;
    Ok(Json(body))
}

pub async fn cancel_request(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    ValidatedJson(payload): ValidatedJson<CancelRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let body = RegistrationService::cancel_request(
        &mut conn,
        &state.providers,
        state.config.admin_notification_email.as_deref(),
        &slug,
        &payload,
    )
    .await?;
    Ok(Json(body))
}
