use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    AppState,
    db::models::{
        api::ApiResponse,
        auth::{LoginRequest, MagicLinkRequest, Principal, VerifyQuery},
    },
    error::AppError,
    services::session_service::SessionService,
    validation::ValidatedJson,
};

// 管理员 / 运营人员密码登录
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let token = SessionService::login(&mut conn, &state.auth_service, &payload)?;
    Ok(Json(token))
}

/// Always 202, whether or not the email belongs to a co-creator.
pub async fn request_magic_link(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<MagicLinkRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    SessionService::request_magic_link(&mut conn, &state.providers, &state.config, &payload.email)
        .await?;

    let response = ApiResponse::<()>::accepted(
        (),
        "If that email belongs to a co-creator, a login link has been sent",
    );
    Ok((StatusCode::ACCEPTED, Json(response)))
}

pub async fn verify(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let token = SessionService::verify(&mut conn, &state.auth_service, &query.token)?;
    Ok(Json(token))
}

pub async fn me(principal: Principal) -> impl IntoResponse {
    Json(ApiResponse::success(principal, "Current user retrieved successfully"))
}
