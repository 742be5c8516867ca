use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{
        api::ApiResponse,
        auth::StaffUser,
        scholarship::{CreateScholarshipRequest, ScholarshipListQuery},
    },
    error::AppError,
    services::{context::RequestContext, scholarships_service::ScholarshipsService},
    validation::ValidatedJson,
};

pub async fn list_links(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<ScholarshipListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let links = ScholarshipsService::list(&mut conn, query.event_id)?;
    Ok(Json(ApiResponse::success(
        links,
        "Scholarship links retrieved successfully",
    )))
}

pub async fn create_link(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateScholarshipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let link = ScholarshipsService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(link, "Scholarship link created successfully")),
    ))
}

pub async fn deactivate_link(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(link_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let link = ScholarshipsService::deactivate(&mut conn, &RequestContext::from(&staff), link_id)?;
    Ok(Json(ApiResponse::success(
        link,
        "Scholarship link deactivated successfully",
    )))
}

// 公开接口：报名页校验奖学金码
pub async fn validate_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let validation = ScholarshipsService::validate(&mut conn, &code)?;
    Ok(Json(validation))
}
