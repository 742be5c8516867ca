use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{
        api::{ApiResponse, ResponseMeta},
        auth::StaffUser,
        registration::{
            ManualRegistrationRequest, RegistrationListQuery, UpdateRegistrationRequest,
        },
    },
    error::AppError,
    services::{context::RequestContext, registrations_service::RegistrationsService},
    validation::ValidatedJson,
};

pub async fn list_registrations(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
    Query(query): Query<RegistrationListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = RegistrationsService::list(&mut conn, event_id, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Registrations retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

pub async fn get_registration(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(registration_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let registration = RegistrationsService::get(&mut conn, registration_id)?;
    Ok(Json(ApiResponse::success(
        registration,
        "Registration retrieved successfully",
    )))
}

pub async fn update_registration(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(registration_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let registration = RegistrationsService::update(
        &mut conn,
        &RequestContext::from(&staff),
        registration_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        registration,
        "Registration updated successfully",
    )))
}

// 手动录入 / 现场报名
pub async fn create_manual_registration(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<ManualRegistrationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let registration = RegistrationsService::create_manual(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        &payload,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            registration,
            "Registration created successfully",
        )),
    ))
}

pub async fn check_in(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(registration_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let registration =
        RegistrationsService::check_in(&mut conn, &RequestContext::from(&staff), registration_id)?;
    Ok(Json(ApiResponse::success(registration, "Checked in successfully")))
}

pub async fn undo_check_in(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(registration_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let registration = RegistrationsService::undo_check_in(
        &mut conn,
        &RequestContext::from(&staff),
        registration_id,
    )?;
    Ok(Json(ApiResponse::success(registration, "Check-in undone")))
}

pub async fn export_registrations(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (filename, csv) = RegistrationsService::export_csv(&mut conn, event_id)?;
    let disposition = format!("attachment; filename=\"{}\"", filename);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
