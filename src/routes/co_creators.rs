use axum::{
    Json,
    extract::{Path, State},
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
        co_creator::{AssignEventRequest, CreateCoCreatorRequest, UpdateAssignmentRequest},
    },
    error::AppError,
    services::{co_creators_service::CoCreatorsService, context::RequestContext},
    validation::ValidatedJson,
};

pub async fn list_co_creators(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let co_creators = CoCreatorsService::list(&mut conn)?;
    Ok(Json(ApiResponse::success(
        co_creators,
        "Co-creators retrieved successfully",
    )))
}

pub async fn create_co_creator(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateCoCreatorRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let co_creator = CoCreatorsService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(co_creator, "Co-creator created successfully")),
    ))
}

pub async fn get_co_creator(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(co_creator_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let co_creator = CoCreatorsService::get(&mut conn, co_creator_id)?;
    Ok(Json(ApiResponse::success(
        co_creator,
        "Co-creator retrieved successfully",
    )))
}

pub async fn delete_co_creator(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(co_creator_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    CoCreatorsService::delete(&mut conn, &RequestContext::from(&staff), co_creator_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// 分配活动
pub async fn assign_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(co_creator_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AssignEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let assignment = CoCreatorsService::assign_event(
        &mut conn,
        &RequestContext::from(&staff),
        co_creator_id,
        &payload,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(assignment, "Event assigned successfully")),
    ))
}

pub async fn update_assignment(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((co_creator_id, event_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let assignment = CoCreatorsService::update_assignment(
        &mut conn,
        &RequestContext::from(&staff),
        co_creator_id,
        event_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        assignment,
        "Assignment updated successfully",
    )))
}

pub async fn unassign_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((co_creator_id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    CoCreatorsService::unassign_event(
        &mut conn,
        &RequestContext::from(&staff),
        co_creator_id,
        event_id,
    )?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn invite_co_creator(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(co_creator_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result =
        CoCreatorsService::invite(&mut conn, &state.providers, &state.config, co_creator_id)
            .await?;
    Ok(Json(ApiResponse::success(result, "Invitation sent")))
}
