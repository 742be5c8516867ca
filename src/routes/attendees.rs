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
        api::{ApiResponse, ResponseMeta},
        attendee::{
            AttendeeListQuery, CreateMembershipRequest, MembershipListQuery,
            UpdateAttendeeRequest, UpdateMembershipRequest,
        },
        auth::{AdminUser, StaffUser},
    },
    error::AppError,
    services::{
        attendees_service::{AttendeesService, MembershipsService},
        context::RequestContext,
    },
    validation::ValidatedJson,
};

/// Admin upload of a client list CSV (`text/csv` body).
pub async fn import_attendees(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    body: String,
) -> Result<impl IntoResponse, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::validation("CSV body is required"));
    }
    let mut conn = state.db.get()?;
    let summary = AttendeesService::import_csv(&mut conn, &RequestContext::from(&admin), &body)?;
    Ok(Json(ApiResponse::success(summary, "Attendee import complete")))
}

pub async fn list_attendees(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<AttendeeListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = AttendeesService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Attendees retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

pub async fn get_attendee(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(attendee_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let attendee = AttendeesService::get(&mut conn, attendee_id)?;
    Ok(Json(ApiResponse::success(attendee, "Attendee retrieved successfully")))
}

pub async fn update_attendee(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(attendee_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateAttendeeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let attendee = AttendeesService::update(
        &mut conn,
        &RequestContext::from(&staff),
        attendee_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(attendee, "Attendee updated successfully")))
}

// 会员
pub async fn list_memberships(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<MembershipListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = MembershipsService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Memberships retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

pub async fn create_membership(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateMembershipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let membership =
        MembershipsService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(membership, "Membership created successfully")),
    ))
}

pub async fn update_membership(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(membership_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateMembershipRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let membership = MembershipsService::update(
        &mut conn,
        &RequestContext::from(&staff),
        membership_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        membership,
        "Membership updated successfully",
    )))
}

/// Deactivates rather than deleting.
pub async fn deactivate_membership(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(membership_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    MembershipsService::deactivate(&mut conn, &RequestContext::from(&staff), membership_id)?;
    Ok(StatusCode::NO_CONTENT)
}
