use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{
        api::{ApiResponse, ResponseMeta},
        auth::StaffUser,
        event::{
            CreateEventRequest, CreateSubEventRequest, EventListQuery, UpdateEventRequest,
            UpdateSubEventRequest,
        },
    },
    error::AppError,
    services::{
        context::RequestContext, events_service::EventsService,
        sub_events_service::SubEventsService,
    },
    validation::ValidatedJson,
};

#[derive(Deserialize, Debug, Default)]
pub struct RecurringDatesQuery {
    pub count: Option<i64>,
}

// 活动列表（含统计）
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (events, total, page, per_page) = EventsService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        events,
        "Events retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let event = EventsService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(event, "Event created successfully")),
    ))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let event = EventsService::get(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(event, "Event retrieved successfully")))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let event = EventsService::update(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(event, "Event updated successfully")))
}

/// Soft cancel; the event row stays.
pub async fn cancel_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result = EventsService::cancel(&mut conn, &RequestContext::from(&staff), event_id)?;
    Ok(Json(ApiResponse::success(result, "Event cancelled successfully")))
}

pub async fn list_sub_events(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let sub_events = SubEventsService::list(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(
        sub_events,
        "Sub-events retrieved successfully",
    )))
}

pub async fn create_sub_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateSubEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let sub_event = SubEventsService::create(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        &payload,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(sub_event, "Sub-event created successfully")),
    ))
}

pub async fn update_sub_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((event_id, sub_event_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateSubEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let sub_event = SubEventsService::update(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        sub_event_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        sub_event,
        "Sub-event updated successfully",
    )))
}

pub async fn delete_sub_event(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((event_id, sub_event_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result = SubEventsService::delete(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        sub_event_id,
    )?;
    Ok(Json(ApiResponse::success(result, "Sub-event deleted")))
}

/// Public. The path segment is the event slug.
pub async fn recurring_dates(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<RecurringDatesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let dates = SubEventsService::recurring_dates_by_slug(&mut conn, &slug, query.count)?;
    Ok(Json(ApiResponse::success(
        dates,
        "Recurring dates retrieved successfully",
    )))
}
