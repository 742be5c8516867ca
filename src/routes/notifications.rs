use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{
        api::{ApiResponse, ResponseMeta},
        auth::StaffUser,
        communication::{BulkNotificationRequest, NotificationLogQuery, SmsBlastRequest},
    },
    error::AppError,
    services::{context::RequestContext, notifications_service::NotificationsService},
    validation::ValidatedJson,
};

// 群发短信给已完成报名的参与者
pub async fn sms_blast(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<SmsBlastRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result = NotificationsService::sms_blast(
        &mut conn,
        &state.providers,
        &RequestContext::from(&staff),
        event_id,
        &payload.message,
    )
    .await?;
    Ok(Json(ApiResponse::success(result, "SMS blast finished")))
}

pub async fn bulk_send(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<BulkNotificationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result = NotificationsService::bulk(
        &mut conn,
        &state.providers,
        &RequestContext::from(&staff),
        state.config.app_base_url(),
        event_id,
        &payload,
    )
    .await?;
    Ok(Json(ApiResponse::success(result, "Bulk notification finished")))
}

pub async fn notification_log(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<NotificationLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = NotificationsService::log(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Notification log retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}
