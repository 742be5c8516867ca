use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    AppState,
    db::models::{
        api::{ApiResponse, ResponseMeta},
        auth::StaffUser,
        communication::{ConversationListQuery, SmsReplyRequest},
    },
    error::AppError,
    services::{context::RequestContext, sms_conversations_service::SmsConversationsService},
    validation::ValidatedJson,
};

pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<ConversationListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = SmsConversationsService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Conversations retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

/// The phone segment arrives URL-decoded and is normalized before lookup.
pub async fn get_thread(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(phone): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let thread = SmsConversationsService::thread(&mut conn, &phone)?;
    Ok(Json(ApiResponse::success(
        thread,
        "Conversation retrieved successfully",
    )))
}

pub async fn reply(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(phone): Path<String>,
    ValidatedJson(payload): ValidatedJson<SmsReplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let result = SmsConversationsService::reply(
        &mut conn,
        &state.providers,
        &RequestContext::from(&staff),
        &phone,
        &payload.body,
    )
    .await?;
    Ok(Json(ApiResponse::success(result, "Reply sent")))
}
