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
        communication::{
            CreateMessageTemplateRequest, MessageTemplateListQuery, PreviewTemplateRequest,
            UpdateMessageTemplateRequest,
        },
    },
    error::AppError,
    services::{context::RequestContext, message_templates_service::MessageTemplatesService},
    validation::ValidatedJson,
};

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<MessageTemplateListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let templates = MessageTemplatesService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success(
        templates,
        "Message templates retrieved successfully",
    )))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template = MessageTemplatesService::get(&mut conn, template_id)?;
    Ok(Json(ApiResponse::success(
        template,
        "Message template retrieved successfully",
    )))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateMessageTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template =
        MessageTemplatesService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            template,
            "Message template created successfully",
        )),
    ))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(template_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateMessageTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template = MessageTemplatesService::update(
        &mut conn,
        &RequestContext::from(&staff),
        template_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        template,
        "Message template updated successfully",
    )))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    MessageTemplatesService::delete(&mut conn, &RequestContext::from(&staff), template_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// 用示例数据渲染模板，请求体可省略
pub async fn preview_template(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(template_id): Path<Uuid>,
    payload: Option<ValidatedJson<PreviewTemplateRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let payload = payload.map(|ValidatedJson(p)| p).unwrap_or_default();
    let mut conn = state.db.get()?;
    let preview = MessageTemplatesService::preview(&mut conn, template_id, &payload)?;
    Ok(Json(ApiResponse::success(preview, "Template preview rendered")))
}
