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
        auth::StaffUser,
        form_template::{
            AttachFormRequest, CreateFormTemplateRequest, FormTemplateListQuery,
            UpdateFormTemplateRequest,
        },
    },
    error::AppError,
    services::{context::RequestContext, form_templates_service::FormTemplatesService},
    validation::ValidatedJson,
};

pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<FormTemplateListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (items, total, page, per_page) = FormTemplatesService::list(&mut conn, &query)?;
    Ok(Json(ApiResponse::success_with_meta(
        items,
        "Form templates retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template = FormTemplatesService::get(&mut conn, template_id)?;
    Ok(Json(ApiResponse::success(
        template,
        "Form template retrieved successfully",
    )))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    ValidatedJson(payload): ValidatedJson<CreateFormTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template =
        FormTemplatesService::create(&mut conn, &RequestContext::from(&staff), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(template, "Form template created successfully")),
    ))
}

pub async fn update_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(template_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateFormTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template = FormTemplatesService::update(
        &mut conn,
        &RequestContext::from(&staff),
        template_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        template,
        "Form template updated successfully",
    )))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    FormTemplatesService::delete(&mut conn, &RequestContext::from(&staff), template_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn duplicate_template(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(template_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let template =
        FormTemplatesService::duplicate(&mut conn, &RequestContext::from(&staff), template_id)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            template,
            "Form template duplicated successfully",
        )),
    ))
}

// 活动关联的表单
pub async fn list_event_forms(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let forms = FormTemplatesService::event_forms(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(
        forms,
        "Event forms retrieved successfully",
    )))
}

pub async fn attach_form(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AttachFormRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let link = FormTemplatesService::attach(
        &mut conn,
        &RequestContext::from(&staff),
        event_id,
        &payload,
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(link, "Form attached successfully")),
    ))
}

pub async fn detach_form(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path((event_id, link_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    FormTemplatesService::detach(&mut conn, &RequestContext::from(&staff), event_id, link_id)?;
    Ok(StatusCode::NO_CONTENT)
}
