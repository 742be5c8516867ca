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
        api::{ApiResponse, PageParams, ResponseMeta},
        audit::AuditLogQuery,
        auth::StaffUser,
    },
    error::AppError,
    services::{audit_service::AuditService, dashboard_service::DashboardService},
};

const AUDIT_DEFAULT_PER_PAGE: i64 = 50;
const AUDIT_MAX_PER_PAGE: i64 = 200;

pub async fn overview(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let overview = DashboardService::overview(&mut conn)?;
    Ok(Json(ApiResponse::success(
        overview,
        "Dashboard overview retrieved successfully",
    )))
}

pub async fn event_dashboard(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let dashboard = DashboardService::event(&mut conn, event_id)?;
    Ok(Json(ApiResponse::success(
        dashboard,
        "Event dashboard retrieved successfully",
    )))
}

// 审计日志，最新的在前
pub async fn audit_log(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<AuditLogQuery>,
) -> Result<impl IntoResponse, AppError> {
    let (page, per_page, offset) = PageParams {
        page: query.page,
        per_page: query.per_page,
    }
    .resolve(AUDIT_DEFAULT_PER_PAGE, AUDIT_MAX_PER_PAGE);

    let mut conn = state.db.get()?;
    let (entries, total) = AuditService::list(
        &mut conn,
        query.entity_type.as_deref(),
        query.entity_id,
        offset,
        per_page,
    )?;
    Ok(Json(ApiResponse::success_with_meta(
        entries,
        "Audit log retrieved successfully",
        ResponseMeta::paginated(page, per_page, total),
    )))
}
