//! Co-creator portal. Every handler takes `CoCreatorUser`, so staff tokens get 403.

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
        auth::CoCreatorUser,
        expense::{CreateExpenseRequest, ExpenseListQuery},
    },
    error::AppError,
    services::co_creators_service::PortalService,
    validation::ValidatedJson,
};

pub async fn list_events(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let events = PortalService::events(&mut conn, &user)?;
    Ok(Json(ApiResponse::success(events, "Events retrieved successfully")))
}

pub async fn get_event(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let event = PortalService::event(&mut conn, &user, event_id)?;
    Ok(Json(ApiResponse::success(event, "Event retrieved successfully")))
}

pub async fn list_attendees(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let attendees = PortalService::attendees(&mut conn, &user, event_id)?;
    Ok(Json(ApiResponse::success(
        attendees,
        "Attendees retrieved successfully",
    )))
}

pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (list, page, per_page) = PortalService::expenses(&mut conn, &user, event_id, &query)?;
    let meta = ResponseMeta::paginated(page, per_page, list.total_count);
    Ok(Json(ApiResponse::success_with_meta(
        list,
        "Expenses retrieved successfully",
        meta,
    )))
}

pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateExpenseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense = PortalService::create_expense(&mut conn, &user, event_id, &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(expense, "Expense created successfully")),
    ))
}

/// Latest settlement or `null`.
pub async fn get_settlement(
    State(state): State<Arc<AppState>>,
    user: CoCreatorUser,
    Path(event_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let settlement = PortalService::settlement(&mut conn, &user, event_id)?;
    Ok(Json(ApiResponse::success(
        settlement,
        "Settlement retrieved successfully",
    )))
}
