use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum::extract::multipart::MultipartError;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    AppState,
    db::models::{
        api::{ApiResponse, ResponseMeta},
        auth::{AdminUser, Principal, StaffUser},
        expense::{
            CreateExpenseRequest, CreateOperatingExpenseRequest, ExpenseListQuery,
            OperatingExpenseListQuery, UpdateExpenseRequest, UpdateOperatingExpenseRequest,
        },
    },
    error::AppError,
    services::{
        context::RequestContext,
        expenses_service::{ExpensesService, OperatingExpensesService},
    },
    validation::ValidatedJson,
};

const RECEIPT_FIELD: &str = "file";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge {
            message: "File too large. Maximum size is 10.0MB".to_string(),
        }
    } else {
        AppError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

/// Pulls the uploaded file out of a multipart body: the `file` field, or the
/// first field carrying a filename.
async fn read_receipt(mut multipart: Multipart) -> Result<(Option<String>, Bytes), AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_file =
            field.name() == Some(RECEIPT_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((content_type, bytes));
    }
    Err(AppError::bad_request("No file uploaded"))
}

// 活动支出（员工或有上传权限的共创者）
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(event_id): Path<Uuid>,
    Query(query): Query<ExpenseListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (list, page, per_page) = ExpensesService::list(&mut conn, &principal, event_id, &query)?;
    let meta = ResponseMeta::paginated(page, per_page, list.total_count);
    Ok(Json(ApiResponse::success_with_meta(
        list,
        "Expenses retrieved successfully",
        meta,
    )))
}

pub async fn create_expense(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(event_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<CreateExpenseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense = ExpensesService::create(&mut conn, &principal, event_id, &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(expense, "Expense created successfully")),
    ))
}

pub async fn update_expense(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((event_id, expense_id)): Path<(Uuid, Uuid)>,
    ValidatedJson(payload): ValidatedJson<UpdateExpenseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense =
        ExpensesService::update(&mut conn, &principal, event_id, expense_id, &payload)?;
    Ok(Json(ApiResponse::success(expense, "Expense updated successfully")))
}

pub async fn delete_expense(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((event_id, expense_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    ExpensesService::delete(&mut conn, &principal, event_id, expense_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path((event_id, expense_id)): Path<(Uuid, Uuid)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (content_type, bytes) = read_receipt(multipart).await?;
    let mut conn = state.db.get()?;
    let expense = ExpensesService::attach_receipt(
        &mut conn,
        &state.providers.storage,
        &principal,
        event_id,
        expense_id,
        content_type.as_deref(),
        &bytes,
    )
    .await?;
    Ok(Json(ApiResponse::success(expense, "Receipt uploaded successfully")))
}

// 运营支出
pub async fn list_operating_expenses(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Query(query): Query<OperatingExpenseListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let (list, page, per_page) = OperatingExpensesService::list(&mut conn, &query)?;
    let meta = ResponseMeta::paginated(page, per_page, list.total_count);
    Ok(Json(ApiResponse::success_with_meta(
        list,
        "Operating expenses retrieved successfully",
        meta,
    )))
}

pub async fn get_operating_expense(
    State(state): State<Arc<AppState>>,
    _staff: StaffUser,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense = OperatingExpensesService::get(&mut conn, expense_id)?;
    Ok(Json(ApiResponse::success(
        expense,
        "Operating expense retrieved successfully",
    )))
}

pub async fn create_operating_expense(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreateOperatingExpenseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense =
        OperatingExpensesService::create(&mut conn, &RequestContext::from(&admin), &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(
            expense,
            "Operating expense created successfully",
        )),
    ))
}

pub async fn update_operating_expense(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(expense_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateOperatingExpenseRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense = OperatingExpensesService::update(
        &mut conn,
        &RequestContext::from(&admin),
        expense_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(
        expense,
        "Operating expense updated successfully",
    )))
}

pub async fn reimburse_operating_expense(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let expense =
        OperatingExpensesService::reimburse(&mut conn, &RequestContext::from(&staff), expense_id)?;
    Ok(Json(ApiResponse::success(
        expense,
        "Operating expense marked as reimbursed",
    )))
}

pub async fn upload_operating_receipt(
    State(state): State<Arc<AppState>>,
    staff: StaffUser,
    Path(expense_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let (content_type, bytes) = read_receipt(multipart).await?;
    let mut conn = state.db.get()?;
    let expense = OperatingExpensesService::attach_receipt(
        &mut conn,
        &state.providers.storage,
        &RequestContext::from(&staff),
        expense_id,
        content_type.as_deref(),
        &bytes,
    )
    .await?;
    Ok(Json(ApiResponse::success(expense, "Receipt uploaded successfully")))
}

pub async fn delete_operating_expense(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(expense_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    OperatingExpensesService::delete(&mut conn, &RequestContext::from(&admin), expense_id)?;
    Ok(StatusCode::NO_CONTENT)
}
