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
        auth::{AdminUser, BootstrapRequest, BootstrapResponse, CreateUserRequest, UpdateUserRequest},
    },
    error::AppError,
    services::{context::RequestContext, users_service::UsersService},
    validation::ValidatedJson,
};

/// Public: creates the first admin while no users exist, 409 afterwards.
pub async fn bootstrap_admin(
    State(state): State<Arc<AppState>>,
    ValidatedJson(payload): ValidatedJson<BootstrapRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let user = UsersService::bootstrap(&mut conn, state.config.bcrypt_cost, &payload)?;
    let body = BootstrapResponse {
        message: "Admin user created".to_string(),
        email: user.email,
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(body, "Admin user created")),
    ))
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let users = UsersService::list(&mut conn)?;
    Ok(Json(ApiResponse::success(users, "Users retrieved successfully")))
}

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let ctx = RequestContext::from(&admin);
    let user = UsersService::create(&mut conn, &ctx, state.config.bcrypt_cost, &payload)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::created(user, "User created successfully")),
    ))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    let ctx = RequestContext::from(&admin);
    let user = UsersService::update(
        &mut conn,
        &ctx,
        state.config.bcrypt_cost,
        user_id,
        &payload,
    )?;
    Ok(Json(ApiResponse::success(user, "User updated successfully")))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    UsersService::delete(&mut conn, &RequestContext::from(&admin), user_id)?;
    Ok(StatusCode::NO_CONTENT)
}
