use bcrypt::hash;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::UserRole,
    db::models::api::error_codes,
    db::models::auth::{
        BootstrapRequest, CreateUserRequest, NewUser, UpdateUserRequest, User, UserChangeset,
    },
    db::repositories::users::UserRepo,
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
};

/// Bootstrap is closed as soon as any staff account exists.
pub fn ensure_bootstrap_open(existing_users: i64) -> Result<(), AppError> {
    if existing_users > 0 {
        return Err(AppError::conflict_with_code(
            "Admin user already exists. Bootstrap is only available when no users exist.",
            None,
            error_codes::BOOTSTRAP_CLOSED,
        ));
    }
    Ok(())
}

/// Staff account administration.
pub struct UsersService;

impl UsersService {
    /// Creates the first admin on an empty deployment. The table lock keeps two
    /// concurrent calls from both seeing zero users.
    pub fn bootstrap(
        conn: &mut PgConnection,
        bcrypt_cost: u32,
        req: &BootstrapRequest,
    ) -> Result<User, AppError> {
        let password_hash = hash(&req.password, bcrypt_cost)?;
        let new_user = NewUser {
            email: req.email.trim().to_lowercase(),
            name: req.name.trim().to_string(),
            role: UserRole::Admin,
            password_hash: Some(password_hash),
        };
        let ctx = RequestContext::system("system/bootstrap");

        let user = conn.transaction::<_, AppError, _>(|conn| {
            UserRepo::lock_table(conn)?;
            ensure_bootstrap_open(UserRepo::count(conn)?)?;

            let user = UserRepo::insert(conn, &new_user)?;
            AuditService::record_change::<Value, _>(
                conn,
                &ctx,
                "user",
                user.id,
                "bootstrap",
                None,
                Some(&json!({ "email": user.email, "role": user.role })),
            )?;
            Ok(user)
        })?;

        tracing::info!(user_id = %user.id, email = %user.email, "bootstrap admin created");
        Ok(user)
    }

    pub fn list(conn: &mut PgConnection) -> Result<Vec<User>, AppError> {
        Ok(UserRepo::list(conn)?)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        bcrypt_cost: u32,
        req: &CreateUserRequest,
    ) -> Result<User, AppError> {
        let email = req.email.trim().to_lowercase();
        if UserRepo::exists_by_email(conn, &email)? {
            return Err(AppError::conflict_with_code(
                "Email already exists",
                Some("email".to_string()),
                error_codes::USER_EMAIL_EXISTS,
            ));
        }

        let password_hash = hash(&req.password, bcrypt_cost)?;
        let new_user = NewUser {
            email,
            name: req.name.trim().to_string(),
            role: req.role.unwrap_or(UserRole::Operator),
            password_hash: Some(password_hash),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let user = UserRepo::insert(conn, &new_user)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "user",
                user.id,
                "created",
                None,
                Some(&json!({ "email": user.email, "role": user.role })),
            )?;
            Ok(user)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        bcrypt_cost: u32,
        user_id: Uuid,
        req: &UpdateUserRequest,
    ) -> Result<User, AppError> {
        let before = UserRepo::find_by_id(conn, user_id)?
            .ok_or_else(|| AppError::not_found("User"))?;
        if req.name.is_none() && req.role.is_none() && req.password.is_none() {
            return Err(AppError::bad_request("No fields to update"));
        }

        let password_hash = match req.password.as_deref() {
            Some(password) => Some(Some(hash(password, bcrypt_cost)?)),
            None => None,
        };
        let changes = UserChangeset {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            role: req.role,
            password_hash,
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let user = UserRepo::update(conn, user_id, &changes)?;
            // 密码只记录是否修改
            AuditService::record_change(
                conn,
                ctx,
                "user",
                user_id,
                "updated",
                Some(&json!({ "name": before.name, "role": before.role })),
                Some(&json!({
                    "name": user.name,
                    "role": user.role,
                    "password_changed": req.password.is_some(),
                })),
            )?;
            Ok(user)
        })
    }

    pub fn delete(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        if user_id == ctx.user_id {
            return Err(AppError::bad_request("You cannot delete your own account"));
        }
        let before = UserRepo::find_by_id(conn, user_id)?
            .ok_or_else(|| AppError::not_found("User"))?;

        conn.transaction::<_, AppError, _>(|conn| {
            UserRepo::delete_by_id(conn, user_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "user",
                user_id,
                "deleted",
                Some(&json!({ "email": before.email, "role": before.role })),
                None,
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bootstrap_only_on_empty_table() {
        assert!(ensure_bootstrap_open(0).is_ok());

        let err = ensure_bootstrap_open(1).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        assert!(matches!(
            err,
            AppError::Conflict { code: Some(ref code), .. } if code == error_codes::BOOTSTRAP_CLOSED
        ));
    }
}
