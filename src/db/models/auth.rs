use crate::db::enums::UserRole;
use crate::error::AppError;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// User models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub password_hash: Option<String>,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UserChangeset {
    pub name: Option<String>,
    pub role: Option<UserRole>,
    pub password_hash: Option<Option<String>>,
}

/// Who is calling. Set into request extensions by `auth_middleware`.
#[derive(Serialize, Clone, Debug)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Staff {
        id: Uuid,
        email: String,
        name: String,
        role: UserRole,
    },
    CoCreator {
        id: Uuid,
        email: String,
        name: String,
        event_ids: Vec<Uuid>,
    },
}

impl Principal {
    pub fn id(&self) -> Uuid {
        match self {
            Principal::Staff { id, .. } | Principal::CoCreator { id, .. } => *id,
        }
    }

    pub fn email(&self) -> &str {
        match self {
            Principal::Staff { email, .. } | Principal::CoCreator { email, .. } => email,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Principal::Staff {
                role: UserRole::Admin,
                ..
            }
        )
    }

    /// Actor string recorded in the audit log.
    pub fn actor(&self) -> String {
        match self {
            Principal::Staff { email, .. } => email.clone(),
            Principal::CoCreator { email, .. } => format!("co_creator/{}", email),
        }
    }
}

/// Admin or operator.
#[derive(Clone, Debug)]
pub struct StaffUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: UserRole,
}

impl StaffUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin access required"))
        }
    }
}

#[derive(Clone, Debug)]
pub struct AdminUser(pub StaffUser);

#[derive(Clone, Debug)]
pub struct CoCreatorUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub event_ids: Vec<Uuid>,
}

fn principal_from_parts(parts: &Parts) -> Result<Principal, AppError> {
    parts
        .extensions
        .get::<Principal>()
        .cloned()
        .ok_or_else(|| AppError::auth("Not authenticated"))
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        principal_from_parts(parts)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts)? {
            Principal::Staff {
                id,
                email,
                name,
                role,
            } => Ok(StaffUser {
                id,
                email,
                name,
                role,
            }),
            Principal::CoCreator { .. } => Err(AppError::forbidden(
                "Co-creators cannot access this endpoint",
            )),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let staff = StaffUser::from_request_parts(parts, state).await?;
        staff.require_admin()?;
        Ok(AdminUser(staff))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CoCreatorUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match principal_from_parts(parts)? {
            Principal::CoCreator {
                id,
                email,
                name,
                event_ids,
            } => Ok(CoCreatorUser {
                id,
                email,
                name,
                event_ids,
            }),
            Principal::Staff { .. } => Err(AppError::forbidden("Co-creator access only")),
        }
    }
}

// Authentication DTOs
#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    pub role: Option<UserRole>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

/// First admin account; accepted only while the users table is empty.
#[derive(Deserialize, Validate)]
pub struct BootstrapRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: String,
}

#[derive(Serialize, Debug)]
pub struct BootstrapResponse {
    pub message: String,
    pub email: String,
}

#[derive(Deserialize, Validate, Default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,

    #[validate(length(min = 8, message = "Password must be at least 8 characters long"))]
    pub password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(role: UserRole) -> Principal {
        Principal::Staff {
            id: Uuid::new_v4(),
            email: "ops@example.org".to_string(),
            name: "Ops".to_string(),
            role,
        }
    }

    #[test]
    fn test_principal_roles() {
        assert!(staff(UserRole::Admin).is_admin());
        assert!(!staff(UserRole::Operator).is_admin());

        let cc = Principal::CoCreator {
            id: Uuid::new_v4(),
            email: "cc@example.org".to_string(),
            name: "CC".to_string(),
            event_ids: vec![],
        };
        assert!(!cc.is_admin());
        assert_eq!(cc.actor(), "co_creator/cc@example.org");
        assert_eq!(staff(UserRole::Admin).actor(), "ops@example.org");
    }

    #[test]
    fn test_staff_require_admin() {
        let op = StaffUser {
            id: Uuid::new_v4(),
            email: "op@example.org".to_string(),
            name: "Op".to_string(),
            role: UserRole::Operator,
        };
        assert!(op.require_admin().is_err());
    }
}
