use crate::AppState;
use crate::db::enums::UserRole;
use crate::db::models::auth::Principal;
use crate::db::repositories::co_creators::{CoCreatorRepo, EventCoCreatorRepo};
use crate::db::repositories::users::UserRepo;
use crate::error::AppError;
use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Role claim carried by co-creator tokens.
pub const CO_CREATOR_ROLE: &str = "co_creator";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: String,
    #[serde(default)]
    pub event_ids: Vec<Uuid>,
    pub exp: u64,
    pub iat: u64,
    pub jti: String,
}

impl Claims {
    pub fn is_co_creator(&self) -> bool {
        self.role == CO_CREATOR_ROLE
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_minutes: u64,
}

impl From<&crate::config::AuthConfig> for AuthConfig {
    fn from(cfg: &crate::config::AuthConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_expiration_minutes: cfg.jwt_expiration_minutes,
        }
    }
}

/// Issues and verifies HS256 access tokens.
#[derive(Clone, Debug)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    fn issue(&self, sub: Uuid, email: &str, role: &str, event_ids: Vec<Uuid>) -> Result<String, AppError> {
        let now = Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub,
            email: email.to_string(),
            role: role.to_string(),
            event_ids,
            exp: now + self.config.jwt_expiration_minutes * 60,
            iat: now,
            jti: Uuid::new_v4().to_string(),
        };
        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_ref()),
        )?)
    }

    pub fn generate_staff_token(
        &self,
        user_id: Uuid,
        email: &str,
        role: UserRole,
    ) -> Result<String, AppError> {
        self.issue(user_id, email, role.as_str(), Vec::new())
    }

    pub fn generate_co_creator_token(
        &self,
        co_creator_id: Uuid,
        email: &str,
        event_ids: Vec<Uuid>,
    ) -> Result<String, AppError> {
        self.issue(co_creator_id, email, CO_CREATOR_ROLE, event_ids)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_ref()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| auth.token().trim().to_string())
        .filter(|token| !token.is_empty())
}

pub fn load_principal(
    conn: &mut diesel::PgConnection,
    claims: &Claims,
) -> Result<Principal, AppError> {
    if claims.is_co_creator() {
        let co_creator = CoCreatorRepo::find_by_id(conn, claims.sub)?
            .ok_or_else(|| AppError::auth("Co-creator not found"))?;
        let event_ids = EventCoCreatorRepo::event_ids_for(conn, co_creator.id)?;
        return Ok(Principal::CoCreator {
            id: co_creator.id,
            email: co_creator.email,
            name: co_creator.name,
            event_ids,
        });
    }

    let user = UserRepo::find_by_id(conn, claims.sub)?
        .ok_or_else(|| AppError::auth("User not found"))?;
    Ok(Principal::Staff {
        id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
    })
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<axum::body::Body>,
    next: Next<axum::body::Body>,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .ok_or_else(|| AppError::auth("Missing bearer token"))?;

    let claims = state
        .auth_service
        .verify_token(&token)
        .map_err(|_| AppError::auth("Invalid or expired token"))?;

    let mut conn = state.db.get()?;
    let principal = load_principal(&mut conn, &claims)?;
    drop(conn);

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, header::AUTHORIZATION};

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            jwt_secret: "a-very-long-test-secret".to_string(),
            jwt_expiration_minutes: 60,
        })
    }

    #[test]
    fn test_staff_token_round_trip() {
        let svc = service();
        let id = Uuid::new_v4();
        let token = svc
            .generate_staff_token(id, "ops@example.org", UserRole::Operator)
            .unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, "operator");
        assert!(!claims.is_co_creator());
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_co_creator_token_carries_events() {
        let svc = service();
        let events = vec![Uuid::new_v4(), Uuid::new_v4()];
        let token = svc
            .generate_co_creator_token(Uuid::new_v4(), "cc@example.org", events.clone())
            .unwrap();
        let claims = svc.verify_token(&token).unwrap();
        assert!(claims.is_co_creator());
        assert_eq!(claims.event_ids, events);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = service()
            .generate_staff_token(Uuid::new_v4(), "a@example.org", UserRole::Admin)
            .unwrap();
        let other = AuthService::new(AuthConfig {
            jwt_secret: "another-long-test-secret".to_string(),
            jwt_expiration_minutes: 60,
        });
        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers).as_deref(), Some("abc.def"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic xyz"));
        assert_eq!(bearer_token(&headers), None);
    }
}
