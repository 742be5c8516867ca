use jsonwebtoken::{EncodingKey, Header, encode};
use retreat_backend::db::enums::UserRole;
use retreat_backend::middleware::auth::{AuthConfig, AuthService, Claims, CO_CREATOR_ROLE};
use uuid::Uuid;

const SECRET: &str = "unit-test-secret-long-enough";

fn service() -> AuthService {
    AuthService::new(AuthConfig {
        jwt_secret: SECRET.to_string(),
        jwt_expiration_minutes: 15,
    })
}

#[test]
fn staff_and_co_creator_tokens_carry_roles() {
    let svc = service();

    let staff_id = Uuid::new_v4();
    let token = svc
        .generate_staff_token(staff_id, "lead@example.org", UserRole::Admin)
        .unwrap();
    let claims = svc.verify_token(&token).unwrap();
    assert_eq!(claims.sub, staff_id);
    assert_eq!(claims.role, "admin");
    assert!(claims.event_ids.is_empty());
    assert_eq!(claims.exp - claims.iat, 15 * 60);

    let event_id = Uuid::new_v4();
    let token = svc
        .generate_co_creator_token(Uuid::new_v4(), "guide@example.org", vec![event_id])
        .unwrap();
    let claims = svc.verify_token(&token).unwrap();
    assert_eq!(claims.role, CO_CREATOR_ROLE);
    assert!(claims.is_co_creator());
    assert_eq!(claims.event_ids, vec![event_id]);
}

#[test]
fn expired_token_is_rejected() {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: Uuid::new_v4(),
        email: "late@example.org".to_string(),
        role: "operator".to_string(),
        event_ids: Vec::new(),
        exp: now - 3600,
        iat: now - 7200,
        jti: Uuid::new_v4().to_string(),
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_ref()),
    )
    .unwrap();

    assert!(service().verify_token(&token).is_err());
}

#[test]
fn tampered_token_is_rejected() {
    let token = service()
        .generate_staff_token(Uuid::new_v4(), "ops@example.org", UserRole::Operator)
        .unwrap();
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    parts[2] = parts[2].chars().rev().collect();
    assert!(service().verify_token(&parts.join(".")).is_err());
}
