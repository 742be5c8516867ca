use bcrypt::verify;
use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;

use crate::{
    config::Config,
    db::models::auth::{LoginRequest, TokenResponse},
    db::models::co_creator::CoCreator,
    db::repositories::co_creators::{CoCreatorRepo, EventCoCreatorRepo},
    db::repositories::users::UserRepo,
    error::AppError,
    middleware::auth::AuthService,
    providers::{Providers, emails},
    utils::tokens::{generate_token, hash_token},
};

/// Bytes of entropy in a magic-link token.
pub const MAGIC_LINK_TOKEN_BYTES: usize = 48;

pub const MAGIC_LINK_SENT: &str =
    "If that email belongs to a co-creator, a login link has been sent.";

pub fn magic_link_url(app_base_url: &str, token: &str) -> String {
    format!("{}/auth/verify?token={}", app_base_url.trim_end_matches('/'), token)
}

/// A stored token is usable only while its expiry lies in the future.
pub fn token_is_live(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_some_and(|at| at > now)
}

/// Staff password login and co-creator magic links.
pub struct SessionService;

impl SessionService {
    pub fn login(
        conn: &mut PgConnection,
        tokens: &AuthService,
        req: &LoginRequest,
    ) -> Result<TokenResponse, AppError> {
        let email = req.email.trim().to_lowercase();
        let user = UserRepo::find_by_email(conn, &email)?
            .ok_or_else(|| AppError::auth("Invalid email or password"))?;
        let hash = user
            .password_hash
            .as_deref()
            .ok_or_else(|| AppError::auth("Invalid email or password"))?;

        let is_valid = verify(&req.password, hash)
            .map_err(|_| AppError::internal("Failed to verify password"))?;
        if !is_valid {
            tracing::info!(email = %email, "login rejected");
            return Err(AppError::auth("Invalid email or password"));
        }

        let token = tokens.generate_staff_token(user.id, &user.email, user.role)?;
        Ok(TokenResponse::bearer(token))
    }

    /// Always succeeds so callers cannot probe which emails exist.
    pub async fn request_magic_link(
        conn: &mut PgConnection,
        providers: &Providers,
        config: &Config,
        email: &str,
    ) -> Result<(), AppError> {
        let email = email.trim().to_lowercase();
        match CoCreatorRepo::find_by_email(conn, &email)? {
            Some(co_creator) => {
                Self::issue_magic_link(conn, providers, config, &co_creator).await?;
            }
            None => tracing::info!(email = %email, "magic link requested for unknown email"),
        }
        Ok(())
    }

    /// Stores a fresh token hash and emails the link. Returns whether the email went out.
    pub async fn issue_magic_link(
        conn: &mut PgConnection,
        providers: &Providers,
        config: &Config,
        co_creator: &CoCreator,
    ) -> Result<bool, AppError> {
        let token = generate_token(MAGIC_LINK_TOKEN_BYTES);
        let expires_at = Utc::now() + Duration::hours(config.magic_link_expiration_hours);
        CoCreatorRepo::set_token(conn, co_creator.id, Some(hash_token(&token)), Some(expires_at))?;

        let link = magic_link_url(config.app_base_url(), &token);
        let message = emails::magic_link(
            &co_creator.email,
            &co_creator.name,
            &link,
            config.magic_link_expiration_hours,
        );
        let sent = providers.try_email(&message).await;
        tracing::info!(co_creator_id = %co_creator.id, sent, "magic link issued");
        Ok(sent)
    }

    /// Exchanges a magic-link token for a co-creator JWT. Tokens are single use.
    pub fn verify(
        conn: &mut PgConnection,
        tokens: &AuthService,
        token: &str,
    ) -> Result<TokenResponse, AppError> {
        let co_creator = CoCreatorRepo::find_by_token_hash(conn, &hash_token(token.trim()))?
            .ok_or_else(|| AppError::auth("Invalid or expired link"))?;
        if !token_is_live(co_creator.token_expires_at, Utc::now()) {
            CoCreatorRepo::set_token(conn, co_creator.id, None, None)?;
            return Err(AppError::auth("Invalid or expired link"));
        }

        CoCreatorRepo::set_token(conn, co_creator.id, None, None)?;
        let event_ids = EventCoCreatorRepo::event_ids_for(conn, co_creator.id)?;
        let jwt = tokens.generate_co_creator_token(co_creator.id, &co_creator.email, event_ids)?;
        Ok(TokenResponse::bearer(jwt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_link_url() {
        assert_eq!(
            magic_link_url("https://retreat.example.org/", "abc"),
            "https://retreat.example.org/auth/verify?token=abc"
        );
    }

    #[test]
    fn test_token_is_live() {
        let now = Utc::now();
        assert!(token_is_live(Some(now + Duration::minutes(5)), now));
        assert!(!token_is_live(Some(now - Duration::seconds(1)), now));
        assert!(!token_is_live(None, now));
    }
}
