use crate::error::{AppError, AppResult};
use serde::Deserialize;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub database_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub database_min_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub database_connection_timeout: u64,

    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    #[serde(default = "default_host")]
    pub server_host: String,
    #[serde(default = "default_port")]
    pub server_port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_expiration_minutes")]
    pub jwt_expiration_minutes: u64,
    #[serde(default = "default_magic_link_expiration_hours")]
    pub magic_link_expiration_hours: i64,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default)]
    pub admin_notification_email: Option<String>,

    #[serde(default)]
    pub stripe_api_key: String,
    #[serde(default)]
    pub stripe_webhook_secret: String,
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,

    #[serde(default)]
    pub twilio_account_sid: String,
    #[serde(default)]
    pub twilio_auth_token: String,
    #[serde(default)]
    pub twilio_phone_number: String,
    #[serde(default = "default_twilio_api_base")]
    pub twilio_api_base: String,

    #[serde(default)]
    pub resend_api_key: String,
    #[serde(default = "default_email_from")]
    pub email_from: String,
    #[serde(default = "default_resend_api_base")]
    pub resend_api_base: String,

    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    #[serde(default = "default_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    /// Key rate limits on `X-Forwarded-For`/`X-Real-IP`; only set behind a trusted proxy.
    #[serde(default)]
    pub trust_proxy_headers: bool,
    #[serde(default = "default_scheduler_enabled")]
    pub scheduler_enabled: bool,
}

// 嵌套结构的访问器
#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiration_minutes: u64,
    pub magic_link_expiration_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Clone, Debug)]
pub struct StripeConfig {
    pub api_key: String,
    pub webhook_secret: String,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct ResendConfig {
    pub api_key: String,
    pub from: String,
    pub api_base: String,
}

// Default value functions
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    2
}
fn default_connection_timeout() -> u64 {
    30
}
fn default_redis_url() -> String {
    "redis://127.0.0.1/".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}
fn default_jwt_secret() -> String {
    "change-me-in-production".to_string()
}
fn default_jwt_expiration_minutes() -> u64 {
    1440
}
fn default_magic_link_expiration_hours() -> i64 {
    72
}
fn default_bcrypt_cost() -> u32 {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_app_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_stripe_api_base() -> String {
    "https://api.stripe.com".to_string()
}
fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}
fn default_resend_api_base() -> String {
    "https://api.resend.com".to_string()
}
fn default_email_from() -> String {
    "Retreat Team <hello@example.org>".to_string()
}
fn default_upload_dir() -> String {
    "./uploads/receipts".to_string()
}
fn default_rate_limit_per_minute() -> u32 {
    20
}
fn default_scheduler_enabled() -> bool {
    true
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();

        let config = envy::from_env::<Config>()
            .map_err(|e| AppError::Config(format!("Failed to load config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.database_max_connections == 0 {
            return Err(AppError::Config(
                "DATABASE_MAX_CONNECTIONS must be > 0".to_string(),
            ));
        }

        if self.database_min_connections > self.database_max_connections {
            return Err(AppError::Config(
                "DATABASE_MIN_CONNECTIONS cannot be greater than DATABASE_MAX_CONNECTIONS"
                    .to_string(),
            ));
        }

        if self.jwt_secret == "change-me-in-production" || self.jwt_secret.len() < 16 {
            return Err(AppError::Config(
                "JWT_SECRET must be set to a secure value (16+ chars)".to_string(),
            ));
        }

        if self.jwt_expiration_minutes == 0 {
            return Err(AppError::Config(
                "JWT_EXPIRATION_MINUTES must be > 0".to_string(),
            ));
        }

        if self.magic_link_expiration_hours <= 0 {
            return Err(AppError::Config(
                "MAGIC_LINK_EXPIRATION_HOURS must be > 0".to_string(),
            ));
        }

        if url::Url::parse(&self.app_url).is_err() {
            return Err(AppError::Config("APP_URL must be an absolute URL".to_string()));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(AppError::Config(
                "RATE_LIMIT_PER_MINUTE must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// `APP_URL` without a trailing slash.
    pub fn app_base_url(&self) -> &str {
        self.app_url.trim_end_matches('/')
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connection_timeout: self.database_connection_timeout,
        }
    }

    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            host: self.server_host.clone(),
            port: self.server_port,
            cors_origins: self.cors_origins.clone(),
        }
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            jwt_secret: self.jwt_secret.clone(),
            jwt_expiration_minutes: self.jwt_expiration_minutes,
            magic_link_expiration_hours: self.magic_link_expiration_hours,
            bcrypt_cost: self.bcrypt_cost,
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: self.log_format.clone(),
        }
    }

    pub fn stripe(&self) -> StripeConfig {
        StripeConfig {
            api_key: self.stripe_api_key.clone(),
            webhook_secret: self.stripe_webhook_secret.clone(),
            api_base: self.stripe_api_base.clone(),
        }
    }

    pub fn twilio(&self) -> TwilioConfig {
        TwilioConfig {
            account_sid: self.twilio_account_sid.clone(),
            auth_token: self.twilio_auth_token.clone(),
            from_number: self.twilio_phone_number.clone(),
            api_base: self.twilio_api_base.clone(),
        }
    }

    pub fn resend(&self) -> ResendConfig {
        ResendConfig {
            api_key: self.resend_api_key.clone(),
            from: self.email_from.clone(),
            api_base: self.resend_api_base.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample() -> Config {
        Config {
            database_url: "postgres://localhost/retreat".to_string(),
            database_max_connections: default_max_connections(),
            database_min_connections: default_min_connections(),
            database_connection_timeout: default_connection_timeout(),
            redis_url: default_redis_url(),
            server_host: default_host(),
            server_port: default_port(),
            cors_origins: default_cors_origins(),
            jwt_secret: "a-very-long-test-secret".to_string(),
            jwt_expiration_minutes: default_jwt_expiration_minutes(),
            magic_link_expiration_hours: default_magic_link_expiration_hours(),
            bcrypt_cost: 4,
            log_level: default_log_level(),
            log_format: default_log_format(),
            app_url: "https://retreat.example.org/".to_string(),
            admin_notification_email: None,
            stripe_api_key: String::new(),
            stripe_webhook_secret: String::new(),
            stripe_api_base: default_stripe_api_base(),
            twilio_account_sid: String::new(),
            twilio_auth_token: String::new(),
            twilio_phone_number: String::new(),
            twilio_api_base: default_twilio_api_base(),
            resend_api_key: String::new(),
            email_from: default_email_from(),
            resend_api_base: default_resend_api_base(),
            upload_dir: default_upload_dir(),
            rate_limit_per_minute: default_rate_limit_per_minute(),
            trust_proxy_headers: false,
            scheduler_enabled: true,
        }
    }

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_default_secret() {
        let mut cfg = sample();
        cfg.jwt_secret = default_jwt_secret();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_pool_bounds() {
        let mut cfg = sample();
        cfg.database_min_connections = 50;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_app_base_url_trims_slash() {
        assert_eq!(sample().app_base_url(), "https://retreat.example.org");
    }
}
