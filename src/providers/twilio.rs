use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TwilioConfig;
use crate::error::AppError;

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Sends one SMS. `Ok(None)` means SMS is not configured and nothing was sent.
    async fn send_sms(&self, to: &str, body: &str) -> Result<Option<String>, AppError>;
}

#[derive(Deserialize)]
struct MessageResponse {
    sid: String,
}

pub struct TwilioClient {
    http: reqwest::Client,
    config: TwilioConfig,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.account_sid.is_empty()
            && !self.config.auth_token.is_empty()
            && !self.config.from_number.is_empty()
    }
}

#[async_trait]
impl SmsSender for TwilioClient {
    async fn send_sms(&self, to: &str, body: &str) -> Result<Option<String>, AppError> {
        if !self.is_configured() {
            tracing::warn!(to = %to, "twilio not configured, sms skipped");
            return Ok(None);
        }

        let url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        );
        let response = self
            .http
            .post(url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!(to = %to, status = %status, body = %text, "twilio send failed");
            return Err(AppError::external(format!("Twilio returned {}", status)));
        }

        let message: MessageResponse = response.json().await?;
        tracing::info!(to = %to, sid = %message.sid, "sms sent");
        Ok(Some(message.sid))
    }
}
