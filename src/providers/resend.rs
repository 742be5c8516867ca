use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ResendConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Sends one email. `Ok(None)` means email is not configured and nothing was sent.
    async fn send_email(&self, message: &EmailMessage) -> Result<Option<String>, AppError>;
}

#[derive(Serialize)]
struct SendEmailBody<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Deserialize)]
struct SendEmailResponse {
    id: String,
}

pub struct ResendClient {
    http: reqwest::Client,
    config: ResendConfig,
}

impl ResendClient {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }
}

#[async_trait]
impl EmailSender for ResendClient {
    async fn send_email(&self, message: &EmailMessage) -> Result<Option<String>, AppError> {
        if !self.is_configured() {
            tracing::warn!(to = %message.to, subject = %message.subject, "resend not configured, email skipped");
            return Ok(None);
        }

        let url = format!("{}/emails", self.config.api_base.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&SendEmailBody {
                from: &self.config.from,
                to: [&message.to],
                subject: &message.subject,
                html: &message.html,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            tracing::error!(to = %message.to, status = %status, body = %text, "resend send failed");
            return Err(AppError::external(format!("Resend returned {}", status)));
        }

        let sent: SendEmailResponse = response.json().await?;
        tracing::info!(to = %message.to, id = %sent.id, "email sent");
        Ok(Some(sent.id))
    }
}
