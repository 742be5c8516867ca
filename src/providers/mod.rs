pub mod emails;
pub mod resend;
pub mod storage;
pub mod stripe;
pub mod twilio;

use std::sync::Arc;

use crate::config::Config;

pub use resend::{EmailMessage, EmailSender, ResendClient};
pub use storage::ReceiptStorage;
pub use stripe::{CheckoutRequest, CheckoutSession, PaymentGateway, StripeClient};
pub use twilio::{SmsSender, TwilioClient};

/// Outbound integrations shared by handlers and the scheduler.
#[derive(Clone)]
pub struct Providers {
    pub payments: Arc<dyn PaymentGateway>,
    pub sms: Arc<dyn SmsSender>,
    pub email: Arc<dyn EmailSender>,
    pub storage: ReceiptStorage,
}

impl Providers {
    pub fn from_config(config: &Config) -> Self {
        let stripe = StripeClient::new(config.stripe(), config.app_base_url());
        let twilio = TwilioClient::new(config.twilio());
        let resend = ResendClient::new(config.resend());

        if !stripe.is_configured() {
            tracing::warn!("STRIPE_API_KEY not set, paid registrations will fail at checkout");
        }
        if !twilio.is_configured() {
            tracing::warn!("Twilio credentials not set, SMS disabled");
        }
        if !resend.is_configured() {
            tracing::warn!("RESEND_API_KEY not set, email disabled");
        }

        Self {
            payments: Arc::new(stripe),
            sms: Arc::new(twilio),
            email: Arc::new(resend),
            storage: ReceiptStorage::new(&config.upload_dir),
        }
    }

    /// Sends an SMS and reports success; failures are logged, never raised.
    pub async fn try_sms(&self, to: &str, body: &str) -> (bool, Option<String>) {
        match self.sms.send_sms(to, body).await {
            Ok(Some(sid)) => (true, Some(sid)),
            Ok(None) => (false, None),
            Err(e) => {
                tracing::error!(to = %to, error = %e, "sms delivery failed");
                (false, None)
            }
        }
    }

    /// Sends an email and reports success; failures are logged, never raised.
    pub async fn try_email(&self, message: &EmailMessage) -> bool {
        match self.email.send_email(message).await {
            Ok(Some(_)) => true,
            Ok(None) => false,
            Err(e) => {
                tracing::error!(to = %message.to, error = %e, "email delivery failed");
                false
            }
        }
    }
}
