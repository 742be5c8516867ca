use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::config::StripeConfig;
use crate::error::AppError;
use crate::services::pricing::LineItem;

/// Webhook timestamps older or newer than this are rejected.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub registration_id: Uuid,
    pub event_id: Uuid,
    pub event_slug: String,
    pub customer_email: String,
    pub line_items: Vec<LineItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, AppError>;
}

pub struct StripeClient {
    http: reqwest::Client,
    config: StripeConfig,
    app_url: String,
}

impl StripeClient {
    pub fn new(config: StripeConfig, app_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            app_url: app_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    /// Form fields for `POST /v1/checkout/sessions`.
    pub fn checkout_form(&self, req: &CheckoutRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_string(), "payment".to_string()),
            (
                "client_reference_id".to_string(),
                req.registration_id.to_string(),
            ),
            ("customer_email".to_string(), req.customer_email.clone()),
            (
                "success_url".to_string(),
                format!(
                    "{}/register/{}/success?session_id={{CHECKOUT_SESSION_ID}}",
                    self.app_url, req.event_slug
                ),
            ),
            (
                "cancel_url".to_string(),
                format!("{}/register/{}/cancelled", self.app_url, req.event_slug),
            ),
            (
                "metadata[registration_id]".to_string(),
                req.registration_id.to_string(),
            ),
            ("metadata[event_id]".to_string(), req.event_id.to_string()),
            ("metadata[event_slug]".to_string(), req.event_slug.clone()),
        ];

        for (i, item) in req.line_items.iter().enumerate() {
            let prefix = format!("line_items[{}]", i);
            match item {
                LineItem::Price { price_id, quantity } => {
                    form.push((format!("{}[price]", prefix), price_id.clone()));
                    form.push((format!("{}[quantity]", prefix), quantity.to_string()));
                }
                LineItem::Amount {
                    name,
                    unit_amount_cents,
                    quantity,
                } => {
                    form.push((
                        format!("{}[price_data][currency]", prefix),
                        "usd".to_string(),
                    ));
                    form.push((
                        format!("{}[price_data][product_data][name]", prefix),
                        name.clone(),
                    ));
                    form.push((
                        format!("{}[price_data][unit_amount]", prefix),
                        unit_amount_cents.to_string(),
                    ));
                    form.push((format!("{}[quantity]", prefix), quantity.to_string()));
                }
            }
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        req: &CheckoutRequest,
    ) -> Result<CheckoutSession, AppError> {
        if !self.is_configured() {
            return Err(AppError::external("Stripe is not configured"));
        }

        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .form(&self.checkout_form(req))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                registration_id = %req.registration_id,
                status = %status,
                body = %body,
                "stripe checkout session creation failed"
            );
            return Err(AppError::external(format!(
                "Stripe returned {} creating checkout session",
                status
            )));
        }

        let session: CheckoutSession = response.json().await?;
        tracing::info!(
            registration_id = %req.registration_id,
            session_id = %session.id,
            "stripe checkout session created"
        );
        Ok(session)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("missing signature header")]
    Missing,
    #[error("malformed signature header")]
    Malformed,
    #[error("timestamp outside tolerance")]
    Expired,
    #[error("no matching signature")]
    Mismatch,
}

/// Computes the `v1` signature Stripe sends for `payload` at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a `Stripe-Signature` header (`t=…,v1=…`) against the raw body.
pub fn verify_webhook_signature(
    payload: &[u8],
    header: Option<&str>,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let header = header.ok_or(SignatureError::Missing)?;

    let mut timestamp = None;
    let mut candidates = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => candidates.push(v.to_string()),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now - timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn client() -> StripeClient {
        StripeClient::new(
            StripeConfig {
                api_key: "sk_test".to_string(),
                webhook_secret: SECRET.to_string(),
                api_base: "https://api.stripe.com".to_string(),
            },
            "https://retreat.example.org/",
        )
    }

    #[test]
    fn test_valid_signature() {
        let payload = br#"{"id":"evt_1"}"#;
        let sig = compute_signature(SECRET, 1_700_000_000, payload);
        let header = format!("t=1700000000,v1={}", sig);
        assert_eq!(
            verify_webhook_signature(payload, Some(&header), SECRET, 1_700_000_100),
            Ok(())
        );
    }

    #[test]
    fn test_any_v1_may_match() {
        let payload = b"body";
        let sig = compute_signature(SECRET, 100, payload);
        let header = format!("t=100,v1=deadbeef,v1={},v0=zzz", sig);
        assert!(verify_webhook_signature(payload, Some(&header), SECRET, 100).is_ok());
    }

    #[test]
    fn test_rejections() {
        let payload = b"body";
        let sig = compute_signature(SECRET, 100, payload);

        assert_eq!(
            verify_webhook_signature(payload, None, SECRET, 100),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_webhook_signature(payload, Some("garbage"), SECRET, 100),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_webhook_signature(payload, Some(&format!("t=100,v1={}", sig)), SECRET, 401),
            Err(SignatureError::Expired)
        );
        assert_eq!(
            verify_webhook_signature(b"tampered", Some(&format!("t=100,v1={}", sig)), SECRET, 100),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_webhook_signature(payload, Some(&format!("t=100,v1={}", sig)), "other", 100),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_checkout_form_fields() {
        let req = CheckoutRequest {
            registration_id: Uuid::nil(),
            event_id: Uuid::nil(),
            event_slug: "spring-retreat".to_string(),
            customer_email: "guest@example.com".to_string(),
            line_items: vec![
                LineItem::Price {
                    price_id: "price_1".to_string(),
                    quantity: 1,
                },
                LineItem::amount("Spring Retreat — Friday", 3000),
            ],
        };
        let form = client().checkout_form(&req);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("mode"), Some("payment"));
        assert_eq!(
            get("success_url"),
            Some("https://retreat.example.org/register/spring-retreat/success?session_id={CHECKOUT_SESSION_ID}")
        );
        assert_eq!(get("line_items[0][price]"), Some("price_1"));
        assert_eq!(get("line_items[1][price_data][unit_amount]"), Some("3000"));
        assert_eq!(
            get("line_items[1][price_data][product_data][name]"),
            Some("Spring Retreat — Friday")
        );
        assert_eq!(get("metadata[event_slug]"), Some("spring-retreat"));
    }
}
