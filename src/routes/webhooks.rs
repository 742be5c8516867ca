use axum::{
    Form, Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::{
    AppState,
    db::models::communication::TwilioInbound,
    error::AppError,
    services::webhooks_service::{EMPTY_TWIML, WebhooksService},
};

const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Raw body is needed for signature verification, so no JSON extractor here.
pub async fn stripe(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    WebhooksService::verify_stripe(&state.config.stripe_webhook_secret, &body, signature)?;

    let mut conn = state.db.get()?;
    let result = WebhooksService::stripe(&mut conn, &state.providers, &body).await?;
    Ok(Json(result))
}

// Twilio 要求返回 TwiML
pub async fn twilio_inbound(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TwilioInbound>,
) -> Result<impl IntoResponse, AppError> {
    let mut conn = state.db.get()?;
    WebhooksService::twilio_inbound(&mut conn, &form)?;
    Ok(([(header::CONTENT_TYPE, "application/xml")], EMPTY_TWIML))
}
