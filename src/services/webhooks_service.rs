use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{RegistrationStatus, SmsDirection},
    db::models::attendee::Attendee,
    db::models::communication::{NewSmsConversation, NewWebhookRaw, StripeEvent, TwilioInbound},
    db::models::event::Event,
    db::models::registration::{Registration, RegistrationChangeset},
    db::repositories::attendees::AttendeeRepo,
    db::repositories::communications::{SmsConversationRepo, WebhookRepo},
    db::repositories::events::EventRepo,
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    providers::{Providers, emails, stripe::verify_webhook_signature},
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::eta::parse_eta,
    utils::phone::normalize_phone,
};

pub const STRIPE_ACTOR: &str = "system/stripe";

/// Empty TwiML reply for Twilio.
pub const EMPTY_TWIML: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response/>"#;

/// Registration a checkout session belongs to.
pub fn session_registration_id(session: &Value) -> Option<Uuid> {
    session
        .get("client_reference_id")
        .and_then(Value::as_str)
        .or_else(|| {
            session
                .get("metadata")
                .and_then(|m| m.get("registration_id"))
                .and_then(Value::as_str)
        })
        .and_then(|id| Uuid::parse_str(id).ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refund {
    Full,
    Partial { remaining_cents: i64, refunded_cents: i64 },
}

pub fn classify_refund(amount_cents: i64, refunded_cents: i64) -> Refund {
    if refunded_cents >= amount_cents {
        Refund::Full
    } else {
        Refund::Partial {
            remaining_cents: amount_cents - refunded_cents,
            refunded_cents,
        }
    }
}

/// Splits `total_cents` across members in proportion to their current shares.
/// Leftover cents go to the earliest members; equal parts when no share is set.
pub fn apportion_cents(shares: &[i64], total_cents: i64) -> Vec<i64> {
    if shares.is_empty() {
        return Vec::new();
    }
    let total_cents = total_cents.max(0);
    let sum: i64 = shares.iter().map(|s| (*s).max(0)).sum();
    let mut parts: Vec<i64> = if sum == 0 {
        vec![total_cents / shares.len() as i64; shares.len()]
    } else {
        shares
            .iter()
            .map(|s| (i128::from((*s).max(0)) * i128::from(total_cents) / i128::from(sum)) as i64)
            .collect()
    };
    let mut leftover = total_cents - parts.iter().sum::<i64>();
    for part in parts.iter_mut() {
        if leftover == 0 {
            break;
        }
        *part += 1;
        leftover -= 1;
    }
    parts
}

pub fn append_note(existing: Option<&str>, line: &str) -> String {
    match existing.map(str::trim).filter(|n| !n.is_empty()) {
        Some(notes) => format!("{}\n{}", notes, line),
        None => line.to_string(),
    }
}

fn status_change(
    conn: &mut PgConnection,
    ctx: &RequestContext,
    registration: &Registration,
    changes: &RegistrationChangeset,
) -> Result<Registration, AppError> {
    let updated = RegistrationRepo::update(conn, registration.id, changes)?;
    AuditService::record_change(
        conn,
        ctx,
        "registration",
        registration.id,
        "status_change",
        Some(&json!({ "status": registration.status })),
        Some(&json!({ "status": updated.status })),
    )?;
    Ok(updated)
}

/// The registration plus the rest of its group, if it has one.
fn with_group(
    conn: &mut PgConnection,
    registration: Registration,
) -> Result<Vec<Registration>, AppError> {
    match registration.group_id {
        Some(group_id) => Ok(RegistrationRepo::list_by_group(conn, group_id)?),
        None => Ok(vec![registration]),
    }
}

pub struct WebhooksService;

impl WebhooksService {
    /// Rejects a Stripe delivery whose `Stripe-Signature` does not match the body.
    pub fn verify_stripe(secret: &str, payload: &[u8], signature: Option<&str>) -> Result<(), AppError> {
        if secret.is_empty() {
            tracing::error!("STRIPE_WEBHOOK_SECRET not set, webhook rejected");
            return Err(AppError::bad_request("Invalid signature"));
        }
        verify_webhook_signature(payload, signature, secret, Utc::now().timestamp()).map_err(|e| {
            tracing::warn!(error = %e, "stripe webhook signature verification failed");
            AppError::bad_request("Invalid signature")
        })
    }

    /// Stores and applies one verified Stripe event. Replays are answered
    /// with `already_processed` and change nothing.
    pub async fn stripe(
        conn: &mut PgConnection,
        providers: &Providers,
        payload: &[u8],
    ) -> Result<Value, AppError> {
        let raw: Value = serde_json::from_slice(payload)
            .map_err(|_| AppError::bad_request("Invalid payload"))?;
        let event: StripeEvent = serde_json::from_value(raw.clone())
            .map_err(|_| AppError::bad_request("Invalid payload"))?;

        if WebhookRepo::find_by_stripe_event_id(conn, &event.id)?.is_some() {
            tracing::info!(stripe_event_id = %event.id, "duplicate webhook skipped");
            return Ok(json!({ "status": "already_processed" }));
        }

        let ctx = RequestContext::system(STRIPE_ACTOR);
        let confirmations = conn.transaction::<_, AppError, _>(|conn| {
            let record = WebhookRepo::insert(
                conn,
                &NewWebhookRaw {
                    stripe_event_id: event.id.clone(),
                    event_type: event.event_type.clone(),
                    payload_json: raw,
                },
            )?;

            let object = &event.data.object;
            let confirmations = match event.event_type.as_str() {
                "checkout.session.completed" => Self::checkout_completed(conn, &ctx, object)?,
                "checkout.session.expired" => {
                    Self::checkout_expired(conn, &ctx, object)?;
                    Vec::new()
                }
                "charge.refunded" => {
                    Self::charge_refunded(conn, &ctx, object)?;
                    Vec::new()
                }
                other => {
                    tracing::info!(event_type = %other, "unhandled stripe webhook type");
                    Vec::new()
                }
            };

            WebhookRepo::mark_processed(conn, record.id)?;
            Ok(confirmations)
        })?;

        for (attendee, event) in &confirmations {
            providers
                .try_email(&emails::confirmation(attendee, event))
                .await;
        }
        Ok(json!({ "status": "processed" }))
    }

    fn checkout_completed(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        session: &Value,
    ) -> Result<Vec<(Attendee, Event)>, AppError> {
        let Some(registration_id) = session_registration_id(session) else {
            tracing::warn!("checkout.session.completed without client_reference_id");
            return Ok(Vec::new());
        };
        let Some(registration) = RegistrationRepo::find_by_id_for_update(conn, registration_id)?
        else {
            tracing::warn!(registration_id = %registration_id, "registration not found for completed checkout");
            return Ok(Vec::new());
        };

        let is_group = registration.group_id.is_some();
        let session_id = session.get("id").and_then(Value::as_str).map(str::to_string);
        let payment_intent = session
            .get("payment_intent")
            .and_then(Value::as_str)
            .map(str::to_string);
        let amount_total = session
            .get("amount_total")
            .and_then(Value::as_i64)
            .map(i32::try_from)
            .transpose()
            .map_err(|_| AppError::bad_request("amount_total out of range"))?;

        let mut confirmations = Vec::new();
        for registration in with_group(conn, registration)? {
            if registration.status == RegistrationStatus::Complete {
                continue;
            }
            let changes = RegistrationChangeset {
                status: Some(RegistrationStatus::Complete),
                stripe_checkout_session_id: session_id.clone().map(Some),
                stripe_payment_intent_id: payment_intent.clone().map(Some),
                // group members keep their own share
                payment_amount_cents: if is_group { None } else { amount_total.map(Some) },
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            let updated = status_change(conn, ctx, &registration, &changes)?;
            tracing::info!(registration_id = %updated.id, "registration completed via stripe");

            let attendee = AttendeeRepo::find_by_id(conn, updated.attendee_id)?;
            let event = EventRepo::find_by_id(conn, updated.event_id)?;
            if let (Some(attendee), Some(event)) = (attendee, event) {
                confirmations.push((attendee, event));
            }
        }
        Ok(confirmations)
    }

    fn checkout_expired(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        session: &Value,
    ) -> Result<(), AppError> {
        let Some(registration_id) = session_registration_id(session) else {
            tracing::warn!("checkout.session.expired without client_reference_id");
            return Ok(());
        };
        let Some(registration) = RegistrationRepo::find_by_id_for_update(conn, registration_id)?
        else {
            return Ok(());
        };

        for registration in with_group(conn, registration)? {
            if registration.status != RegistrationStatus::PendingPayment {
                continue;
            }
            let changes = RegistrationChangeset {
                status: Some(RegistrationStatus::Expired),
                updated_at: Some(Utc::now()),
                ..Default::default()
            };
            status_change(conn, ctx, &registration, &changes)?;
            tracing::info!(registration_id = %registration.id, "registration expired via stripe");
        }
        Ok(())
    }

    fn charge_refunded(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        charge: &Value,
    ) -> Result<(), AppError> {
        let Some(payment_intent) = charge.get("payment_intent").and_then(Value::as_str) else {
            tracing::warn!("charge.refunded without payment_intent");
            return Ok(());
        };
        let Some(registration) = RegistrationRepo::find_by_payment_intent(conn, payment_intent)?
        else {
            tracing::warn!(payment_intent = %payment_intent, "registration not found for refund");
            return Ok(());
        };

        let amount = charge.get("amount").and_then(Value::as_i64).unwrap_or(0);
        let refunded = charge
            .get("amount_refunded")
            .and_then(Value::as_i64)
            .unwrap_or(0);

        match classify_refund(amount, refunded) {
            Refund::Full => {
                for registration in with_group(conn, registration)? {
                    if registration.status == RegistrationStatus::Refunded {
                        continue;
                    }
                    let changes = RegistrationChangeset {
                        status: Some(RegistrationStatus::Refunded),
                        updated_at: Some(Utc::now()),
                        ..Default::default()
                    };
                    status_change(conn, ctx, &registration, &changes)?;
                }
            }
            Refund::Partial { remaining_cents, .. } => {
                // Group members share one charge; each keeps its part of what is left.
                let members = with_group(conn, registration)?;
                let shares: Vec<i64> = if members.len() == 1 {
                    vec![amount]
                } else {
                    members
                        .iter()
                        .map(|m| i64::from(m.payment_amount_cents.unwrap_or(0)))
                        .collect()
                };
                let remaining = apportion_cents(&shares, remaining_cents);

                for ((member, before), after) in members.iter().zip(&shares).zip(&remaining) {
                    let after = i32::try_from(*after)
                        .map_err(|_| AppError::bad_request("Refund amount out of range"))?;
                    let note = format!(
                        "Partial refund: {} cents refunded.",
                        before - i64::from(after)
                    );
                    let changes = RegistrationChangeset {
                        payment_amount_cents: Some(Some(after)),
                        notes: Some(Some(append_note(member.notes.as_deref(), &note))),
                        updated_at: Some(Utc::now()),
                        ..Default::default()
                    };
                    RegistrationRepo::update(conn, member.id, &changes)?;
                    AuditService::record_change(
                        conn,
                        ctx,
                        "registration",
                        member.id,
                        "partial_refund",
                        Some(&json!({ "payment_amount_cents": before })),
                        Some(&json!({ "payment_amount_cents": after })),
                    )?;
                }
            }
        }

        tracing::info!(
            payment_intent = %payment_intent,
            amount_cents = amount,
            refunded_cents = refunded,
            "stripe refund processed"
        );
        Ok(())
    }

    /// Stores an inbound SMS and picks up an ETA if the text has one.
    pub fn twilio_inbound(conn: &mut PgConnection, form: &TwilioInbound) -> Result<(), AppError> {
        let phone = form
            .from
            .as_deref()
            .and_then(normalize_phone)
            .ok_or_else(|| AppError::bad_request("Missing From"))?;

        if let Some(sid) = form.message_sid.as_deref() {
            if SmsConversationRepo::exists_by_sid(conn, sid)? {
                tracing::info!(message_sid = %sid, "duplicate inbound sms ignored");
                return Ok(());
            }
        }

        let registration = match AttendeeRepo::find_by_phone(conn, &phone)? {
            Some(attendee) => RegistrationRepo::latest_for_attendee(conn, attendee.id)?,
            None => None,
        };

        conn.transaction::<_, AppError, _>(|conn| {
            SmsConversationRepo::insert(
                conn,
                &NewSmsConversation {
                    registration_id: registration.as_ref().map(|r| r.id),
                    attendee_phone: phone.clone(),
                    direction: SmsDirection::Inbound,
                    body: form.body.clone(),
                    twilio_sid: form.message_sid.clone(),
                    sent_by: None,
                },
            )?;

            if let (Some(registration), Some(eta)) =
                (registration.as_ref(), parse_eta(&form.body, Utc::now()))
            {
                let changes = RegistrationChangeset {
                    estimated_arrival: Some(Some(eta)),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                };
                RegistrationRepo::update(conn, registration.id, &changes)?;
                tracing::info!(registration_id = %registration.id, eta = %eta, "eta recorded from sms");
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_registration_id() {
        let id = Uuid::new_v4();
        let session = json!({ "id": "cs_1", "client_reference_id": id.to_string() });
        assert_eq!(session_registration_id(&session), Some(id));

        let session = json!({ "metadata": { "registration_id": id.to_string() } });
        assert_eq!(session_registration_id(&session), Some(id));

        assert_eq!(session_registration_id(&json!({ "client_reference_id": "nope" })), None);
        assert_eq!(session_registration_id(&json!({})), None);
    }

    #[test]
    fn test_refund_classification() {
        assert_eq!(classify_refund(5000, 5000), Refund::Full);
        assert_eq!(classify_refund(5000, 6000), Refund::Full);
        assert_eq!(
            classify_refund(5000, 1500),
            Refund::Partial {
                remaining_cents: 3500,
                refunded_cents: 1500
            }
        );
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note(None, "Partial refund: 10 cents refunded."), "Partial refund: 10 cents refunded.");
        assert_eq!(append_note(Some(" "), "x"), "x");
        assert_eq!(append_note(Some("VIP"), "x"), "VIP\nx");
    }

    #[test]
    fn test_stripe_event_envelope() {
        let raw = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": { "id": "cs_1", "amount_total": 5000 } }
        });
        let event: StripeEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object["amount_total"], 5000);
    }
}
