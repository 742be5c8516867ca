use std::collections::HashMap;

use diesel::prelude::*;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    db::enums::{NotificationChannel, NotificationStatus, RegistrationStatus, SmsDirection, TemplateChannel},
    db::models::api::PageParams,
    db::models::attendee::Attendee,
    db::models::communication::{
        BulkNotificationRequest, BulkNotificationResult, NewNotificationLog, NewSmsConversation,
        NotificationLog, NotificationLogQuery, SmsBlastResult,
    },
    db::models::event::Event,
    db::models::registration::Registration,
    db::repositories::communications::{
        MessageTemplateRepo, NotificationLogFilter, NotificationLogRepo, SmsConversationRepo,
    },
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    providers::{Providers, emails},
    services::context::RequestContext,
    services::events_service::EventsService,
    utils::{content_hash, render_template},
};

pub const DAY_OF_SMS_TEMPLATE: &str = "day_of_sms";
pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

const DEFAULT_MEETING_POINT: &str = "See event details for directions";

/// Variables available to message templates for one registration.
pub fn attendee_variables(
    registration: &Registration,
    attendee: &Attendee,
    event: &Event,
    app_base_url: &str,
) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    vars.insert("first_name".to_string(), attendee.first_name.clone());
    vars.insert("last_name".to_string(), attendee.last_name.clone());
    vars.insert("email".to_string(), attendee.email.clone());
    vars.insert("phone".to_string(), attendee.phone.clone().unwrap_or_default());
    vars.insert("event_name".to_string(), event.name.clone());
    vars.insert(
        "event_date".to_string(),
        event.event_date.format("%B %d, %Y").to_string(),
    );
    vars.insert(
        "event_time".to_string(),
        event.event_date.format("%I:%M %p").to_string(),
    );
    vars.insert(
        "meeting_point".to_string(),
        event
            .meeting_point_a
            .clone()
            .unwrap_or_else(|| DEFAULT_MEETING_POINT.to_string()),
    );
    vars.insert(
        "cancel_url".to_string(),
        format!(
            "{}/register/{}/cancel?reg={}",
            app_base_url.trim_end_matches('/'),
            event.slug,
            registration.id
        ),
    );
    vars
}

/// Default bulk key: first 32 hex chars of SHA-256 over the request identity.
pub fn bulk_idempotency_key(
    event_id: Uuid,
    channel: TemplateChannel,
    template_id: Option<Uuid>,
    custom_message: Option<&str>,
) -> String {
    let source = format!(
        "{}:{}:{}:{}",
        event_id,
        channel,
        template_id.map(|id| id.to_string()).unwrap_or_default(),
        custom_message.unwrap_or_default()
    );
    let mut key = hex::encode(Sha256::digest(source.as_bytes()));
    key.truncate(32);
    key
}

pub fn bulk_template_id(key: &str) -> String {
    format!("bulk:{}", key)
}

fn log_entry(
    registration_id: Uuid,
    channel: NotificationChannel,
    template_id: &str,
    hash: &str,
    delivered: bool,
) -> NewNotificationLog {
    NewNotificationLog {
        registration_id,
        channel,
        template_id: template_id.to_string(),
        content_hash: hash.to_string(),
        status: NotificationStatus::from_success(delivered),
    }
}

pub struct NotificationsService;

impl NotificationsService {
    /// Sends one SMS, logs it under `template_id` and keeps a copy in the inbox.
    pub async fn deliver_sms(
        conn: &mut PgConnection,
        providers: &Providers,
        registration_id: Uuid,
        phone: &str,
        body: &str,
        template_id: &str,
        sent_by: Option<Uuid>,
    ) -> Result<bool, AppError> {
        let (delivered, sid) = providers.try_sms(phone, body).await;
        Self::record_sms(conn, registration_id, phone, body, template_id, sent_by, delivered, sid)?;
        Ok(delivered)
    }

    /// Log row plus outbound inbox copy for an SMS that was already attempted.
    #[allow(clippy::too_many_arguments)]
    fn record_sms(
        conn: &mut PgConnection,
        registration_id: Uuid,
        phone: &str,
        body: &str,
        template_id: &str,
        sent_by: Option<Uuid>,
        delivered: bool,
        sid: Option<String>,
    ) -> Result<(), AppError> {
        let hash = content_hash(body);
        conn.transaction::<_, AppError, _>(|conn| {
            NotificationLogRepo::insert(
                conn,
                &log_entry(registration_id, NotificationChannel::Sms, template_id, &hash, delivered),
            )?;
            SmsConversationRepo::insert(
                conn,
                &NewSmsConversation {
                    registration_id: Some(registration_id),
                    attendee_phone: phone.to_string(),
                    direction: SmsDirection::Outbound,
                    body: body.to_string(),
                    twilio_sid: sid,
                    sent_by,
                },
            )?;
            Ok(())
        })
    }

    /// Records an attempt that was sent outside `deliver_*`.
    pub fn log_delivery(
        conn: &mut PgConnection,
        registration_id: Uuid,
        channel: NotificationChannel,
        template_id: &str,
        content: &str,
        delivered: bool,
    ) -> Result<(), AppError> {
        NotificationLogRepo::insert(
            conn,
            &log_entry(registration_id, channel, template_id, &content_hash(content), delivered),
        )?;
        Ok(())
    }

    /// Day-of blast to every complete registration that has a phone number.
    pub async fn sms_blast(
        conn: &mut PgConnection,
        providers: &Providers,
        ctx: &RequestContext,
        event_id: Uuid,
        message: &str,
    ) -> Result<SmsBlastResult, AppError> {
        EventsService::find(conn, event_id)?;
        let rows = RegistrationRepo::list_with_attendees_by_statuses(
            conn,
            event_id,
            &[RegistrationStatus::Complete],
        )?;
        let sent_by = Some(ctx.user_id).filter(|id| !id.is_nil());

        let mut result = SmsBlastResult::default();
        for (registration, attendee) in rows {
            let Some(phone) = attendee.phone.as_deref() else {
                continue;
            };
            let delivered = Self::deliver_sms(
                conn,
                providers,
                registration.id,
                phone,
                message,
                DAY_OF_SMS_TEMPLATE,
                sent_by,
            )
            .await?;
            if delivered {
                result.sent_count += 1;
            } else {
                result.failed_count += 1;
            }
        }

        tracing::info!(
            event_id = %event_id,
            sent = result.sent_count,
            failed = result.failed_count,
            "sms blast finished"
        );
        Ok(result)
    }

    pub fn log(
        conn: &mut PgConnection,
        query: &NotificationLogQuery,
    ) -> Result<(Vec<NotificationLog>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let filter = NotificationLogFilter {
            event_id: query.event_id,
            channel: query.channel,
            status: query.status,
        };
        let (items, total) = NotificationLogRepo::list(conn, &filter, offset, per_page)?;
        Ok((items, total, page, per_page))
    }

    /// Personalised message to complete and cash-pending registrations.
    /// Registrations already sent under the same key are skipped.
    pub async fn bulk(
        conn: &mut PgConnection,
        providers: &Providers,
        ctx: &RequestContext,
        app_base_url: &str,
        event_id: Uuid,
        req: &BulkNotificationRequest,
    ) -> Result<BulkNotificationResult, AppError> {
        let event = EventsService::find(conn, event_id)?;
        let template = match req.template_id {
            Some(id) => Some(
                MessageTemplateRepo::find_by_id(conn, id)?
                    .ok_or_else(|| AppError::not_found("Template"))?,
            ),
            None => None,
        };
        let custom_message = req
            .custom_message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let (body_source, subject_source) = match (&template, custom_message) {
            (Some(t), _) => (t.body.clone(), t.subject.clone()),
            (None, Some(msg)) => (msg.to_string(), req.subject.clone()),
            (None, None) => {
                return Err(AppError::validation(
                    "Either template_id or custom_message is required",
                ));
            }
        };

        let idempotency_key = req
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| {
                bulk_idempotency_key(event_id, req.channel, req.template_id, custom_message)
            });
        let template_id = bulk_template_id(&idempotency_key);
        let sent_by = Some(ctx.user_id).filter(|id| !id.is_nil());

        let rows = RegistrationRepo::list_with_attendees_by_statuses(
            conn,
            event_id,
            &RegistrationStatus::ATTENDING,
        )?;

        let mut result = BulkNotificationResult {
            idempotency_key: idempotency_key.clone(),
            ..Default::default()
        };
        for (registration, attendee) in rows {
            if NotificationLogRepo::was_sent(conn, registration.id, &template_id)? {
                result.skipped_count += 1;
                continue;
            }

            let vars = attendee_variables(&registration, &attendee, &event, app_base_url);
            let body = render_template(&body_source, &vars);
            let subject = subject_source
                .as_deref()
                .map(|s| render_template(s, &vars))
                .unwrap_or_else(|| format!("Message from {}", event.name));

            let phone = attendee
                .phone
                .as_deref()
                .filter(|_| req.channel.includes_sms());
            let email = req
                .channel
                .includes_email()
                .then(|| emails::plain_text(&attendee.email, &subject, &body));

            // 短信和邮件并发发送，结果再依次落库
            let (sms_outcome, email_outcome) = futures::join!(
                async {
                    match phone {
                        Some(phone) => Some(providers.try_sms(phone, &body).await),
                        None => None,
                    }
                },
                async {
                    match &email {
                        Some(message) => Some(providers.try_email(message).await),
                        None => None,
                    }
                },
            );

            let mut delivered = false;
            if let (Some(phone), Some((sent, sid))) = (phone, sms_outcome) {
                Self::record_sms(
                    conn,
                    registration.id,
                    phone,
                    &body,
                    &template_id,
                    sent_by,
                    sent,
                    sid,
                )?;
                delivered |= sent;
            }
            if let Some(sent) = email_outcome {
                Self::log_delivery(
                    conn,
                    registration.id,
                    NotificationChannel::Email,
                    &template_id,
                    &body,
                    sent,
                )?;
                delivered |= sent;
            }

            if delivered {
                result.sent_count += 1;
            } else {
                result.failed_count += 1;
            }
        }

        tracing::info!(
            event_id = %event_id,
            channel = %req.channel,
            sent = result.sent_count,
            failed = result.failed_count,
            skipped = result.skipped_count,
            "bulk notification finished"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{PricingModel, RegistrationSource};
    use crate::services::pricing::tests::event;
    use chrono::{TimeZone, Utc};

    fn attendee() -> Attendee {
        let now = Utc::now();
        Attendee {
            id: Uuid::new_v4(),
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            phone: None,
            is_member: false,
            membership_id: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_bulk_key_is_stable_and_short() {
        let event_id = Uuid::nil();
        let a = bulk_idempotency_key(event_id, TemplateChannel::Sms, None, Some("See you soon"));
        let b = bulk_idempotency_key(event_id, TemplateChannel::Sms, None, Some("See you soon"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));

        let expected = hex::encode(Sha256::digest(
            format!("{}:sms::See you soon", event_id).as_bytes(),
        ));
        assert_eq!(a, &expected[..32]);

        let other = bulk_idempotency_key(event_id, TemplateChannel::Email, None, Some("See you soon"));
        assert_ne!(a, other);
        assert_eq!(bulk_template_id(&a), format!("bulk:{}", a));
    }

    #[test]
    fn test_attendee_variables() {
        let mut ev = event(PricingModel::Free);
        ev.event_date = Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap();
        let att = attendee();
        let now = Utc::now();
        let reg = Registration {
            id: Uuid::new_v4(),
            attendee_id: att.id,
            event_id: ev.id,
            status: RegistrationStatus::Complete,
            payment_method: None,
            payment_amount_cents: None,
            stripe_checkout_session_id: None,
            stripe_payment_intent_id: None,
            group_id: None,
            accommodation_type: None,
            dietary_restrictions: None,
            intake_data: None,
            waiver_accepted_at: None,
            estimated_arrival: None,
            checked_in_at: None,
            checked_in_by: None,
            source: RegistrationSource::RegistrationForm,
            notes: None,
            member_discount_applied: false,
            created_at: now,
            updated_at: now,
        };

        let vars = attendee_variables(&reg, &att, &ev, "https://retreat.example.org/");
        assert_eq!(vars["first_name"], "Jane");
        assert_eq!(vars["event_name"], "Forest Retreat");
        assert_eq!(vars["event_date"], "March 15, 2026");
        assert_eq!(vars["event_time"], "02:00 PM");
        assert_eq!(vars["meeting_point"], DEFAULT_MEETING_POINT);
        assert_eq!(vars["phone"], "");
        assert_eq!(
            vars["cancel_url"],
            format!(
                "https://retreat.example.org/register/forest-retreat/cancel?reg={}",
                reg.id
            )
        );
    }
}
