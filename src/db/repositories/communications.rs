use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{NotificationChannel, NotificationStatus, TemplateCategory};
use crate::db::models::communication::{
    MessageTemplate, MessageTemplateChangeset, NewMessageTemplate, NewNotificationLog,
    NewSmsConversation, NewWebhookRaw, NotificationLog, SmsConversation, WebhookRaw,
};

pub struct MessageTemplateRepo;

impl MessageTemplateRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<Option<MessageTemplate>, diesel::result::Error> {
        use crate::schema::message_templates::dsl::*;
        message_templates
            .filter(id.eq(template_id))
            .select(MessageTemplate::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        category_val: Option<TemplateCategory>,
    ) -> Result<Vec<MessageTemplate>, diesel::result::Error> {
        use crate::schema::message_templates::dsl::*;
        let mut query = message_templates.into_boxed();
        if let Some(c) = category_val {
            query = query.filter(category.eq(c));
        }
        query
            .order((category.asc(), name.asc()))
            .select(MessageTemplate::as_select())
            .load(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_template: &NewMessageTemplate,
    ) -> Result<MessageTemplate, diesel::result::Error> {
        diesel::insert_into(crate::schema::message_templates::table)
            .values(new_template)
            .returning(MessageTemplate::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        template_id: Uuid,
        changes: &MessageTemplateChangeset,
    ) -> Result<MessageTemplate, diesel::result::Error> {
        use crate::schema::message_templates::dsl::*;
        diesel::update(message_templates.filter(id.eq(template_id)))
            .set(changes)
            .returning(MessageTemplate::as_returning())
            .get_result(conn)
    }

    pub fn delete_by_id(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::message_templates::dsl::*;
        diesel::delete(message_templates.filter(id.eq(template_id))).execute(conn)
    }
}

pub struct SmsConversationRepo;

impl SmsConversationRepo {
    pub fn exists_by_sid(
        conn: &mut PgConnection,
        sid: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::sms_conversations::dsl::*;
        diesel::select(diesel::dsl::exists(sms_conversations.filter(twilio_sid.eq(sid))))
            .get_result(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_message: &NewSmsConversation,
    ) -> Result<SmsConversation, diesel::result::Error> {
        diesel::insert_into(crate::schema::sms_conversations::table)
            .values(new_message)
            .returning(SmsConversation::as_returning())
            .get_result(conn)
    }

    pub fn thread(
        conn: &mut PgConnection,
        phone: &str,
    ) -> Result<Vec<SmsConversation>, diesel::result::Error> {
        use crate::schema::sms_conversations::dsl::*;
        sms_conversations
            .filter(attendee_phone.eq(phone))
            .order(created_at.asc())
            .select(SmsConversation::as_select())
            .load(conn)
    }

    /// Per phone: message count and time of the newest message, newest first.
    pub fn phone_summaries(
        conn: &mut PgConnection,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<(String, i64, Option<DateTime<Utc>>)>, diesel::result::Error> {
        use crate::schema::sms_conversations::dsl::*;
        sms_conversations
            .group_by(attendee_phone)
            .select((
                attendee_phone,
                diesel::dsl::count(id),
                diesel::dsl::max(created_at),
            ))
            .order(diesel::dsl::max(created_at).desc())
            .offset(offset)
            .limit(limit)
            .load(conn)
    }

    pub fn count_phones(conn: &mut PgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::sms_conversations::dsl::*;
        sms_conversations
            .select(diesel::dsl::count_distinct(attendee_phone))
            .first(conn)
    }

    pub fn latest_for_phone(
        conn: &mut PgConnection,
        phone: &str,
    ) -> Result<Option<SmsConversation>, diesel::result::Error> {
        use crate::schema::sms_conversations::dsl::*;
        sms_conversations
            .filter(attendee_phone.eq(phone))
            .order(created_at.desc())
            .select(SmsConversation::as_select())
            .first(conn)
            .optional()
    }
}

/// Filters accepted by the notification log listing.
#[derive(Debug, Default, Clone)]
pub struct NotificationLogFilter {
    pub event_id: Option<Uuid>,
    pub channel: Option<NotificationChannel>,
    pub status: Option<NotificationStatus>,
}

pub struct NotificationLogRepo;

impl NotificationLogRepo {
    pub fn insert(
        conn: &mut PgConnection,
        entry: &NewNotificationLog,
    ) -> Result<NotificationLog, diesel::result::Error> {
        diesel::insert_into(crate::schema::notifications_log::table)
            .values(entry)
            .returning(NotificationLog::as_returning())
            .get_result(conn)
    }

    /// Whether a successful send with this template id is already recorded.
    pub fn was_sent(
        conn: &mut PgConnection,
        registration_id_val: Uuid,
        template: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::notifications_log::dsl::*;
        diesel::select(diesel::dsl::exists(
            notifications_log
                .filter(registration_id.eq(registration_id_val))
                .filter(template_id.eq(template))
                .filter(status.eq(NotificationStatus::Sent)),
        ))
        .get_result(conn)
    }

    pub fn list(
        conn: &mut PgConnection,
        filter: &NotificationLogFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<NotificationLog>, i64), diesel::result::Error> {
        use crate::schema::{notifications_log as nl, registrations as r};

        let build = || {
            let mut query = nl::table.inner_join(r::table).into_boxed();
            if let Some(eid) = filter.event_id {
                query = query.filter(r::event_id.eq(eid));
            }
            if let Some(c) = filter.channel {
                query = query.filter(nl::channel.eq(c));
            }
            if let Some(s) = filter.status {
                query = query.filter(nl::status.eq(s));
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(nl::sent_at.desc())
            .offset(offset)
            .limit(limit)
            .select(NotificationLog::as_select())
            .load(conn)?;
        Ok((items, total))
    }
}

pub struct WebhookRepo;

impl WebhookRepo {
    pub fn find_by_stripe_event_id(
        conn: &mut PgConnection,
        event_id_val: &str,
    ) -> Result<Option<WebhookRaw>, diesel::result::Error> {
        use crate::schema::webhooks_raw::dsl::*;
        webhooks_raw
            .filter(stripe_event_id.eq(event_id_val))
            .select(WebhookRaw::as_select())
            .first(conn)
            .optional()
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_webhook: &NewWebhookRaw,
    ) -> Result<WebhookRaw, diesel::result::Error> {
        diesel::insert_into(crate::schema::webhooks_raw::table)
            .values(new_webhook)
            .returning(WebhookRaw::as_returning())
            .get_result(conn)
    }

    pub fn mark_processed(
        conn: &mut PgConnection,
        webhook_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::webhooks_raw::dsl::*;
        diesel::update(webhooks_raw.filter(id.eq(webhook_id)))
            .set(processed_at.eq(Some(Utc::now())))
            .execute(conn)
    }
}
