use std::collections::HashMap;

use diesel::prelude::*;

use crate::{
    db::enums::SmsDirection,
    db::models::api::PageParams,
    db::models::communication::{
        ConversationListQuery, ConversationSummary, ConversationThread, NewSmsConversation,
        SmsReplyResult,
    },
    db::repositories::attendees::AttendeeRepo,
    db::repositories::communications::SmsConversationRepo,
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    providers::Providers,
    services::context::RequestContext,
    utils::normalize_phone,
};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

/// Path segments may arrive URL-decoded with the `+` turned into a space.
pub fn phone_from_path(raw: &str) -> Option<String> {
    normalize_phone(raw.trim())
}

pub struct SmsConversationsService;

impl SmsConversationsService {
    pub fn list(
        conn: &mut PgConnection,
        query: &ConversationListQuery,
    ) -> Result<(Vec<ConversationSummary>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let total = SmsConversationRepo::count_phones(conn)?;
        let summaries = SmsConversationRepo::phone_summaries(conn, offset, per_page)?;

        // One lookup for all names on the page.
        let phones: Vec<String> = summaries.iter().map(|(p, _, _)| p.clone()).collect();
        let names: HashMap<String, String> = AttendeeRepo::find_by_phones(conn, &phones)?
            .into_iter()
            .filter_map(|a| a.phone.clone().map(|p| (p, a.full_name())))
            .collect();

        let mut items = Vec::with_capacity(summaries.len());
        for (phone, message_count, _) in summaries {
            let Some(last) = SmsConversationRepo::latest_for_phone(conn, &phone)? else {
                continue;
            };
            items.push(ConversationSummary {
                attendee_name: names.get(&phone).cloned(),
                attendee_phone: phone,
                last_message: last.body,
                last_direction: last.direction,
                last_message_at: last.created_at,
                message_count,
            });
        }
        Ok((items, total, page, per_page))
    }

    pub fn thread(conn: &mut PgConnection, raw_phone: &str) -> Result<ConversationThread, AppError> {
        let phone = phone_from_path(raw_phone).ok_or_else(|| AppError::not_found("Conversation"))?;
        let messages = SmsConversationRepo::thread(conn, &phone)?;
        let Some(last_message_at) = messages.last().map(|m| m.created_at) else {
            return Err(AppError::not_found("Conversation"));
        };
        let attendee_name = AttendeeRepo::find_by_phone(conn, &phone)?.map(|a| a.full_name());
        Ok(ConversationThread {
            attendee_phone: phone,
            attendee_name,
            messages,
            last_message_at,
        })
    }

    /// Sends a reply and stores it, linked to the attendee's latest registration.
    pub async fn reply(
        conn: &mut PgConnection,
        providers: &Providers,
        ctx: &RequestContext,
        raw_phone: &str,
        body: &str,
    ) -> Result<SmsReplyResult, AppError> {
        let phone = phone_from_path(raw_phone)
            .ok_or_else(|| AppError::validation("Invalid phone number"))?;
        let registration = match AttendeeRepo::find_by_phone(conn, &phone)? {
            Some(attendee) => RegistrationRepo::latest_for_attendee(conn, attendee.id)?,
            None => None,
        };

        let (success, sid) = providers.try_sms(&phone, body).await;
        if !success {
            tracing::warn!(phone = %phone, "sms reply not delivered");
        }

        let message = SmsConversationRepo::insert(
            conn,
            &NewSmsConversation {
                registration_id: registration.map(|r| r.id),
                attendee_phone: phone,
                direction: SmsDirection::Outbound,
                body: body.to_string(),
                twilio_sid: sid,
                sent_by: Some(ctx.user_id).filter(|id| !id.is_nil()),
            },
        )?;
        Ok(SmsReplyResult { success, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_from_path() {
        assert_eq!(phone_from_path("+15551234567").as_deref(), Some("+15551234567"));
        assert_eq!(phone_from_path(" 15551234567").as_deref(), Some("+15551234567"));
        assert_eq!(phone_from_path("5551234567").as_deref(), Some("+15551234567"));
        assert_eq!(phone_from_path(""), None);
    }
}
