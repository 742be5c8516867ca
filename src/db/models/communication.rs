use crate::db::enums::{
    NotificationChannel, NotificationStatus, SmsDirection, TemplateCategory, TemplateChannel,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

// MessageTemplate models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::message_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: TemplateCategory,
    pub channel: TemplateChannel,
    pub subject: Option<String>,
    pub body: String,
    pub variables: serde_json::Value,
    pub is_default: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::message_templates)]
pub struct NewMessageTemplate {
    pub name: String,
    pub category: TemplateCategory,
    pub channel: TemplateChannel,
    pub subject: Option<String>,
    pub body: String,
    pub variables: serde_json::Value,
    pub is_default: bool,
    pub created_by: Option<Uuid>,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::message_templates)]
pub struct MessageTemplateChangeset {
    pub name: Option<String>,
    pub category: Option<TemplateCategory>,
    pub channel: Option<TemplateChannel>,
    pub subject: Option<Option<String>>,
    pub body: Option<String>,
    pub variables: Option<serde_json::Value>,
    pub is_default: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// SmsConversation models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::sms_conversations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SmsConversation {
    pub id: Uuid,
    pub registration_id: Option<Uuid>,
    pub attendee_phone: String,
    pub direction: SmsDirection,
    pub body: String,
    pub twilio_sid: Option<String>,
    pub sent_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sms_conversations)]
pub struct NewSmsConversation {
    pub registration_id: Option<Uuid>,
    pub attendee_phone: String,
    pub direction: SmsDirection,
    pub body: String,
    pub twilio_sid: Option<String>,
    pub sent_by: Option<Uuid>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ConversationSummary {
    pub attendee_phone: String,
    pub attendee_name: Option<String>,
    pub last_message: String,
    pub last_direction: SmsDirection,
    pub last_message_at: DateTime<Utc>,
    pub message_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct ConversationThread {
    pub attendee_phone: String,
    pub attendee_name: Option<String>,
    pub messages: Vec<SmsConversation>,
    pub last_message_at: DateTime<Utc>,
}

// NotificationLog models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::notifications_log)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationLog {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub channel: NotificationChannel,
    pub template_id: String,
    pub content_hash: String,
    pub sent_at: DateTime<Utc>,
    pub status: NotificationStatus,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::notifications_log)]
pub struct NewNotificationLog {
    pub registration_id: Uuid,
    pub channel: NotificationChannel,
    pub template_id: String,
    pub content_hash: String,
    pub status: NotificationStatus,
}

// WebhookRaw models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::webhooks_raw)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WebhookRaw {
    pub id: Uuid,
    pub stripe_event_id: String,
    pub event_type: String,
    pub payload_json: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::webhooks_raw)]
pub struct NewWebhookRaw {
    pub stripe_event_id: String,
    pub event_type: String,
    pub payload_json: serde_json::Value,
}

/// Envelope of a Stripe webhook event; only the fields we route on.
#[derive(Deserialize, Debug, Clone)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Deserialize, Debug, Clone)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Twilio inbound message webhook (form-encoded).
#[derive(Deserialize, Debug, Clone, Default)]
pub struct TwilioInbound {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

// Notification DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct SmsBlastRequest {
    #[validate(length(min = 1, max = 1600, message = "Message must be between 1 and 1600 characters"))]
    pub message: String,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SmsBlastResult {
    pub sent_count: i64,
    pub failed_count: i64,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct NotificationLogQuery {
    pub event_id: Option<Uuid>,
    pub channel: Option<NotificationChannel>,
    pub status: Option<NotificationStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct BulkNotificationRequest {
    pub channel: TemplateChannel,
    pub template_id: Option<Uuid>,
    #[validate(length(max = 1600, message = "Message cannot exceed 1600 characters"))]
    pub custom_message: Option<String>,
    #[validate(length(max = 255, message = "Subject cannot exceed 255 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, max = 64, message = "Idempotency key must be between 1 and 64 characters"))]
    pub idempotency_key: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct BulkNotificationResult {
    pub sent_count: i64,
    pub failed_count: i64,
    pub skipped_count: i64,
    pub idempotency_key: String,
}

// MessageTemplate DTOs
#[derive(Deserialize, Debug, Clone, Default)]
pub struct MessageTemplateListQuery {
    pub category: Option<TemplateCategory>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateMessageTemplateRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub category: TemplateCategory,
    pub channel: TemplateChannel,
    #[validate(length(max = 255, message = "Subject cannot exceed 255 characters"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "Body is required"))]
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateMessageTemplateRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub category: Option<TemplateCategory>,
    pub channel: Option<TemplateChannel>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub subject: Option<Option<String>>,
    #[validate(length(min = 1, message = "Body cannot be empty"))]
    pub body: Option<String>,
    pub variables: Option<Vec<String>>,
    pub is_default: Option<bool>,
}

impl UpdateMessageTemplateRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.channel.is_none()
            && self.subject.is_none()
            && self.body.is_none()
            && self.variables.is_none()
            && self.is_default.is_none()
    }
}

#[derive(Deserialize, Validate, Debug, Clone, Default)]
pub struct PreviewTemplateRequest {
    /// Overrides merged over the built-in sample values.
    #[serde(default, alias = "variables")]
    pub sample_data: HashMap<String, String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct TemplatePreview {
    pub rendered_subject: Option<String>,
    pub rendered_body: String,
}

// SMS conversation DTOs
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConversationListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct SmsReplyRequest {
    #[validate(length(min = 1, max = 1600, message = "Message must be between 1 and 1600 characters"))]
    pub body: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct SmsReplyResult {
    pub success: bool,
    pub message: SmsConversation,
}
