use crate::db::enums::{EventStatus, PricingModel, SubEventPricingModel};
use chrono::{DateTime, NaiveTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Event models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub pricing_model: PricingModel,
    pub fixed_price_cents: Option<i32>,
    pub min_donation_cents: Option<i32>,
    pub stripe_price_id: Option<String>,
    pub capacity: Option<i32>,
    pub meeting_point_a: Option<String>,
    pub meeting_point_b: Option<String>,
    pub location_text: Option<String>,
    pub zoom_link: Option<String>,
    pub virtual_meeting_url: Option<String>,
    pub allow_cash_payment: bool,
    pub max_member_discount_slots: i32,
    pub day_of_sms_time: Option<NaiveTime>,
    pub registration_fields: Option<serde_json::Value>,
    pub notification_templates: Option<serde_json::Value>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub status: EventStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    pub fn is_composite(&self) -> bool {
        self.pricing_model == PricingModel::Composite
    }

    /// Custom day-of SMS body configured under `notification_templates.day_of_sms`.
    pub fn day_of_sms_template(&self) -> Option<&str> {
        self.notification_templates
            .as_ref()
            .and_then(|t| t.get("day_of_sms"))
            .and_then(|v| v.as_str())
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::events)]
pub struct NewEvent {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub pricing_model: PricingModel,
    pub fixed_price_cents: Option<i32>,
    pub min_donation_cents: Option<i32>,
    pub stripe_price_id: Option<String>,
    pub capacity: Option<i32>,
    pub meeting_point_a: Option<String>,
    pub meeting_point_b: Option<String>,
    pub location_text: Option<String>,
    pub zoom_link: Option<String>,
    pub virtual_meeting_url: Option<String>,
    pub allow_cash_payment: bool,
    pub max_member_discount_slots: i32,
    pub day_of_sms_time: Option<NaiveTime>,
    pub registration_fields: Option<serde_json::Value>,
    pub notification_templates: Option<serde_json::Value>,
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub status: EventStatus,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::events)]
pub struct EventChangeset {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<Option<String>>,
    pub event_date: Option<DateTime<Utc>>,
    pub event_end_date: Option<Option<DateTime<Utc>>>,
    pub event_type: Option<String>,
    pub pricing_model: Option<PricingModel>,
    pub fixed_price_cents: Option<Option<i32>>,
    pub min_donation_cents: Option<Option<i32>>,
    pub stripe_price_id: Option<Option<String>>,
    pub capacity: Option<Option<i32>>,
    pub meeting_point_a: Option<Option<String>>,
    pub meeting_point_b: Option<Option<String>>,
    pub location_text: Option<Option<String>>,
    pub zoom_link: Option<Option<String>>,
    pub virtual_meeting_url: Option<Option<String>>,
    pub allow_cash_payment: Option<bool>,
    pub max_member_discount_slots: Option<i32>,
    pub day_of_sms_time: Option<Option<NaiveTime>>,
    pub registration_fields: Option<Option<serde_json::Value>>,
    pub notification_templates: Option<Option<serde_json::Value>>,
    pub is_recurring: Option<bool>,
    pub recurrence_rule: Option<Option<String>>,
    pub status: Option<EventStatus>,
    pub updated_at: Option<DateTime<Utc>>,
}

// SubEvent models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::sub_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubEvent {
    pub id: Uuid,
    pub parent_event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pricing_model: SubEventPricingModel,
    pub fixed_price_cents: Option<i32>,
    pub min_donation_cents: Option<i32>,
    pub stripe_price_id: Option<String>,
    pub capacity: Option<i32>,
    pub sort_order: i32,
    pub is_required: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::sub_events)]
pub struct NewSubEvent {
    pub parent_event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub pricing_model: SubEventPricingModel,
    pub fixed_price_cents: Option<i32>,
    pub min_donation_cents: Option<i32>,
    pub stripe_price_id: Option<String>,
    pub capacity: Option<i32>,
    pub sort_order: i32,
    pub is_required: bool,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::sub_events)]
pub struct SubEventChangeset {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub pricing_model: Option<SubEventPricingModel>,
    pub fixed_price_cents: Option<Option<i32>>,
    pub min_donation_cents: Option<Option<i32>>,
    pub stripe_price_id: Option<Option<String>>,
    pub capacity: Option<Option<i32>>,
    pub sort_order: Option<i32>,
    pub is_required: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registration counts and revenue for one event.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct EventStats {
    pub pending_payment: i64,
    pub cash_pending: i64,
    pub complete: i64,
    pub expired: i64,
    pub cancelled: i64,
    pub refunded: i64,
    pub total_registrations: i64,
    pub total_revenue_cents: i64,
    pub spots_remaining: Option<i64>,
    pub accommodation_breakdown: std::collections::BTreeMap<String, i64>,
}

#[derive(Serialize, Debug, Clone)]
pub struct EventWithStats {
    #[serde(flatten)]
    pub event: Event,
    pub stats: EventStats,
}

// Event DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    pub slug: String,

    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,

    #[validate(length(min = 1, max = 50, message = "Event type must be between 1 and 50 characters"))]
    pub event_type: String,

    pub pricing_model: PricingModel,

    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub fixed_price_cents: Option<i32>,

    #[validate(range(min = 0, message = "Minimum donation cannot be negative"))]
    pub min_donation_cents: Option<i32>,

    pub stripe_price_id: Option<String>,

    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,

    pub meeting_point_a: Option<String>,
    pub meeting_point_b: Option<String>,
    pub location_text: Option<String>,
    pub zoom_link: Option<String>,
    pub virtual_meeting_url: Option<String>,
    #[serde(default)]
    pub allow_cash_payment: bool,

    #[serde(default = "default_member_discount_slots")]
    #[validate(range(min = 0, message = "Member discount slots cannot be negative"))]
    pub max_member_discount_slots: i32,

    /// "HH:MM" or "HH:MM:SS".
    pub day_of_sms_time: Option<String>,
    pub registration_fields: Option<serde_json::Value>,
    pub notification_templates: Option<serde_json::Value>,
    #[serde(default)]
    pub is_recurring: bool,
    pub recurrence_rule: Option<String>,
    pub status: Option<EventStatus>,
}

fn default_member_discount_slots() -> i32 {
    3
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 100, message = "Slug must be between 1 and 100 characters"))]
    pub slug: Option<String>,

    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub event_end_date: Option<Option<DateTime<Utc>>>,
    pub event_type: Option<String>,
    pub pricing_model: Option<PricingModel>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub fixed_price_cents: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub min_donation_cents: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub meeting_point_a: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub meeting_point_b: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub location_text: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub virtual_meeting_url: Option<Option<String>>,
    pub allow_cash_payment: Option<bool>,
    pub max_member_discount_slots: Option<i32>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub day_of_sms_time: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub registration_fields: Option<Option<serde_json::Value>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub notification_templates: Option<Option<serde_json::Value>>,
    pub is_recurring: Option<bool>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<Option<String>>,
    pub status: Option<EventStatus>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct EventListQuery {
    pub status: Option<EventStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

// SubEvent DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateSubEventRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_sub_event_pricing")]
    pub pricing_model: SubEventPricingModel,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub fixed_price_cents: Option<i32>,
    #[validate(range(min = 0, message = "Minimum donation cannot be negative"))]
    pub min_donation_cents: Option<i32>,
    pub stripe_price_id: Option<String>,
    #[validate(range(min = 0, message = "Capacity cannot be negative"))]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default)]
    pub is_required: bool,
}

fn default_sub_event_pricing() -> SubEventPricingModel {
    SubEventPricingModel::Fixed
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateSubEventRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    pub pricing_model: Option<SubEventPricingModel>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub fixed_price_cents: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub min_donation_cents: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<Option<i32>>,
    pub sort_order: Option<i32>,
    pub is_required: Option<bool>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecurringDate {
    pub date: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct RecurringDates {
    pub event_name: String,
    pub recurrence_rule: String,
    pub dates: Vec<RecurringDate>,
}

/// Public view of an event on the registration page.
#[derive(Serialize, Debug, Clone)]
pub struct PublicEventInfo {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub pricing_model: PricingModel,
    pub fixed_price_cents: Option<i32>,
    pub min_donation_cents: Option<i32>,
    pub capacity: Option<i32>,
    pub spots_remaining: Option<i64>,
    pub location_text: Option<String>,
    pub allow_cash_payment: bool,
    pub registration_fields: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_events: Vec<SubEvent>,
}

#[derive(Serialize, Debug, Clone)]
pub struct RegistrationInfo {
    pub event: PublicEventInfo,
}
