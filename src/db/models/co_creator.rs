use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::enums::{AccommodationType, EventStatus, RegistrationStatus};

// CoCreator models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::co_creators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CoCreator {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub auth_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub token_expires_at: Option<DateTime<Utc>>,
    pub venmo_handle: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::co_creators)]
pub struct NewCoCreator {
    pub name: String,
    pub email: String,
    pub venmo_handle: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::event_co_creators)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventCoCreator {
    pub event_id: Uuid,
    pub co_creator_id: Uuid,
    pub can_see_amounts: bool,
    pub can_upload_expenses: bool,
    pub split_percentage: Option<f64>,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::event_co_creators)]
pub struct EventCoCreatorChangeset {
    pub can_see_amounts: Option<bool>,
    pub can_upload_expenses: Option<bool>,
    pub split_percentage: Option<Option<f64>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct EventBrief {
    pub event_id: Uuid,
    pub name: String,
    pub slug: String,
    pub event_date: DateTime<Utc>,
    pub can_see_amounts: bool,
    pub can_upload_expenses: bool,
    pub split_percentage: Option<f64>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CoCreatorWithEvents {
    #[serde(flatten)]
    pub co_creator: CoCreator,
    pub events: Vec<EventBrief>,
}

// CoCreator DTOs
#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateCoCreatorRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub venmo_handle: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct AssignEventRequest {
    pub event_id: Uuid,
    #[serde(default)]
    pub can_see_amounts: bool,
    #[serde(default = "default_can_upload_expenses")]
    pub can_upload_expenses: bool,
    #[validate(range(min = 0.0, max = 100.0, message = "split_percentage must be between 0 and 100"))]
    pub split_percentage: Option<f64>,
}

fn default_can_upload_expenses() -> bool {
    true
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateAssignmentRequest {
    pub can_see_amounts: Option<bool>,
    pub can_upload_expenses: Option<bool>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0, message = "split_percentage must be between 0 and 100"))]
    pub split_percentage: Option<Option<f64>>,
}

// Portal views
#[derive(Serialize, Debug, Clone)]
pub struct PortalEventSummary {
    pub id: Uuid,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub status: EventStatus,
    pub total_registrations: i64,
    pub complete_registrations: i64,
    pub capacity: Option<i32>,
    pub can_see_amounts: bool,
    pub can_upload_expenses: bool,
}

#[derive(Serialize, Debug, Clone)]
pub struct PortalAttendee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: RegistrationStatus,
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<String>,
    /// Only present with `can_see_amounts`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount_cents: Option<i32>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PortalEventDetail {
    pub id: Uuid,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub event_end_date: Option<DateTime<Utc>>,
    pub event_type: String,
    pub status: EventStatus,
    pub capacity: Option<i32>,
    pub meeting_point_a: Option<String>,
    pub meeting_point_b: Option<String>,
    pub location_text: Option<String>,
    pub can_see_amounts: bool,
    pub can_upload_expenses: bool,
}
