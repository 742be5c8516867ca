use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::db::models::registration::Registration;

// Attendee models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::attendees)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Attendee {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub is_member: bool,
    pub membership_id: Option<Uuid>,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Attendee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::attendees)]
pub struct NewAttendee {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::attendees)]
pub struct AttendeeChangeset {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<Option<String>>,
    pub is_member: Option<bool>,
    pub membership_id: Option<Option<Uuid>>,
    pub admin_notes: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One cleaned row from an attendee CSV import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedAttendee {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Serialize, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub total_parsed: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

// Membership models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::memberships)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Membership {
    pub id: Uuid,
    pub attendee_id: Uuid,
    pub tier: String,
    pub discount_type: String,
    pub discount_value_cents: i32,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::memberships)]
pub struct NewMembership {
    pub attendee_id: Uuid,
    pub tier: String,
    pub discount_type: String,
    pub discount_value_cents: i32,
    pub started_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::memberships)]
pub struct MembershipChangeset {
    pub tier: Option<String>,
    pub discount_type: Option<String>,
    pub discount_value_cents: Option<i32>,
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Debug, Clone)]
pub struct MembershipWithAttendee {
    #[serde(flatten)]
    pub membership: Membership,
    pub attendee_name: String,
    pub attendee_email: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AttendeeListQuery {
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize, Debug, Clone)]
pub struct AttendeeDetail {
    #[serde(flatten)]
    pub attendee: Attendee,
    pub registrations: Vec<Registration>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateAttendeeRequest {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<Option<String>>,
}

// Membership DTOs
fn default_tier() -> String {
    "standard".to_string()
}

fn default_discount_type() -> String {
    "flat".to_string()
}

fn default_discount_value() -> i32 {
    2500
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MembershipListQuery {
    #[serde(default)]
    pub active_only: bool,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateMembershipRequest {
    pub attendee_id: Uuid,
    #[serde(default = "default_tier")]
    #[validate(length(min = 1, max = 50, message = "Tier must be between 1 and 50 characters"))]
    pub tier: String,
    #[serde(default = "default_discount_type")]
    pub discount_type: String,
    #[serde(default = "default_discount_value")]
    #[validate(range(min = 0, message = "Discount cannot be negative"))]
    pub discount_value_cents: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateMembershipRequest {
    #[validate(length(min = 1, max = 50, message = "Tier must be between 1 and 50 characters"))]
    pub tier: Option<String>,
    pub discount_type: Option<String>,
    #[validate(range(min = 0, message = "Discount cannot be negative"))]
    pub discount_value_cents: Option<i32>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    pub is_active: Option<bool>,
}
