use crate::db::enums::{AccommodationType, PaymentMethod, RegistrationSource, RegistrationStatus};
use crate::db::models::attendee::Attendee;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Registration models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Registration {
    pub id: Uuid,
    pub attendee_id: Uuid,
    pub event_id: Uuid,
    pub status: RegistrationStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_amount_cents: Option<i32>,
    pub stripe_checkout_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub group_id: Option<Uuid>,
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<String>,
    pub intake_data: Option<serde_json::Value>,
    pub waiver_accepted_at: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<String>,
    pub source: RegistrationSource,
    pub notes: Option<String>,
    pub member_discount_applied: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::registrations)]
pub struct NewRegistration {
    pub attendee_id: Uuid,
    pub event_id: Uuid,
    pub status: RegistrationStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_amount_cents: Option<i32>,
    pub group_id: Option<Uuid>,
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<String>,
    pub intake_data: Option<serde_json::Value>,
    pub waiver_accepted_at: Option<DateTime<Utc>>,
    pub source: RegistrationSource,
    pub notes: Option<String>,
    pub member_discount_applied: bool,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::registrations)]
pub struct RegistrationChangeset {
    pub status: Option<RegistrationStatus>,
    pub payment_method: Option<Option<PaymentMethod>>,
    pub payment_amount_cents: Option<Option<i32>>,
    pub stripe_checkout_session_id: Option<Option<String>>,
    pub stripe_payment_intent_id: Option<Option<String>>,
    pub accommodation_type: Option<Option<AccommodationType>>,
    pub dietary_restrictions: Option<Option<String>>,
    pub estimated_arrival: Option<Option<DateTime<Utc>>>,
    pub checked_in_at: Option<Option<DateTime<Utc>>>,
    pub checked_in_by: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full overwrite of a lapsed row; `None` clears the column.
#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::registrations)]
#[diesel(treat_none_as_null = true)]
pub struct RevivedRegistration {
    pub status: RegistrationStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_amount_cents: Option<i32>,
    pub stripe_checkout_session_id: Option<String>,
    pub stripe_payment_intent_id: Option<String>,
    pub group_id: Option<Uuid>,
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<String>,
    pub intake_data: Option<serde_json::Value>,
    pub waiver_accepted_at: Option<DateTime<Utc>>,
    pub estimated_arrival: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub checked_in_by: Option<String>,
    pub source: RegistrationSource,
    pub notes: Option<String>,
    pub member_discount_applied: bool,
    pub updated_at: DateTime<Utc>,
}

impl RevivedRegistration {
    pub fn from_new(fresh: &NewRegistration, now: DateTime<Utc>) -> Self {
        Self {
            status: fresh.status,
            payment_method: fresh.payment_method,
            payment_amount_cents: fresh.payment_amount_cents,
            stripe_checkout_session_id: None,
            stripe_payment_intent_id: None,
            group_id: fresh.group_id,
            accommodation_type: fresh.accommodation_type,
            dietary_restrictions: fresh.dietary_restrictions.clone(),
            intake_data: fresh.intake_data.clone(),
            waiver_accepted_at: fresh.waiver_accepted_at,
            estimated_arrival: None,
            checked_in_at: None,
            checked_in_by: None,
            source: fresh.source,
            notes: fresh.notes.clone(),
            member_discount_applied: fresh.member_discount_applied,
            updated_at: now,
        }
    }
}

// RegistrationSubEvent models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::registration_sub_events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RegistrationSubEvent {
    pub id: Uuid,
    pub registration_id: Uuid,
    pub sub_event_id: Uuid,
    pub payment_amount_cents: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::registration_sub_events)]
pub struct NewRegistrationSubEvent {
    pub registration_id: Uuid,
    pub sub_event_id: Uuid,
    pub payment_amount_cents: Option<i32>,
}

/// Registration row joined with its attendee, as returned by admin listings.
#[derive(Serialize, Debug, Clone)]
pub struct RegistrationWithAttendee {
    #[serde(flatten)]
    pub registration: Registration,
    pub attendee: Attendee,
}

// Public registration DTOs
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub phone: Option<String>,
    /// Checked against `AccommodationType` by the service so the error is specific.
    pub accommodation_type: Option<String>,
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub waiver_accepted: bool,
    pub intake_data: Option<serde_json::Value>,
    pub donation_amount_cents: Option<i32>,
    pub payment_method: Option<PaymentMethod>,
    pub scholarship_code: Option<String>,
    #[serde(default)]
    pub sub_event_ids: Vec<Uuid>,
}

/// One person in a group registration.
#[derive(Deserialize, Validate, Debug, Clone)]
pub struct GroupMember {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub phone: Option<String>,
    pub accommodation_type: Option<String>,
    pub dietary_restrictions: Option<String>,
    #[serde(default)]
    pub waiver_accepted: bool,
    pub intake_data: Option<serde_json::Value>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct GroupRegisterRequest {
    #[validate(nested)]
    pub payer: GroupMember,

    #[validate(nested)]
    #[serde(default)]
    pub guests: Vec<GroupMember>,

    pub payment_method: Option<PaymentMethod>,
    pub scholarship_code: Option<String>,
    pub donation_amount_cents: Option<i32>,
    #[serde(default)]
    pub sub_event_ids: Vec<Uuid>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RegistrationCreated {
    pub registration_id: Uuid,
    pub checkout_url: Option<String>,
    pub status: RegistrationStatus,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct GroupMemberRegistration {
    pub registration_id: Uuid,
    pub email: String,
    pub status: RegistrationStatus,
}

#[derive(Serialize, Debug, Clone)]
pub struct GroupRegistrationCreated {
    pub group_id: Uuid,
    pub registrations: Vec<GroupMemberRegistration>,
    pub checkout_url: Option<String>,
    pub status: RegistrationStatus,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct CancelRequest {
    pub registration_id: Uuid,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, max = 2000, message = "Reason must be between 1 and 2000 characters"))]
    pub reason: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SuccessQuery {
    pub session_id: Option<String>,
}

// Admin DTOs
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RegistrationListQuery {
    pub status: Option<RegistrationStatus>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateRegistrationRequest {
    pub status: Option<RegistrationStatus>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub accommodation_type: Option<Option<AccommodationType>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Option<String>>,
    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[validate(range(min = 0, message = "Payment amount cannot be negative"))]
    pub payment_amount_cents: Option<i32>,
    pub payment_method: Option<PaymentMethod>,
}

#[derive(Deserialize, Validate, Debug, Clone)]
pub struct ManualRegistrationRequest {
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub phone: Option<String>,
    pub status: Option<RegistrationStatus>,
    pub payment_method: Option<PaymentMethod>,
    #[validate(range(min = 0, message = "Payment amount cannot be negative"))]
    pub payment_amount_cents: Option<i32>,
    pub accommodation_type: Option<AccommodationType>,
    pub dietary_restrictions: Option<String>,
    pub notes: Option<String>,
    pub source: Option<RegistrationSource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revived_row_drops_previous_attendance() {
        let fresh = NewRegistration {
            attendee_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            status: RegistrationStatus::PendingPayment,
            payment_method: Some(PaymentMethod::Stripe),
            payment_amount_cents: Some(12_500),
            group_id: None,
            accommodation_type: None,
            dietary_restrictions: Some("vegan".to_string()),
            intake_data: None,
            waiver_accepted_at: Some(Utc::now()),
            source: RegistrationSource::RegistrationForm,
            notes: None,
            member_discount_applied: false,
        };
        let revived = RevivedRegistration::from_new(&fresh, Utc::now());

        assert_eq!(revived.status, RegistrationStatus::PendingPayment);
        assert_eq!(revived.payment_amount_cents, Some(12_500));
        assert_eq!(revived.dietary_restrictions.as_deref(), Some("vegan"));
        assert!(revived.checked_in_at.is_none());
        assert!(revived.checked_in_by.is_none());
        assert!(revived.estimated_arrival.is_none());
        assert!(revived.notes.is_none());
        assert!(revived.stripe_checkout_session_id.is_none());
        assert!(revived.stripe_payment_intent_id.is_none());
    }
}
