use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::scholarship_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScholarshipLink {
    pub id: Uuid,
    pub event_id: Uuid,
    pub attendee_id: Option<Uuid>,
    pub code: String,
    pub scholarship_price_cents: i32,
    pub stripe_coupon_id: Option<String>,
    pub max_uses: i32,
    pub uses: i32,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ScholarshipLink {
    pub fn remaining_uses(&self) -> i32 {
        (self.max_uses - self.uses).max(0)
    }
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::scholarship_links)]
pub struct NewScholarshipLink {
    pub event_id: Uuid,
    pub attendee_id: Option<Uuid>,
    pub code: String,
    pub scholarship_price_cents: i32,
    pub stripe_coupon_id: Option<String>,
    pub max_uses: i32,
    pub created_by: Option<Uuid>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ScholarshipValidation {
    pub valid: bool,
    pub event_id: Option<Uuid>,
    pub scholarship_price_cents: Option<i32>,
    pub remaining_uses: i32,
}

fn default_scholarship_price() -> i32 {
    3000
}

fn default_max_uses() -> i32 {
    1
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ScholarshipListQuery {
    pub event_id: Option<Uuid>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateScholarshipRequest {
    pub event_id: Uuid,
    pub attendee_id: Option<Uuid>,
    #[validate(length(min = 3, max = 50, message = "Code must be between 3 and 50 characters"))]
    pub code: Option<String>,
    #[serde(default = "default_scholarship_price")]
    #[validate(range(min = 0, message = "Scholarship price cannot be negative"))]
    pub scholarship_price_cents: i32,
    pub stripe_coupon_id: Option<String>,
    #[serde(default = "default_max_uses")]
    #[validate(range(min = 1, message = "max_uses must be at least 1"))]
    pub max_uses: i32,
}
