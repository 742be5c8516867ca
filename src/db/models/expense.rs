use crate::db::enums::{ActorType, ExpenseCategory, OperatingExpenseCategory};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// Expense models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Expense {
    pub id: Uuid,
    pub event_id: Uuid,
    pub submitted_by: Uuid,
    pub actor_type: ActorType,
    pub description: String,
    pub amount_cents: i32,
    pub category: ExpenseCategory,
    pub receipt_image_url: Option<String>,
    pub notes: Option<String>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::expenses)]
pub struct NewExpense {
    pub event_id: Uuid,
    pub submitted_by: Uuid,
    pub actor_type: ActorType,
    pub description: String,
    pub amount_cents: i32,
    pub category: ExpenseCategory,
    pub receipt_image_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::expenses)]
pub struct ExpenseChangeset {
    pub description: Option<String>,
    pub amount_cents: Option<i32>,
    pub category: Option<ExpenseCategory>,
    pub receipt_image_url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub is_deleted: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Debug)]
pub struct ExpenseList {
    pub items: Vec<Expense>,
    pub total_count: i64,
    pub total_amount_cents: i64,
}

// OperatingExpense models
#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::operating_expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OperatingExpense {
    pub id: Uuid,
    pub submitted_by: Uuid,
    pub description: String,
    pub amount_cents: i32,
    pub category: OperatingExpenseCategory,
    pub receipt_image_url: Option<String>,
    pub notes: Option<String>,
    pub expense_date: NaiveDate,
    pub reimbursed: bool,
    pub reimbursed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::operating_expenses)]
pub struct NewOperatingExpense {
    pub submitted_by: Uuid,
    pub description: String,
    pub amount_cents: i32,
    pub category: OperatingExpenseCategory,
    pub receipt_image_url: Option<String>,
    pub notes: Option<String>,
    pub expense_date: NaiveDate,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::operating_expenses)]
pub struct OperatingExpenseChangeset {
    pub description: Option<String>,
    pub amount_cents: Option<i32>,
    pub category: Option<OperatingExpenseCategory>,
    pub receipt_image_url: Option<Option<String>>,
    pub notes: Option<Option<String>>,
    pub expense_date: Option<NaiveDate>,
    pub reimbursed: Option<bool>,
    pub reimbursed_at: Option<Option<DateTime<Utc>>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OperatingExpenseFilters {
    pub category: Option<OperatingExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reimbursed: Option<bool>,
}

#[derive(Serialize, Debug)]
pub struct OperatingExpenseList {
    pub items: Vec<OperatingExpense>,
    pub total_count: i64,
    pub total_amount_cents: i64,
    pub filters_applied: OperatingExpenseFilters,
}

// Expense DTOs
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExpenseListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateExpenseRequest {
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount_cents: i32,

    pub category: ExpenseCategory,
    pub notes: Option<String>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateExpenseRequest {
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount_cents: Option<i32>,

    pub category: Option<ExpenseCategory>,

    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

impl UpdateExpenseRequest {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount_cents.is_none()
            && self.category.is_none()
            && self.notes.is_none()
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct OperatingExpenseListQuery {
    pub category: Option<OperatingExpenseCategory>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub reimbursed: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl OperatingExpenseListQuery {
    pub fn filters(&self) -> OperatingExpenseFilters {
        OperatingExpenseFilters {
            category: self.category,
            start_date: self.start_date,
            end_date: self.end_date,
            reimbursed: self.reimbursed,
        }
    }
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateOperatingExpenseRequest {
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: String,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount_cents: i32,

    pub category: OperatingExpenseCategory,
    pub notes: Option<String>,
    /// Defaults to today.
    pub expense_date: Option<NaiveDate>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateOperatingExpenseRequest {
    #[validate(length(min = 1, max = 500, message = "Description must be between 1 and 500 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, message = "Amount must be greater than zero"))]
    pub amount_cents: Option<i32>,

    pub category: Option<OperatingExpenseCategory>,

    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,

    pub expense_date: Option<NaiveDate>,
}

impl UpdateOperatingExpenseRequest {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount_cents.is_none()
            && self.category.is_none()
            && self.notes.is_none()
            && self.expense_date.is_none()
    }
}
