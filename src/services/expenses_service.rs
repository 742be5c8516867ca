use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::ActorType,
    db::models::api::PageParams,
    db::models::auth::Principal,
    db::models::expense::{
        CreateExpenseRequest, CreateOperatingExpenseRequest, Expense, ExpenseChangeset,
        ExpenseList, ExpenseListQuery, NewExpense, NewOperatingExpense, OperatingExpense,
        OperatingExpenseChangeset, OperatingExpenseList, OperatingExpenseListQuery,
        UpdateExpenseRequest, UpdateOperatingExpenseRequest,
    },
    db::models::co_creator::EventCoCreator,
    db::repositories::co_creators::EventCoCreatorRepo,
    db::repositories::expenses::{ExpenseRepo, OperatingExpenseRepo},
    error::AppError,
    providers::ReceiptStorage,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

/// Staff always pass; a co-creator needs an assignment with `can_upload_expenses`.
pub fn ensure_expense_access(
    principal: &Principal,
    assignment: Option<&EventCoCreator>,
) -> Result<(), AppError> {
    match principal {
        Principal::Staff { .. } => Ok(()),
        Principal::CoCreator { .. } => match assignment {
            Some(link) if link.can_upload_expenses => Ok(()),
            Some(_) => Err(AppError::forbidden(
                "You do not have permission to manage expenses for this event",
            )),
            None => Err(AppError::forbidden("You are not assigned to this event")),
        },
    }
}

/// Only the submitter or an admin may edit or delete an expense.
pub fn ensure_can_modify(principal: &Principal, expense: &Expense) -> Result<(), AppError> {
    if principal.is_admin() || expense.submitted_by == principal.id() {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "Only the submitter or an admin can modify this expense",
        ))
    }
}

fn actor_type(principal: &Principal) -> ActorType {
    match principal {
        Principal::Staff { .. } => ActorType::Admin,
        Principal::CoCreator { .. } => ActorType::CoCreator,
    }
}

fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

pub struct ExpensesService;

impl ExpensesService {
    fn authorize(
        conn: &mut PgConnection,
        principal: &Principal,
        event_id: Uuid,
    ) -> Result<(), AppError> {
        EventsService::find(conn, event_id)?;
        let assignment = match principal {
            Principal::CoCreator { id, .. } => EventCoCreatorRepo::find(conn, event_id, *id)?,
            Principal::Staff { .. } => None,
        };
        ensure_expense_access(principal, assignment.as_ref())
    }

    fn find(conn: &mut PgConnection, event_id: Uuid, expense_id: Uuid) -> Result<Expense, AppError> {
        ExpenseRepo::find_in_event(conn, event_id, expense_id)?
            .ok_or_else(|| AppError::not_found("Expense"))
    }

    pub fn list(
        conn: &mut PgConnection,
        principal: &Principal,
        event_id: Uuid,
        query: &ExpenseListQuery,
    ) -> Result<(ExpenseList, i64, i64), AppError> {
        Self::authorize(conn, principal, event_id)?;
        Self::list_unchecked(conn, event_id, query)
    }

    /// Listing for callers whose access was checked elsewhere.
    pub(crate) fn list_unchecked(
        conn: &mut PgConnection,
        event_id: Uuid,
        query: &ExpenseListQuery,
    ) -> Result<(ExpenseList, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let (items, total_count, total_amount_cents) =
            ExpenseRepo::list_by_event(conn, event_id, offset, per_page)?;
        Ok((
            ExpenseList {
                items,
                total_count,
                total_amount_cents,
            },
            page,
            per_page,
        ))
    }

    pub fn create(
        conn: &mut PgConnection,
        principal: &Principal,
        event_id: Uuid,
        req: &CreateExpenseRequest,
    ) -> Result<Expense, AppError> {
        Self::authorize(conn, principal, event_id)?;
        let ctx = RequestContext::from(principal);
        let new_expense = NewExpense {
            event_id,
            submitted_by: principal.id(),
            actor_type: actor_type(principal),
            description: req.description.trim().to_string(),
            amount_cents: req.amount_cents,
            category: req.category,
            receipt_image_url: None,
            notes: clean_notes(req.notes.as_deref()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = ExpenseRepo::insert(conn, &new_expense)?;
            AuditService::record_change::<Value, _>(
                conn,
                &ctx,
                "expense",
                expense.id,
                "created",
                None,
                Some(&expense),
            )?;
            Ok(expense)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        principal: &Principal,
        event_id: Uuid,
        expense_id: Uuid,
        req: &UpdateExpenseRequest,
    ) -> Result<Expense, AppError> {
        Self::authorize(conn, principal, event_id)?;
        let before = Self::find(conn, event_id, expense_id)?;
        ensure_can_modify(principal, &before)?;
        if req.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }

        let ctx = RequestContext::from(principal);
        let changes = ExpenseChangeset {
            description: req.description.as_ref().map(|d| d.trim().to_string()),
            amount_cents: req.amount_cents,
            category: req.category,
            notes: req.notes.as_ref().map(|n| clean_notes(n.as_deref())),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = ExpenseRepo::update(conn, expense_id, &changes)?;
            AuditService::record_change(
                conn,
                &ctx,
                "expense",
                expense_id,
                "updated",
                Some(&before),
                Some(&expense),
            )?;
            Ok(expense)
        })
    }

    /// Soft delete; the row stays for settlements already calculated.
    pub fn delete(
        conn: &mut PgConnection,
        principal: &Principal,
        event_id: Uuid,
        expense_id: Uuid,
    ) -> Result<(), AppError> {
        Self::authorize(conn, principal, event_id)?;
        let before = Self::find(conn, event_id, expense_id)?;
        ensure_can_modify(principal, &before)?;

        let ctx = RequestContext::from(principal);
        conn.transaction::<_, AppError, _>(|conn| {
            ExpenseRepo::update(
                conn,
                expense_id,
                &ExpenseChangeset {
                    is_deleted: Some(true),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )?;
            AuditService::record_change::<_, Value>(
                conn,
                &ctx,
                "expense",
                expense_id,
                "deleted",
                Some(&before),
                None,
            )?;
            Ok(())
        })
    }

    pub async fn attach_receipt(
        conn: &mut PgConnection,
        storage: &ReceiptStorage,
        principal: &Principal,
        event_id: Uuid,
        expense_id: Uuid,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Expense, AppError> {
        Self::authorize(conn, principal, event_id)?;
        let before = Self::find(conn, event_id, expense_id)?;
        ensure_can_modify(principal, &before)?;

        let url = storage.save(content_type, bytes).await?;
        let ctx = RequestContext::from(principal);
        conn.transaction::<_, AppError, _>(|conn| {
            let expense = ExpenseRepo::update(
                conn,
                expense_id,
                &ExpenseChangeset {
                    receipt_image_url: Some(Some(url.clone())),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )?;
            AuditService::record_change(
                conn,
                &ctx,
                "expense",
                expense_id,
                "receipt_uploaded",
                Some(&json!({ "receipt_image_url": before.receipt_image_url })),
                Some(&json!({ "receipt_image_url": url })),
            )?;
            Ok(expense)
        })
    }
}

pub struct OperatingExpensesService;

impl OperatingExpensesService {
    fn find(conn: &mut PgConnection, expense_id: Uuid) -> Result<OperatingExpense, AppError> {
        OperatingExpenseRepo::find_by_id(conn, expense_id)?
            .ok_or_else(|| AppError::not_found("Operating expense"))
    }

    pub fn list(
        conn: &mut PgConnection,
        query: &OperatingExpenseListQuery,
    ) -> Result<(OperatingExpenseList, i64, i64), AppError> {
        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(AppError::validation("start_date must not be after end_date"));
            }
        }
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let filters = query.filters();
        let (items, total_count, total_amount_cents) =
            OperatingExpenseRepo::list(conn, &filters, offset, per_page)?;
        Ok((
            OperatingExpenseList {
                items,
                total_count,
                total_amount_cents,
                filters_applied: filters,
            },
            page,
            per_page,
        ))
    }

    pub fn get(conn: &mut PgConnection, expense_id: Uuid) -> Result<OperatingExpense, AppError> {
        Self::find(conn, expense_id)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateOperatingExpenseRequest,
    ) -> Result<OperatingExpense, AppError> {
        let new_expense = NewOperatingExpense {
            submitted_by: ctx.user_id,
            description: req.description.trim().to_string(),
            amount_cents: req.amount_cents,
            category: req.category,
            receipt_image_url: None,
            notes: clean_notes(req.notes.as_deref()),
            expense_date: req.expense_date.unwrap_or_else(|| Utc::now().date_naive()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = OperatingExpenseRepo::insert(conn, &new_expense)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "operating_expense",
                expense.id,
                "created",
                None,
                Some(&expense),
            )?;
            Ok(expense)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        expense_id: Uuid,
        req: &UpdateOperatingExpenseRequest,
    ) -> Result<OperatingExpense, AppError> {
        let before = Self::find(conn, expense_id)?;
        if req.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        let changes = OperatingExpenseChangeset {
            description: req.description.as_ref().map(|d| d.trim().to_string()),
            amount_cents: req.amount_cents,
            category: req.category,
            notes: req.notes.as_ref().map(|n| clean_notes(n.as_deref())),
            expense_date: req.expense_date,
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = OperatingExpenseRepo::update(conn, expense_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "operating_expense",
                expense_id,
                "updated",
                Some(&before),
                Some(&expense),
            )?;
            Ok(expense)
        })
    }

    pub fn reimburse(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<OperatingExpense, AppError> {
        let before = Self::find(conn, expense_id)?;
        if before.reimbursed {
            return Err(AppError::bad_request("Expense is already reimbursed"));
        }
        let now = Utc::now();

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = OperatingExpenseRepo::update(
                conn,
                expense_id,
                &OperatingExpenseChangeset {
                    reimbursed: Some(true),
                    reimbursed_at: Some(Some(now)),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            AuditService::record_change(
                conn,
                ctx,
                "operating_expense",
                expense_id,
                "reimbursed",
                Some(&json!({ "reimbursed": false })),
                Some(&json!({ "reimbursed": true, "reimbursed_at": now })),
            )?;
            Ok(expense)
        })
    }

    pub async fn attach_receipt(
        conn: &mut PgConnection,
        storage: &ReceiptStorage,
        ctx: &RequestContext,
        expense_id: Uuid,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<OperatingExpense, AppError> {
        let before = Self::find(conn, expense_id)?;
        let url = storage.save(content_type, bytes).await?;

        conn.transaction::<_, AppError, _>(|conn| {
            let expense = OperatingExpenseRepo::update(
                conn,
                expense_id,
                &OperatingExpenseChangeset {
                    receipt_image_url: Some(Some(url.clone())),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )?;
            AuditService::record_change(
                conn,
                ctx,
                "operating_expense",
                expense_id,
                "receipt_uploaded",
                Some(&json!({ "receipt_image_url": before.receipt_image_url })),
                Some(&json!({ "receipt_image_url": url })),
            )?;
            Ok(expense)
        })
    }

    pub fn delete(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        expense_id: Uuid,
    ) -> Result<(), AppError> {
        let before = Self::find(conn, expense_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            OperatingExpenseRepo::delete_by_id(conn, expense_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "operating_expense",
                expense_id,
                "deleted",
                Some(&before),
                None,
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{ExpenseCategory, UserRole};
    use axum::http::StatusCode;

    fn staff(role: UserRole) -> Principal {
        Principal::Staff {
            id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            name: "Ops".into(),
            role,
        }
    }

    fn co_creator(id: Uuid) -> Principal {
        Principal::CoCreator {
            id,
            email: "cc@example.com".into(),
            name: "Co".into(),
            event_ids: vec![],
        }
    }

    fn assignment(can_upload_expenses: bool) -> EventCoCreator {
        EventCoCreator {
            event_id: Uuid::new_v4(),
            co_creator_id: Uuid::new_v4(),
            can_see_amounts: false,
            can_upload_expenses,
            split_percentage: None,
        }
    }

    fn expense(submitted_by: Uuid) -> Expense {
        let now = Utc::now();
        Expense {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            submitted_by,
            actor_type: ActorType::CoCreator,
            description: "Firewood".into(),
            amount_cents: 4500,
            category: ExpenseCategory::Supplies,
            receipt_image_url: None,
            notes: None,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_expense_access() {
        assert!(ensure_expense_access(&staff(UserRole::Operator), None).is_ok());

        let cc = co_creator(Uuid::new_v4());
        assert!(ensure_expense_access(&cc, Some(&assignment(true))).is_ok());
        assert_eq!(
            ensure_expense_access(&cc, Some(&assignment(false)))
                .unwrap_err()
                .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ensure_expense_access(&cc, None).unwrap_err().status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_only_submitter_or_admin_modifies() {
        let cc_id = Uuid::new_v4();
        let mine = expense(cc_id);
        assert!(ensure_can_modify(&co_creator(cc_id), &mine).is_ok());
        assert!(ensure_can_modify(&staff(UserRole::Admin), &mine).is_ok());
        assert!(ensure_can_modify(&staff(UserRole::Operator), &mine).is_err());
        assert!(ensure_can_modify(&co_creator(Uuid::new_v4()), &mine).is_err());
    }

    #[test]
    fn test_clean_notes() {
        assert_eq!(clean_notes(Some("  ")), None);
        assert_eq!(clean_notes(Some(" paid cash ")), Some("paid cash".into()));
        assert_eq!(clean_notes(None), None);
    }
}
