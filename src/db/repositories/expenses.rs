use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::expense::{
    Expense, ExpenseChangeset, NewExpense, NewOperatingExpense, OperatingExpense,
    OperatingExpenseChangeset, OperatingExpenseFilters,
};

pub struct ExpenseRepo;

impl ExpenseRepo {
    pub fn find_in_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        expense_id: Uuid,
    ) -> Result<Option<Expense>, diesel::result::Error> {
        use crate::schema::expenses::dsl::*;
        expenses
            .filter(id.eq(expense_id))
            .filter(event_id.eq(event_id_val))
            .filter(is_deleted.eq(false))
            .select(Expense::as_select())
            .first(conn)
            .optional()
    }

    /// Live expenses of the event, newest first, with the grand total.
    pub fn list_by_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Expense>, i64, i64), diesel::result::Error> {
        use crate::schema::expenses::dsl::*;
        let base = || {
            expenses
                .filter(event_id.eq(event_id_val))
                .filter(is_deleted.eq(false))
        };

        let (count, sum): (i64, Option<i64>) = base()
            .select((diesel::dsl::count(id), diesel::dsl::sum(amount_cents)))
            .first(conn)?;
        let items = base()
            .order(created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(Expense::as_select())
            .load(conn)?;
        Ok((items, count, sum.unwrap_or(0)))
    }

    pub fn total_for_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::expenses::dsl::*;
        let sum: Option<i64> = expenses
            .filter(event_id.eq(event_id_val))
            .filter(is_deleted.eq(false))
            .select(diesel::dsl::sum(amount_cents))
            .first(conn)?;
        Ok(sum.unwrap_or(0))
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_expense: &NewExpense,
    ) -> Result<Expense, diesel::result::Error> {
        diesel::insert_into(crate::schema::expenses::table)
            .values(new_expense)
            .returning(Expense::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        expense_id: Uuid,
        changes: &ExpenseChangeset,
    ) -> Result<Expense, diesel::result::Error> {
        use crate::schema::expenses::dsl::*;
        diesel::update(expenses.filter(id.eq(expense_id)))
            .set(changes)
            .returning(Expense::as_returning())
            .get_result(conn)
    }
}

pub struct OperatingExpenseRepo;

impl OperatingExpenseRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        expense_id: Uuid,
    ) -> Result<Option<OperatingExpense>, diesel::result::Error> {
        use crate::schema::operating_expenses::dsl::*;
        operating_expenses
            .filter(id.eq(expense_id))
            .select(OperatingExpense::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        filters: &OperatingExpenseFilters,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<OperatingExpense>, i64, i64), diesel::result::Error> {
        use crate::schema::operating_expenses::dsl::*;

        let build = || {
            let mut query = operating_expenses.into_boxed();
            if let Some(c) = filters.category {
                query = query.filter(category.eq(c));
            }
            if let Some(start) = filters.start_date {
                query = query.filter(expense_date.ge(start));
            }
            if let Some(end) = filters.end_date {
                query = query.filter(expense_date.le(end));
            }
            if let Some(r) = filters.reimbursed {
                query = query.filter(reimbursed.eq(r));
            }
            query
        };

        let (count, sum): (i64, Option<i64>) = build()
            .select((diesel::dsl::count(id), diesel::dsl::sum(amount_cents)))
            .first(conn)?;
        let items = build()
            .order((expense_date.desc(), created_at.desc()))
            .offset(offset)
            .limit(limit)
            .select(OperatingExpense::as_select())
            .load(conn)?;
        Ok((items, count, sum.unwrap_or(0)))
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_expense: &NewOperatingExpense,
    ) -> Result<OperatingExpense, diesel::result::Error> {
        diesel::insert_into(crate::schema::operating_expenses::table)
            .values(new_expense)
            .returning(OperatingExpense::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        expense_id: Uuid,
        changes: &OperatingExpenseChangeset,
    ) -> Result<OperatingExpense, diesel::result::Error> {
        use crate::schema::operating_expenses::dsl::*;
        diesel::update(operating_expenses.filter(id.eq(expense_id)))
            .set(changes)
            .returning(OperatingExpense::as_returning())
            .get_result(conn)
    }

    pub fn delete_by_id(
        conn: &mut PgConnection,
        expense_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::operating_expenses::dsl::*;
        diesel::delete(operating_expenses.filter(id.eq(expense_id))).execute(conn)
    }
}
