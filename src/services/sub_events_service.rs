use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::models::api::error_codes,
    db::models::event::{
        CreateSubEventRequest, Event, NewSubEvent, RecurringDate, RecurringDates, SubEvent,
        SubEventChangeset, UpdateSubEventRequest,
    },
    db::repositories::events::{EventRepo, SubEventRepo},
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
    services::recurrence::RecurrenceRule,
    validation::event::validate_sub_event_pricing,
};

pub const DEFAULT_RECURRING_COUNT: usize = 10;
pub const MAX_RECURRING_COUNT: usize = 52;

/// Next `count` occurrence dates of a recurring event, on or after `now`.
pub fn recurring_dates(
    event: &Event,
    count: Option<i64>,
    now: DateTime<Utc>,
) -> Result<RecurringDates, AppError> {
    let count = match count {
        None => DEFAULT_RECURRING_COUNT,
        Some(n) if (1..=MAX_RECURRING_COUNT as i64).contains(&n) => n as usize,
        Some(_) => {
            return Err(AppError::validation(format!(
                "count must be between 1 and {}",
                MAX_RECURRING_COUNT
            )));
        }
    };

    let rule_text = match event.recurrence_rule.as_deref() {
        Some(rule) if event.is_recurring && !rule.trim().is_empty() => rule,
        _ => return Err(AppError::validation("This event is not recurring")),
    };
    let rule = RecurrenceRule::parse(rule_text)
        .map_err(|e| AppError::validation(format!("Invalid recurrence rule: {}", e)))?;

    let dates = rule
        .occurrences_after(event.event_date, now, count)
        .into_iter()
        .map(|dt| RecurringDate {
            date: dt.format("%Y-%m-%d").to_string(),
        })
        .collect();

    Ok(RecurringDates {
        event_name: event.name.clone(),
        recurrence_rule: rule_text.to_string(),
        dates,
    })
}

fn require_composite(event: &Event) -> Result<(), AppError> {
    if !event.is_composite() {
        return Err(AppError::validation(
            "Sub-events can only be added to composite events",
        ));
    }
    Ok(())
}

pub struct SubEventsService;

impl SubEventsService {
    pub fn list(conn: &mut PgConnection, event_id: Uuid) -> Result<Vec<SubEvent>, AppError> {
        EventsService::find(conn, event_id)?;
        Ok(SubEventRepo::list_by_event(conn, event_id)?)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        req: &CreateSubEventRequest,
    ) -> Result<SubEvent, AppError> {
        let event = EventsService::find(conn, event_id)?;
        require_composite(&event)?;
        validate_sub_event_pricing(
            req.pricing_model,
            req.fixed_price_cents,
            req.stripe_price_id.as_deref(),
        )?;

        let new_sub_event = NewSubEvent {
            parent_event_id: event_id,
            name: req.name.trim().to_string(),
            description: req.description.clone(),
            pricing_model: req.pricing_model,
            fixed_price_cents: req.fixed_price_cents,
            min_donation_cents: req.min_donation_cents,
            stripe_price_id: req.stripe_price_id.clone(),
            capacity: req.capacity,
            sort_order: req.sort_order,
            is_required: req.is_required,
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let sub_event = SubEventRepo::insert(conn, &new_sub_event)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "sub_event",
                sub_event.id,
                "created",
                None,
                Some(req),
            )?;
            Ok(sub_event)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        sub_event_id: Uuid,
        req: &UpdateSubEventRequest,
    ) -> Result<SubEvent, AppError> {
        let event = EventsService::find(conn, event_id)?;
        require_composite(&event)?;
        let existing = SubEventRepo::find_in_event(conn, event_id, sub_event_id)?
            .ok_or_else(|| AppError::not_found("Sub-event"))?;

        let changes = SubEventChangeset {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            description: req.description.clone(),
            pricing_model: req.pricing_model,
            fixed_price_cents: req.fixed_price_cents,
            min_donation_cents: req.min_donation_cents,
            stripe_price_id: req.stripe_price_id.clone(),
            capacity: req.capacity,
            sort_order: req.sort_order,
            is_required: req.is_required,
            updated_at: None,
        };
        let touched = changes.name.is_some()
            || changes.description.is_some()
            || changes.pricing_model.is_some()
            || changes.fixed_price_cents.is_some()
            || changes.min_donation_cents.is_some()
            || changes.stripe_price_id.is_some()
            || changes.capacity.is_some()
            || changes.sort_order.is_some()
            || changes.is_required.is_some();
        if !touched {
            return Err(AppError::bad_request("No fields to update"));
        }

        let stripe_price = match &req.stripe_price_id {
            Some(v) => v.clone(),
            None => existing.stripe_price_id.clone(),
        };
        validate_sub_event_pricing(
            req.pricing_model.unwrap_or(existing.pricing_model),
            req.fixed_price_cents.unwrap_or(existing.fixed_price_cents),
            stripe_price.as_deref(),
        )?;

        let changes = SubEventChangeset {
            updated_at: Some(Utc::now()),
            ..changes
        };
        conn.transaction::<_, AppError, _>(|conn| {
            let sub_event = SubEventRepo::update(conn, sub_event_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "sub_event",
                sub_event_id,
                "updated",
                Some(&existing),
                Some(req),
            )?;
            Ok(sub_event)
        })
    }

    pub fn delete(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        sub_event_id: Uuid,
    ) -> Result<Value, AppError> {
        let existing = SubEventRepo::find_in_event(conn, event_id, sub_event_id)?
            .ok_or_else(|| AppError::not_found("Sub-event"))?;

        if SubEventRepo::has_registrations(conn, sub_event_id)? {
            return Err(AppError::conflict_with_code(
                "Cannot delete sub-event with existing registrations",
                None,
                error_codes::SUB_EVENT_IN_USE,
            ));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            SubEventRepo::delete_by_id(conn, sub_event_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "sub_event",
                sub_event_id,
                "deleted",
                Some(&existing),
                None,
            )?;
            Ok(())
        })?;
        Ok(json!({ "detail": "Sub-event deleted", "id": sub_event_id }))
    }

    /// Public: upcoming dates of a recurring event looked up by slug.
    pub fn recurring_dates_by_slug(
        conn: &mut PgConnection,
        slug: &str,
        count: Option<i64>,
    ) -> Result<RecurringDates, AppError> {
        let event = EventRepo::find_by_slug(conn, slug)?
            .ok_or_else(|| AppError::not_found("Event"))?;
        recurring_dates(&event, count, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::PricingModel;
    use crate::services::pricing::tests::event;
    use chrono::TimeZone;

    fn recurring(rule: Option<&str>) -> Event {
        let mut e = event(PricingModel::Free);
        e.event_date = Utc.with_ymd_and_hms(2025, 1, 4, 18, 0, 0).unwrap();
        e.is_recurring = rule.is_some();
        e.recurrence_rule = rule.map(str::to_string);
        e
    }

    #[test]
    fn test_not_recurring() {
        let err = recurring_dates(&recurring(None), None, Utc::now()).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.to_string().contains("This event is not recurring"));
    }

    #[test]
    fn test_invalid_rule_and_count() {
        let e = recurring(Some("FREQ=YEARLY"));
        let err = recurring_dates(&e, None, Utc::now()).unwrap_err();
        assert!(err.to_string().contains("Invalid recurrence rule"));

        let e = recurring(Some("FREQ=WEEKLY"));
        assert!(recurring_dates(&e, Some(0), Utc::now()).is_err());
        assert!(recurring_dates(&e, Some(53), Utc::now()).is_err());
    }

    #[test]
    fn test_weekly_dates_from_now() {
        let e = recurring(Some("FREQ=WEEKLY;BYDAY=SA"));
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 12, 0, 0).unwrap();
        let out = recurring_dates(&e, Some(3), now).unwrap();
        let dates: Vec<&str> = out.dates.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-02-01", "2025-02-08", "2025-02-15"]);
        assert_eq!(out.recurrence_rule, "FREQ=WEEKLY;BYDAY=SA");
    }
}
