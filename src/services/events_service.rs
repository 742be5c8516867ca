use std::collections::BTreeMap;

use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{AccommodationType, EventStatus, RegistrationStatus},
    db::models::api::error_codes,
    db::models::event::{
        CreateEventRequest, Event, EventChangeset, EventListQuery, EventStats, EventWithStats,
        NewEvent, UpdateEventRequest,
    },
    db::repositories::events::{EventFilter, EventRepo},
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    validation::event::{
        is_empty_update, parse_sms_time, validate_event_dates, validate_event_pricing,
        validate_recurrence, validate_slug,
    },
};

pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 100;

/// Folds per-status counts into event stats. Spots are held by complete,
/// pending-payment and cash-pending registrations.
pub fn build_stats(
    capacity: Option<i32>,
    counts: &[(RegistrationStatus, i64)],
    revenue_cents: i64,
    accommodation: &[(Option<AccommodationType>, i64)],
) -> EventStats {
    let mut stats = EventStats {
        total_revenue_cents: revenue_cents,
        ..Default::default()
    };
    for (status, n) in counts {
        stats.total_registrations += n;
        match status {
            RegistrationStatus::PendingPayment => stats.pending_payment += n,
            RegistrationStatus::CashPending => stats.cash_pending += n,
            RegistrationStatus::Complete => stats.complete += n,
            RegistrationStatus::Expired => stats.expired += n,
            RegistrationStatus::Cancelled => stats.cancelled += n,
            RegistrationStatus::Refunded => stats.refunded += n,
        }
    }
    let held = stats.complete + stats.pending_payment + stats.cash_pending;
    stats.spots_remaining = capacity.map(|c| (i64::from(c) - held).max(0));
    stats.accommodation_breakdown = accommodation
        .iter()
        .filter_map(|(kind, n)| kind.map(|k| (k.as_str().to_string(), *n)))
        .collect::<BTreeMap<_, _>>();
    stats
}

/// Keeps only the keys of `before` that the update touched, for the audit trail.
fn touched_fields(before: &Value, update: &Value) -> Value {
    match (before, update) {
        (Value::Object(old), Value::Object(changed)) => Value::Object(
            changed
                .keys()
                .filter_map(|k| old.get(k).map(|v| (k.clone(), v.clone())))
                .collect(),
        ),
        _ => Value::Null,
    }
}

pub struct EventsService;

impl EventsService {
    pub fn stats(conn: &mut PgConnection, event: &Event) -> Result<EventStats, AppError> {
        let counts = RegistrationRepo::count_by_status(conn, event.id)?;
        let (revenue, _) = RegistrationRepo::revenue_for_event(conn, event.id)?;
        let accommodation = RegistrationRepo::accommodation_breakdown(
            conn,
            event.id,
            &[RegistrationStatus::Complete],
        )?;
        Ok(build_stats(event.capacity, &counts, revenue, &accommodation))
    }

    pub fn list(
        conn: &mut PgConnection,
        query: &EventListQuery,
    ) -> Result<(Vec<EventWithStats>, i64, i64, i64), AppError> {
        let params = crate::db::models::api::PageParams {
            page: query.page,
            per_page: query.per_page,
        };
        let (page, per_page, offset) = params.resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let filter = EventFilter {
            status: query.status,
            date_from: query.date_from,
            date_to: query.date_to,
        };

        let (events, total) = EventRepo::list(conn, &filter, offset, per_page)?;
        let mut items = Vec::with_capacity(events.len());
        for event in events {
            let stats = Self::stats(conn, &event)?;
            items.push(EventWithStats { event, stats });
        }
        Ok((items, total, page, per_page))
    }

    pub fn get(conn: &mut PgConnection, event_id: Uuid) -> Result<EventWithStats, AppError> {
        let event = Self::find(conn, event_id)?;
        let stats = Self::stats(conn, &event)?;
        Ok(EventWithStats { event, stats })
    }

    pub fn find(conn: &mut PgConnection, event_id: Uuid) -> Result<Event, AppError> {
        EventRepo::find_by_id(conn, event_id)?.ok_or_else(|| AppError::not_found("Event"))
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateEventRequest,
    ) -> Result<Event, AppError> {
        validate_slug(&req.slug)?;
        validate_event_dates(req.event_date, req.event_end_date)?;
        validate_event_pricing(
            req.pricing_model,
            req.fixed_price_cents,
            req.stripe_price_id.as_deref(),
        )?;
        validate_recurrence(req.recurrence_rule.as_deref())?;
        let day_of_sms_time = req.day_of_sms_time.as_deref().map(parse_sms_time).transpose()?;

        if EventRepo::exists_by_slug(conn, &req.slug)? {
            return Err(AppError::conflict_with_code(
                format!("Event with slug '{}' already exists", req.slug),
                Some("slug".to_string()),
                error_codes::EVENT_SLUG_EXISTS,
            ));
        }

        let new_event = NewEvent {
            name: req.name.trim().to_string(),
            slug: req.slug.clone(),
            description: req.description.clone(),
            event_date: req.event_date,
            event_end_date: req.event_end_date,
            event_type: req.event_type.clone(),
            pricing_model: req.pricing_model,
            fixed_price_cents: req.fixed_price_cents,
            min_donation_cents: req.min_donation_cents,
            stripe_price_id: req.stripe_price_id.clone(),
            capacity: req.capacity,
            meeting_point_a: req.meeting_point_a.clone(),
            meeting_point_b: req.meeting_point_b.clone(),
            location_text: req.location_text.clone(),
            zoom_link: req.zoom_link.clone(),
            virtual_meeting_url: req.virtual_meeting_url.clone(),
            allow_cash_payment: req.allow_cash_payment,
            max_member_discount_slots: req.max_member_discount_slots,
            day_of_sms_time,
            registration_fields: req.registration_fields.clone(),
            notification_templates: req.notification_templates.clone(),
            is_recurring: req.is_recurring,
            recurrence_rule: req.recurrence_rule.clone(),
            status: req.status.unwrap_or(EventStatus::Draft),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let event = EventRepo::insert(conn, &new_event)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "event",
                event.id,
                "created",
                None,
                Some(req),
            )?;
            tracing::info!(event_id = %event.id, slug = %event.slug, "event created");
            Ok(event)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        req: &UpdateEventRequest,
    ) -> Result<EventWithStats, AppError> {
        let existing = Self::find(conn, event_id)?;
        if is_empty_update(req) {
            return Err(AppError::bad_request("No fields to update"));
        }

        if let Some(slug) = req.slug.as_deref() {
            validate_slug(slug)?;
            if slug != existing.slug && EventRepo::exists_by_slug_excluding_id(conn, slug, event_id)? {
                return Err(AppError::conflict_with_code(
                    format!("Event with slug '{}' already exists", slug),
                    Some("slug".to_string()),
                    error_codes::EVENT_SLUG_EXISTS,
                ));
            }
        }

        // Validate against the row as it will look after the update.
        let model = req.pricing_model.unwrap_or(existing.pricing_model);
        let fixed = req.fixed_price_cents.unwrap_or(existing.fixed_price_cents);
        let stripe_price = match &req.stripe_price_id {
            Some(v) => v.clone(),
            None => existing.stripe_price_id.clone(),
        };
        validate_event_pricing(model, fixed, stripe_price.as_deref())?;
        validate_event_dates(
            req.event_date.unwrap_or(existing.event_date),
            req.event_end_date.unwrap_or(existing.event_end_date),
        )?;
        if let Some(rule) = &req.recurrence_rule {
            validate_recurrence(rule.as_deref())?;
        }
        let day_of_sms_time = match &req.day_of_sms_time {
            Some(Some(raw)) => Some(Some(parse_sms_time(raw)?)),
            Some(None) => Some(None),
            None => None,
        };

        let changes = EventChangeset {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            slug: req.slug.clone(),
            description: req.description.clone(),
            event_date: req.event_date,
            event_end_date: req.event_end_date,
            event_type: req.event_type.clone(),
            pricing_model: req.pricing_model,
            fixed_price_cents: req.fixed_price_cents,
            min_donation_cents: req.min_donation_cents,
            stripe_price_id: req.stripe_price_id.clone(),
            capacity: req.capacity,
            meeting_point_a: req.meeting_point_a.clone(),
            meeting_point_b: req.meeting_point_b.clone(),
            location_text: req.location_text.clone(),
            zoom_link: req.zoom_link.clone(),
            virtual_meeting_url: req.virtual_meeting_url.clone(),
            allow_cash_payment: req.allow_cash_payment,
            max_member_discount_slots: req.max_member_discount_slots,
            day_of_sms_time,
            registration_fields: req.registration_fields.clone(),
            notification_templates: req.notification_templates.clone(),
            is_recurring: req.is_recurring,
            recurrence_rule: req.recurrence_rule.clone(),
            status: req.status,
            updated_at: Some(Utc::now()),
        };

        let new_value = serde_json::to_value(req)
            .map_err(|e| AppError::internal(format!("failed to encode update: {}", e)))?;
        let old_value = serde_json::to_value(&existing)
            .map(|before| touched_fields(&before, &new_value))
            .map_err(|e| AppError::internal(format!("failed to encode event: {}", e)))?;

        let event = conn.transaction::<_, AppError, _>(|conn| {
            let event = EventRepo::update(conn, event_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "event",
                event_id,
                "updated",
                Some(&old_value),
                Some(&new_value),
            )?;
            Ok(event)
        })?;

        let stats = Self::stats(conn, &event)?;
        Ok(EventWithStats { event, stats })
    }

    /// Soft delete: the event is cancelled, never removed.
    pub fn cancel(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
    ) -> Result<Value, AppError> {
        let existing = Self::find(conn, event_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            EventRepo::update(
                conn,
                event_id,
                &EventChangeset {
                    status: Some(EventStatus::Cancelled),
                    updated_at: Some(Utc::now()),
                    ..Default::default()
                },
            )?;
            AuditService::record_change(
                conn,
                ctx,
                "event",
                event_id,
                "soft_deleted",
                Some(&json!({ "status": existing.status })),
                Some(&json!({ "status": EventStatus::Cancelled })),
            )?;
            Ok(())
        })?;
        tracing::info!(event_id = %event_id, "event cancelled");
        Ok(json!({ "detail": "Event cancelled", "id": event_id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_spots_count_all_holders() {
        let counts = vec![
            (RegistrationStatus::Complete, 5),
            (RegistrationStatus::PendingPayment, 2),
            (RegistrationStatus::CashPending, 1),
            (RegistrationStatus::Cancelled, 4),
            (RegistrationStatus::Expired, 3),
        ];
        let stats = build_stats(Some(10), &counts, 25_000, &[]);
        assert_eq!(stats.total_registrations, 15);
        assert_eq!(stats.spots_remaining, Some(2));
        assert_eq!(stats.total_revenue_cents, 25_000);
        assert_eq!(stats.cancelled, 4);
    }

    #[test]
    fn test_stats_never_negative_and_unbounded() {
        let counts = vec![(RegistrationStatus::Complete, 12)];
        assert_eq!(build_stats(Some(10), &counts, 0, &[]).spots_remaining, Some(0));
        assert_eq!(build_stats(None, &counts, 0, &[]).spots_remaining, None);
    }

    #[test]
    fn test_stats_accommodation_skips_unset() {
        let acc = vec![
            (Some(AccommodationType::BellTent), 3),
            (Some(AccommodationType::DayOnly), 1),
            (None, 7),
        ];
        let stats = build_stats(None, &[], 0, &acc);
        assert_eq!(stats.accommodation_breakdown.len(), 2);
        assert_eq!(stats.accommodation_breakdown.get("bell_tent"), Some(&3));
    }

    #[test]
    fn test_touched_fields_keeps_only_updated_keys() {
        let before = json!({ "name": "Old", "capacity": 10, "slug": "old" });
        let update = json!({ "capacity": 20 });
        assert_eq!(touched_fields(&before, &update), json!({ "capacity": 10 }));
    }
}
