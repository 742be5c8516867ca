use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    db::enums::{AccommodationType, EventStatus, RegistrationStatus},
    db::models::dashboard::{
        DietarySummaryItem, EventDashboard, HeadcountByStatus, OverviewDashboard, RevenueStats,
        SubEventHeadcount, UpcomingEvent,
    },
    db::repositories::events::{EventRepo, SubEventRepo},
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    services::co_creators_service::registration_totals,
    services::events_service::EventsService,
};

const UPCOMING_LIMIT: i64 = 10;

pub fn headcount(counts: &[(RegistrationStatus, i64)]) -> HeadcountByStatus {
    let mut hc = HeadcountByStatus::default();
    for (status, n) in counts {
        hc.total += n;
        match status {
            RegistrationStatus::Complete => hc.complete += n,
            RegistrationStatus::PendingPayment => hc.pending_payment += n,
            RegistrationStatus::CashPending => hc.cash_pending += n,
            RegistrationStatus::Cancelled => hc.cancelled += n,
            RegistrationStatus::Refunded => hc.refunded += n,
            RegistrationStatus::Expired => hc.expired += n,
        }
    }
    hc
}

/// Every accommodation type appears, zero when nobody picked it.
pub fn accommodation_map(rows: &[(Option<AccommodationType>, i64)]) -> BTreeMap<String, i64> {
    let mut map: BTreeMap<String, i64> = AccommodationType::ALL
        .iter()
        .map(|kind| (kind.as_str().to_string(), 0))
        .collect();
    for (kind, n) in rows {
        if let Some(kind) = kind {
            *map.entry(kind.as_str().to_string()).or_default() += n;
        }
    }
    map
}

/// Splits comma separated restrictions, lowercases them and counts each.
/// Most common first, ties alphabetical.
pub fn dietary_summary(values: &[Option<String>]) -> Vec<DietarySummaryItem> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    for raw in values.iter().flatten() {
        for item in raw.split(',') {
            let item = item.trim().to_lowercase();
            if !item.is_empty() {
                *counts.entry(item).or_default() += 1;
            }
        }
    }
    let mut items: Vec<DietarySummaryItem> = counts
        .into_iter()
        .map(|(restriction, count)| DietarySummaryItem { restriction, count })
        .collect();
    items.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.restriction.cmp(&b.restriction)));
    items
}

pub fn revenue_stats(total_cents: i64, payment_count: i64) -> RevenueStats {
    RevenueStats {
        total_cents,
        average_cents: if payment_count > 0 {
            total_cents / payment_count
        } else {
            0
        },
        payment_count,
    }
}

pub struct DashboardService;

impl DashboardService {
    pub fn overview(conn: &mut PgConnection) -> Result<OverviewDashboard, AppError> {
        let active_events = EventRepo::count_by_status(conn, EventStatus::Active)?;
        let totals = headcount(&RegistrationRepo::count_by_status_for_event_status(
            conn,
            EventStatus::Active,
        )?);
        let total_revenue_cents =
            RegistrationRepo::revenue_for_event_status(conn, EventStatus::Active)?;

        let mut upcoming_events = Vec::new();
        for event in EventRepo::list_upcoming(conn, Utc::now(), UPCOMING_LIMIT)? {
            let (total, complete) =
                registration_totals(&RegistrationRepo::count_by_status(conn, event.id)?);
            upcoming_events.push(UpcomingEvent {
                id: event.id,
                name: event.name,
                event_date: event.event_date,
                event_type: event.event_type,
                status: event.status,
                total_registrations: total,
                complete_registrations: complete,
                capacity: event.capacity,
            });
        }

        Ok(OverviewDashboard {
            active_events,
            total_registrations: totals.total,
            total_complete: totals.complete,
            total_pending: totals.pending_payment,
            total_revenue_cents,
            upcoming_events,
        })
    }

    pub fn event(conn: &mut PgConnection, event_id: Uuid) -> Result<EventDashboard, AppError> {
        let event = EventsService::find(conn, event_id)?;
        let hc = headcount(&RegistrationRepo::count_by_status(conn, event.id)?);
        let accommodation = accommodation_map(&RegistrationRepo::accommodation_breakdown(
            conn,
            event.id,
            &RegistrationStatus::ATTENDING,
        )?);
        let dietary = dietary_summary(&RegistrationRepo::dietary_values(
            conn,
            event.id,
            &[RegistrationStatus::Complete],
        )?);
        let (revenue_total, paid) = RegistrationRepo::revenue_for_event(conn, event.id)?;

        let sub_event_headcounts = if event.is_composite() {
            let counts: HashMap<Uuid, i64> =
                SubEventRepo::headcounts(conn, event.id, &RegistrationStatus::ATTENDING)?
                    .into_iter()
                    .collect();
            Some(
                SubEventRepo::list_by_event(conn, event.id)?
                    .into_iter()
                    .map(|sub| SubEventHeadcount {
                        count: counts.get(&sub.id).copied().unwrap_or(0),
                        sub_event_id: sub.id,
                        sub_event_name: sub.name,
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(EventDashboard {
            event_id: event.id,
            event_name: event.name,
            spots_remaining: event.capacity.map(|c| (i64::from(c) - hc.complete).max(0)),
            capacity: event.capacity,
            headcount: hc,
            accommodation,
            dietary_summary: dietary,
            revenue: revenue_stats(revenue_total, paid),
            sub_event_headcounts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dietary_summary_splits_and_ranks() {
        let values = vec![
            Some("Vegan, gluten-free".to_string()),
            Some("vegan".to_string()),
            None,
            Some(" ".to_string()),
            Some("Nut allergy,VEGAN".to_string()),
            Some("gluten-free".to_string()),
        ];
        let summary = dietary_summary(&values);
        assert_eq!(
            summary,
            vec![
                DietarySummaryItem { restriction: "vegan".into(), count: 3 },
                DietarySummaryItem { restriction: "gluten-free".into(), count: 2 },
                DietarySummaryItem { restriction: "nut allergy".into(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_headcount_totals() {
        let hc = headcount(&[
            (RegistrationStatus::Complete, 5),
            (RegistrationStatus::CashPending, 2),
            (RegistrationStatus::Expired, 1),
        ]);
        assert_eq!(hc.total, 8);
        assert_eq!(hc.complete, 5);
        assert_eq!(hc.cash_pending, 2);
        assert_eq!(hc.pending_payment, 0);
    }

    #[test]
    fn test_accommodation_map_fills_missing_types() {
        let map = accommodation_map(&[
            (Some(AccommodationType::BellTent), 3),
            (None, 4),
        ]);
        assert_eq!(map.get("bell_tent"), Some(&3));
        assert_eq!(map.get("tipi_twin"), Some(&0));
        assert_eq!(map.len(), AccommodationType::ALL.len());
    }

    #[test]
    fn test_revenue_average() {
        assert_eq!(revenue_stats(10_000, 3).average_cents, 3_333);
        assert_eq!(revenue_stats(0, 0), RevenueStats::default());
    }
}
