use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::db::enums::EventStatus;

#[derive(Serialize, Debug, Clone)]
pub struct UpcomingEvent {
    pub id: Uuid,
    pub name: String,
    pub event_date: DateTime<Utc>,
    pub event_type: String,
    pub status: EventStatus,
    pub total_registrations: i64,
    pub complete_registrations: i64,
    pub capacity: Option<i32>,
}

#[derive(Serialize, Debug, Clone)]
pub struct OverviewDashboard {
    pub active_events: i64,
    pub total_registrations: i64,
    pub total_complete: i64,
    pub total_pending: i64,
    pub total_revenue_cents: i64,
    pub upcoming_events: Vec<UpcomingEvent>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct HeadcountByStatus {
    pub total: i64,
    pub complete: i64,
    pub pending_payment: i64,
    pub cash_pending: i64,
    pub cancelled: i64,
    pub refunded: i64,
    pub expired: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DietarySummaryItem {
    pub restriction: String,
    pub count: i64,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct RevenueStats {
    pub total_cents: i64,
    pub average_cents: i64,
    pub payment_count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct SubEventHeadcount {
    pub sub_event_id: Uuid,
    pub sub_event_name: String,
    pub count: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct EventDashboard {
    pub event_id: Uuid,
    pub event_name: String,
    pub headcount: HeadcountByStatus,
    /// Keyed by accommodation type; every type is present.
    pub accommodation: BTreeMap<String, i64>,
    pub dietary_summary: Vec<DietarySummaryItem>,
    pub revenue: RevenueStats,
    pub spots_remaining: Option<i64>,
    pub capacity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_event_headcounts: Option<Vec<SubEventHeadcount>>,
}
