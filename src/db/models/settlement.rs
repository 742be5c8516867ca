use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::event_settlements)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventSettlement {
    pub id: Uuid,
    pub event_id: Uuid,
    pub version: i32,
    pub gross_revenue_cents: i64,
    pub stripe_fees_cents: i64,
    pub total_expenses_cents: i64,
    pub net_cents: i64,
    pub split_config: serde_json::Value,
    pub fees_estimated: bool,
    pub calculated_at: DateTime<Utc>,
    pub calculated_by: Uuid,
    pub notes: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::event_settlements)]
pub struct NewEventSettlement {
    pub event_id: Uuid,
    pub version: i32,
    pub gross_revenue_cents: i64,
    pub stripe_fees_cents: i64,
    pub total_expenses_cents: i64,
    pub net_cents: i64,
    pub split_config: serde_json::Value,
    pub fees_estimated: bool,
    pub calculated_by: Uuid,
    pub notes: Option<String>,
}

/// One co-creator's share inside `split_config`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SplitEntry {
    pub co_creator_id: Uuid,
    pub name: Option<String>,
    pub percentage: f64,
    pub payout_cents: i64,
}

#[derive(Serialize, Debug)]
pub struct SettlementHistory {
    pub items: Vec<EventSettlement>,
    pub total_count: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SplitOverride {
    pub co_creator_id: Uuid,
    pub percentage: f64,
}

#[derive(Deserialize, Debug, Default)]
pub struct CalculateSettlementRequest {
    pub splits: Option<Vec<SplitOverride>>,
    pub notes: Option<String>,
}

/// Settlement as shown in the co-creator portal; amounts need `can_see_amounts`.
#[derive(Serialize, Debug, Clone)]
pub struct PortalSettlement {
    pub id: Uuid,
    pub event_id: Uuid,
    pub version: i32,
    pub fees_estimated: bool,
    pub calculated_at: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_revenue_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stripe_fees_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_expenses_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_cents: Option<i64>,
    pub split_config: Vec<SplitEntry>,
}

impl PortalSettlement {
    pub fn from_settlement(settlement: EventSettlement, can_see_amounts: bool) -> Self {
        let mut split_config: Vec<SplitEntry> =
            serde_json::from_value(settlement.split_config).unwrap_or_default();
        if !can_see_amounts {
            for entry in &mut split_config {
                entry.payout_cents = 0;
            }
        }
        let amount = |v: i64| can_see_amounts.then_some(v);
        Self {
            id: settlement.id,
            event_id: settlement.event_id,
            version: settlement.version,
            fees_estimated: settlement.fees_estimated,
            calculated_at: settlement.calculated_at,
            notes: settlement.notes,
            gross_revenue_cents: amount(settlement.gross_revenue_cents),
            stripe_fees_cents: amount(settlement.stripe_fees_cents),
            total_expenses_cents: amount(settlement.total_expenses_cents),
            net_cents: amount(settlement.net_cents),
            split_config,
        }
    }
}
