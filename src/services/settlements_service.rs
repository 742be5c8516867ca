use diesel::prelude::*;
use serde_json::json;
use uuid::Uuid;

use crate::{
    db::models::audit::NewAuditLog,
    db::models::co_creator::{CoCreator, EventCoCreator},
    db::models::settlement::{
        CalculateSettlementRequest, EventSettlement, NewEventSettlement, SettlementHistory,
        SplitEntry, SplitOverride,
    },
    db::repositories::audit::AuditRepo,
    db::repositories::co_creators::EventCoCreatorRepo,
    db::repositories::events::EventRepo,
    db::repositories::expenses::ExpenseRepo,
    db::repositories::registrations::RegistrationRepo,
    db::repositories::settlements::SettlementRepo,
    error::AppError,
    services::context::RequestContext,
};

/// Stripe's card rate: 2.9% plus 30 cents per charge.
pub const STRIPE_RATE_PER_MILLE: i64 = 29;
pub const STRIPE_FIXED_FEE_CENTS: i64 = 30;

const SPLIT_TOLERANCE: f64 = 0.01;

pub fn estimate_stripe_fees(gross_cents: i64, transactions: i64) -> i64 {
    gross_cents * STRIPE_RATE_PER_MILLE / 1000 + transactions * STRIPE_FIXED_FEE_CENTS
}

/// Payout for one share; nothing is paid out of a non-positive net.
pub fn payout_cents(net_cents: i64, percentage: f64) -> i64 {
    if net_cents <= 0 {
        return 0;
    }
    // Millionths of a percent; the integer division floors.
    let micro_percent = (percentage * 1_000_000.0).round() as i128;
    (i128::from(net_cents) * micro_percent / 100_000_000) as i64
}

/// Builds the split for each assigned co-creator, preferring request overrides
/// over stored percentages, and checks the total is 100%.
pub fn compute_splits(
    assigned: &[(EventCoCreator, CoCreator)],
    overrides: Option<&[SplitOverride]>,
    net_cents: i64,
) -> Result<Vec<SplitEntry>, AppError> {
    let mut total = 0.0;
    let mut splits = Vec::with_capacity(assigned.len());

    for (link, co_creator) in assigned {
        let percentage = overrides
            .and_then(|list| list.iter().find(|o| o.co_creator_id == link.co_creator_id))
            .map(|o| o.percentage)
            .or(link.split_percentage)
            .unwrap_or(0.0);
        total += percentage;
        splits.push(SplitEntry {
            co_creator_id: link.co_creator_id,
            name: Some(co_creator.name.clone()),
            percentage,
            payout_cents: payout_cents(net_cents, percentage),
        });
    }

    if (total - 100.0).abs() > SPLIT_TOLERANCE {
        return Err(AppError::bad_request(format!(
            "Split percentages must sum to exactly 100%. Current total: {}%",
            (total * 100.0).round() / 100.0
        )));
    }
    Ok(splits)
}

pub struct SettlementsService;

impl SettlementsService {
    pub fn latest(
        conn: &mut PgConnection,
        event_id: Uuid,
    ) -> Result<Option<EventSettlement>, AppError> {
        if EventRepo::find_by_id(conn, event_id)?.is_none() {
            return Err(AppError::not_found("Event"));
        }
        Ok(SettlementRepo::latest_for_event(conn, event_id)?)
    }

    pub fn history(conn: &mut PgConnection, event_id: Uuid) -> Result<SettlementHistory, AppError> {
        if EventRepo::find_by_id(conn, event_id)?.is_none() {
            return Err(AppError::not_found("Event"));
        }
        let items = SettlementRepo::history(conn, event_id)?;
        let total_count = items.len() as i64;
        Ok(SettlementHistory { items, total_count })
    }

    pub fn calculate(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        req: &CalculateSettlementRequest,
    ) -> Result<EventSettlement, AppError> {
        if !ctx.is_admin {
            return Err(AppError::forbidden("Admin access required"));
        }
        if EventRepo::find_by_id(conn, event_id)?.is_none() {
            return Err(AppError::not_found("Event"));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            let (gross, transactions) = RegistrationRepo::revenue_for_event(conn, event_id)?;
            let fees = estimate_stripe_fees(gross, transactions);
            let expenses = ExpenseRepo::total_for_event(conn, event_id)?;
            let net = gross - fees - expenses;

            let assigned = EventCoCreatorRepo::list_for_event(conn, event_id)?;
            let splits = compute_splits(&assigned, req.splits.as_deref(), net)?;
            let split_config = serde_json::to_value(&splits)
                .map_err(|e| AppError::internal(format!("failed to encode splits: {}", e)))?;

            let version = SettlementRepo::max_version(conn, event_id)? + 1;
            let settlement = SettlementRepo::insert(
                conn,
                &NewEventSettlement {
                    event_id,
                    version,
                    gross_revenue_cents: gross,
                    stripe_fees_cents: fees,
                    total_expenses_cents: expenses,
                    net_cents: net,
                    split_config,
                    fees_estimated: true,
                    calculated_by: ctx.user_id,
                    notes: req.notes.clone(),
                },
            )?;

            let audit = NewAuditLog::new("event_settlement", settlement.id, "calculate", &ctx.actor)
                .with_values(
                    None,
                    Some(json!({
                        "event_id": event_id,
                        "version": version,
                        "gross_revenue_cents": gross,
                        "stripe_fees_cents": fees,
                        "total_expenses_cents": expenses,
                        "net_cents": net,
                        "fees_estimated": true,
                        "co_creator_count": splits.len(),
                        "notes": req.notes,
                    })),
                );
            AuditRepo::insert(conn, &audit)?;

            tracing::info!(
                event_id = %event_id,
                version,
                net_cents = net,
                "settlement calculated"
            );
            Ok(settlement)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn assigned(pcts: &[Option<f64>]) -> Vec<(EventCoCreator, CoCreator)> {
        let event_id = Uuid::new_v4();
        pcts.iter()
            .enumerate()
            .map(|(i, pct)| {
                let id = Uuid::new_v4();
                (
                    EventCoCreator {
                        event_id,
                        co_creator_id: id,
                        can_see_amounts: true,
                        can_upload_expenses: true,
                        split_percentage: *pct,
                    },
                    CoCreator {
                        id,
                        name: format!("Partner {}", i + 1),
                        email: format!("p{}@example.com", i + 1),
                        auth_token_hash: None,
                        token_expires_at: None,
                        venmo_handle: None,
                        created_at: Utc::now(),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_fee_estimate() {
        // 2.9% of $100 is $2.90, plus 30 cents for each of 2 charges.
        assert_eq!(estimate_stripe_fees(10_000, 2), 350);
        assert_eq!(estimate_stripe_fees(0, 0), 0);
        // Fractional cents are dropped.
        assert_eq!(estimate_stripe_fees(1_234, 1), 35 + 30);
    }

    #[test]
    fn test_payout_floors_and_zero_for_loss() {
        assert_eq!(payout_cents(10_000, 33.33), 3_333);
        assert_eq!(payout_cents(999, 50.0), 499);
        assert_eq!(payout_cents(-500, 50.0), 0);
        assert_eq!(payout_cents(0, 100.0), 0);
    }

    #[test]
    fn test_payout_keeps_fractional_percentages() {
        assert_eq!(payout_cents(1_000_000, 33.333), 333_330);
        assert_eq!(payout_cents(1_000_000, 12.3456), 123_456);
        assert_eq!(payout_cents(999, 33.333), 332);
    }

    #[test]
    fn test_splits_use_stored_percentages() {
        let rows = assigned(&[Some(60.0), Some(40.0)]);
        let splits = compute_splits(&rows, None, 10_000).unwrap();
        assert_eq!(splits[0].payout_cents, 6_000);
        assert_eq!(splits[1].payout_cents, 4_000);
        assert_eq!(splits[0].name.as_deref(), Some("Partner 1"));
    }

    #[test]
    fn test_overrides_replace_stored() {
        let rows = assigned(&[Some(60.0), Some(40.0)]);
        let overrides = vec![
            SplitOverride {
                co_creator_id: rows[0].0.co_creator_id,
                percentage: 50.0,
            },
            SplitOverride {
                co_creator_id: rows[1].0.co_creator_id,
                percentage: 50.0,
            },
            // Not assigned to this event: ignored.
            SplitOverride {
                co_creator_id: Uuid::new_v4(),
                percentage: 10.0,
            },
        ];
        let splits = compute_splits(&rows, Some(&overrides), 8_000).unwrap();
        assert!(splits.iter().all(|s| s.payout_cents == 4_000));
    }

    #[test]
    fn test_split_total_must_be_100() {
        let rows = assigned(&[Some(60.0), Some(30.0)]);
        let err = compute_splits(&rows, None, 10_000).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("Current total: 90%"));

        let rows = assigned(&[Some(33.33), Some(33.33), Some(33.34)]);
        assert!(compute_splits(&rows, None, 10_000).is_ok());
    }

    #[test]
    fn test_no_co_creators_is_rejected() {
        assert!(compute_splits(&[], None, 10_000).is_err());
    }
}
