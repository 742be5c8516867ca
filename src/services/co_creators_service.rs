use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    config::Config,
    db::enums::RegistrationStatus,
    db::models::api::error_codes,
    db::models::co_creator::{
        AssignEventRequest, CoCreator, CoCreatorWithEvents, CreateCoCreatorRequest,
        EventBrief, EventCoCreator, EventCoCreatorChangeset, NewCoCreator, PortalAttendee,
        PortalEventDetail, PortalEventSummary, UpdateAssignmentRequest,
    },
    db::models::event::Event,
    db::models::expense::{CreateExpenseRequest, Expense, ExpenseList, ExpenseListQuery},
    db::models::auth::CoCreatorUser,
    db::models::auth::Principal,
    db::models::settlement::PortalSettlement,
    db::repositories::co_creators::{CoCreatorRepo, EventCoCreatorRepo},
    db::repositories::registrations::RegistrationRepo,
    db::repositories::settlements::SettlementRepo,
    error::AppError,
    providers::Providers,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
    services::expenses_service::ExpensesService,
    services::session_service::SessionService,
};

fn brief(link: EventCoCreator, event: Event) -> EventBrief {
    EventBrief {
        event_id: event.id,
        name: event.name,
        slug: event.slug,
        event_date: event.event_date,
        can_see_amounts: link.can_see_amounts,
        can_upload_expenses: link.can_upload_expenses,
        split_percentage: link.split_percentage,
    }
}

/// Total and complete registration counts from a per-status breakdown.
pub fn registration_totals(counts: &[(RegistrationStatus, i64)]) -> (i64, i64) {
    let total = counts.iter().map(|(_, n)| n).sum();
    let complete = counts
        .iter()
        .filter(|(s, _)| *s == RegistrationStatus::Complete)
        .map(|(_, n)| n)
        .sum();
    (total, complete)
}

pub struct CoCreatorsService;

impl CoCreatorsService {
    fn find(conn: &mut PgConnection, co_creator_id: Uuid) -> Result<CoCreator, AppError> {
        CoCreatorRepo::find_by_id(conn, co_creator_id)?
            .ok_or_else(|| AppError::not_found("Co-creator"))
    }

    fn with_events(
        conn: &mut PgConnection,
        co_creator: CoCreator,
    ) -> Result<CoCreatorWithEvents, AppError> {
        let events = EventCoCreatorRepo::list_events_for(conn, co_creator.id)?
            .into_iter()
            .map(|(link, event)| brief(link, event))
            .collect();
        Ok(CoCreatorWithEvents { co_creator, events })
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateCoCreatorRequest,
    ) -> Result<CoCreatorWithEvents, AppError> {
        let email = req.email.trim().to_lowercase();
        if CoCreatorRepo::exists_by_email(conn, &email)? {
            return Err(AppError::conflict_with_code(
                "A co-creator with that email already exists",
                Some("email".to_string()),
                error_codes::CO_CREATOR_EMAIL_EXISTS,
            ));
        }

        let new_co_creator = NewCoCreator {
            name: req.name.trim().to_string(),
            email,
            venmo_handle: req
                .venmo_handle
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string),
        };

        let co_creator = conn.transaction::<_, AppError, _>(|conn| {
            let co_creator = CoCreatorRepo::insert(conn, &new_co_creator)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "co_creator",
                co_creator.id,
                "created",
                None,
                Some(&co_creator),
            )?;
            Ok(co_creator)
        })?;
        Ok(CoCreatorWithEvents {
            co_creator,
            events: Vec::new(),
        })
    }

    pub fn list(conn: &mut PgConnection) -> Result<Vec<CoCreatorWithEvents>, AppError> {
        CoCreatorRepo::list(conn)?
            .into_iter()
            .map(|co_creator| Self::with_events(conn, co_creator))
            .collect()
    }

    pub fn get(conn: &mut PgConnection, co_creator_id: Uuid) -> Result<CoCreatorWithEvents, AppError> {
        let co_creator = Self::find(conn, co_creator_id)?;
        Self::with_events(conn, co_creator)
    }

    /// Removes the co-creator together with every event assignment.
    pub fn delete(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        co_creator_id: Uuid,
    ) -> Result<(), AppError> {
        let before = Self::find(conn, co_creator_id)?;
        conn.transaction::<_, AppError, _>(|conn| {
            EventCoCreatorRepo::delete_for_co_creator(conn, co_creator_id)?;
            CoCreatorRepo::delete_by_id(conn, co_creator_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "co_creator",
                co_creator_id,
                "deleted",
                Some(&before),
                None,
            )?;
            Ok(())
        })
    }

    pub fn assign_event(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        co_creator_id: Uuid,
        req: &AssignEventRequest,
    ) -> Result<EventCoCreator, AppError> {
        Self::find(conn, co_creator_id)?;
        EventsService::find(conn, req.event_id)?;
        if EventCoCreatorRepo::find(conn, req.event_id, co_creator_id)?.is_some() {
            return Err(AppError::conflict_with_code(
                "Co-creator is already assigned to this event",
                Some("event_id".to_string()),
                error_codes::CO_CREATOR_ALREADY_ASSIGNED,
            ));
        }

        let link = EventCoCreator {
            event_id: req.event_id,
            co_creator_id,
            can_see_amounts: req.can_see_amounts,
            can_upload_expenses: req.can_upload_expenses,
            split_percentage: req.split_percentage,
        };
        conn.transaction::<_, AppError, _>(|conn| {
            let link = EventCoCreatorRepo::insert(conn, &link)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "co_creator",
                co_creator_id,
                "event_assigned",
                None,
                Some(&link),
            )?;
            Ok(link)
        })
    }

    pub fn update_assignment(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        co_creator_id: Uuid,
        event_id: Uuid,
        req: &UpdateAssignmentRequest,
    ) -> Result<EventCoCreator, AppError> {
        let before = EventCoCreatorRepo::find(conn, event_id, co_creator_id)?
            .ok_or_else(|| AppError::not_found("Assignment"))?;
        if req.can_see_amounts.is_none()
            && req.can_upload_expenses.is_none()
            && req.split_percentage.is_none()
        {
            return Err(AppError::bad_request("No fields to update"));
        }
        let changes = EventCoCreatorChangeset {
            can_see_amounts: req.can_see_amounts,
            can_upload_expenses: req.can_upload_expenses,
            split_percentage: req.split_percentage,
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let link = EventCoCreatorRepo::update(conn, event_id, co_creator_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "co_creator",
                co_creator_id,
                "assignment_updated",
                Some(&before),
                Some(&link),
            )?;
            Ok(link)
        })
    }

    pub fn unassign_event(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        co_creator_id: Uuid,
        event_id: Uuid,
    ) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            if EventCoCreatorRepo::delete(conn, event_id, co_creator_id)? == 0 {
                return Err(AppError::not_found("Assignment"));
            }
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "co_creator",
                co_creator_id,
                "event_unassigned",
                Some(&json!({ "event_id": event_id })),
                None,
            )?;
            Ok(())
        })
    }

    pub async fn invite(
        conn: &mut PgConnection,
        providers: &Providers,
        config: &Config,
        co_creator_id: Uuid,
    ) -> Result<Value, AppError> {
        let co_creator = Self::find(conn, co_creator_id)?;
        let sent = SessionService::issue_magic_link(conn, providers, config, &co_creator).await?;
        Ok(json!({ "detail": "Magic link sent", "email_sent": sent }))
    }
}

/// Read-mostly views for an authenticated co-creator.
pub struct PortalService;

impl PortalService {
    /// The caller's assignment on the event, or 403.
    fn assignment(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
    ) -> Result<EventCoCreator, AppError> {
        EventCoCreatorRepo::find(conn, event_id, user.id)?
            .ok_or_else(|| AppError::forbidden("You do not have access to this event"))
    }

    fn principal(user: &CoCreatorUser) -> Principal {
        Principal::CoCreator {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            event_ids: user.event_ids.clone(),
        }
    }

    pub fn events(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
    ) -> Result<Vec<PortalEventSummary>, AppError> {
        let assigned = EventCoCreatorRepo::list_events_for(conn, user.id)?;
        let mut out = Vec::with_capacity(assigned.len());
        for (link, event) in assigned {
            let counts = RegistrationRepo::count_by_status(conn, event.id)?;
            let (total_registrations, complete_registrations) = registration_totals(&counts);
            out.push(PortalEventSummary {
                id: event.id,
                name: event.name,
                event_date: event.event_date,
                event_end_date: event.event_end_date,
                event_type: event.event_type,
                status: event.status,
                total_registrations,
                complete_registrations,
                capacity: event.capacity,
                can_see_amounts: link.can_see_amounts,
                can_upload_expenses: link.can_upload_expenses,
            });
        }
        Ok(out)
    }

    pub fn event(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
    ) -> Result<PortalEventDetail, AppError> {
        let link = Self::assignment(conn, user, event_id)?;
        let event = EventsService::find(conn, event_id)?;
        Ok(PortalEventDetail {
            id: event.id,
            name: event.name,
            event_date: event.event_date,
            event_end_date: event.event_end_date,
            event_type: event.event_type,
            status: event.status,
            capacity: event.capacity,
            meeting_point_a: event.meeting_point_a,
            meeting_point_b: event.meeting_point_b,
            location_text: event.location_text,
            can_see_amounts: link.can_see_amounts,
            can_upload_expenses: link.can_upload_expenses,
        })
    }

    /// Complete registrations only.
    pub fn attendees(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
    ) -> Result<Vec<PortalAttendee>, AppError> {
        let link = Self::assignment(conn, user, event_id)?;
        let rows = RegistrationRepo::list_with_attendees_by_statuses(
            conn,
            event_id,
            &[RegistrationStatus::Complete],
        )?;
        Ok(rows
            .into_iter()
            .map(|(registration, attendee)| PortalAttendee {
                first_name: attendee.first_name,
                last_name: attendee.last_name,
                email: attendee.email,
                phone: attendee.phone,
                status: registration.status,
                accommodation_type: registration.accommodation_type,
                dietary_restrictions: registration.dietary_restrictions,
                payment_amount_cents: if link.can_see_amounts {
                    registration.payment_amount_cents
                } else {
                    None
                },
            })
            .collect())
    }

    pub fn expenses(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
        query: &ExpenseListQuery,
    ) -> Result<(ExpenseList, i64, i64), AppError> {
        Self::assignment(conn, user, event_id)?;
        ExpensesService::list_unchecked(conn, event_id, query)
    }

    pub fn create_expense(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
        req: &CreateExpenseRequest,
    ) -> Result<Expense, AppError> {
        let link = Self::assignment(conn, user, event_id)?;
        if !link.can_upload_expenses {
            return Err(AppError::forbidden(
                "Expense upload not permitted for this event",
            ));
        }
        ExpensesService::create(conn, &Self::principal(user), event_id, req)
    }

    pub fn settlement(
        conn: &mut PgConnection,
        user: &CoCreatorUser,
        event_id: Uuid,
    ) -> Result<Option<PortalSettlement>, AppError> {
        let link = Self::assignment(conn, user, event_id)?;
        Ok(SettlementRepo::latest_for_event(conn, event_id)?
            .map(|s| PortalSettlement::from_settlement(s, link.can_see_amounts)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_totals() {
        let counts = vec![
            (RegistrationStatus::Complete, 7),
            (RegistrationStatus::PendingPayment, 2),
            (RegistrationStatus::Cancelled, 1),
        ];
        assert_eq!(registration_totals(&counts), (10, 7));
        assert_eq!(registration_totals(&[]), (0, 0));
    }
}
