use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::{
    db::enums::{RegistrationSource, RegistrationStatus},
    db::models::api::{PageParams, error_codes},
    db::models::attendee::{Attendee, AttendeeChangeset},
    db::models::registration::{
        ManualRegistrationRequest, NewRegistration, Registration, RegistrationChangeset,
        RegistrationListQuery, RegistrationWithAttendee, UpdateRegistrationRequest,
    },
    db::repositories::attendees::AttendeeRepo,
    db::repositories::registrations::{RegistrationFilter, RegistrationRepo},
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
    services::registration_service::find_or_create_attendee,
    utils::phone::normalize_optional,
};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

pub const CSV_HEADER: [&str; 12] = [
    "Registration ID",
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Status",
    "Accommodation",
    "Dietary Restrictions",
    "Payment (cents)",
    "Source",
    "Notes",
    "Registered At",
];

/// Renders the export sheet for one event.
pub fn registrations_csv(rows: &[(Registration, Attendee)]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let csv_err = |e: csv::Error| AppError::internal(format!("csv export failed: {}", e));

    writer.write_record(CSV_HEADER).map_err(csv_err)?;
    for (registration, attendee) in rows {
        writer
            .write_record([
                registration.id.to_string(),
                attendee.first_name.clone(),
                attendee.last_name.clone(),
                attendee.email.clone(),
                attendee.phone.clone().unwrap_or_default(),
                registration.status.to_string(),
                registration
                    .accommodation_type
                    .map(|a| a.to_string())
                    .unwrap_or_default(),
                registration.dietary_restrictions.clone().unwrap_or_default(),
                registration
                    .payment_amount_cents
                    .map(|c| c.to_string())
                    .unwrap_or_default(),
                registration.source.to_string(),
                registration.notes.clone().unwrap_or_default(),
                registration.created_at.to_rfc3339(),
            ])
            .map_err(csv_err)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::internal(format!("csv export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::internal(format!("csv export failed: {}", e)))
}

/// Old values of the fields a PATCH touches, for the audit trail.
fn touched_values(before: &Registration, req: &UpdateRegistrationRequest) -> Value {
    let mut old = Map::new();
    if req.status.is_some() {
        old.insert("status".into(), json!(before.status));
    }
    if req.accommodation_type.is_some() {
        old.insert("accommodation_type".into(), json!(before.accommodation_type));
    }
    if req.dietary_restrictions.is_some() {
        old.insert("dietary_restrictions".into(), json!(before.dietary_restrictions));
    }
    if req.notes.is_some() {
        old.insert("notes".into(), json!(before.notes));
    }
    if req.payment_amount_cents.is_some() {
        old.insert("payment_amount_cents".into(), json!(before.payment_amount_cents));
    }
    if req.payment_method.is_some() {
        old.insert("payment_method".into(), json!(before.payment_method));
    }
    Value::Object(old)
}

pub fn is_empty_update(req: &UpdateRegistrationRequest) -> bool {
    req.status.is_none()
        && req.accommodation_type.is_none()
        && req.dietary_restrictions.is_none()
        && req.notes.is_none()
        && req.payment_amount_cents.is_none()
        && req.payment_method.is_none()
}

pub struct RegistrationsService;

impl RegistrationsService {
    pub fn list(
        conn: &mut PgConnection,
        event_id: Uuid,
        query: &RegistrationListQuery,
    ) -> Result<(Vec<RegistrationWithAttendee>, i64, i64, i64), AppError> {
        EventsService::find(conn, event_id)?;
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);

        let filter = RegistrationFilter {
            status: query.status,
            search: query
                .search
                .as_ref()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        };
        let (rows, total) = RegistrationRepo::list_by_event(conn, event_id, &filter, offset, per_page)?;
        let items = rows
            .into_iter()
            .map(|(registration, attendee)| RegistrationWithAttendee {
                registration,
                attendee,
            })
            .collect();
        Ok((items, total, page, per_page))
    }

    pub fn get(
        conn: &mut PgConnection,
        registration_id: Uuid,
    ) -> Result<RegistrationWithAttendee, AppError> {
        let (registration, attendee) = RegistrationRepo::find_with_attendee(conn, registration_id)?
            .ok_or_else(|| AppError::not_found("Registration"))?;
        Ok(RegistrationWithAttendee {
            registration,
            attendee,
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        registration_id: Uuid,
        req: &UpdateRegistrationRequest,
    ) -> Result<RegistrationWithAttendee, AppError> {
        let (before, attendee) = RegistrationRepo::find_with_attendee(conn, registration_id)?
            .ok_or_else(|| AppError::not_found("Registration"))?;
        if is_empty_update(req) {
            return Err(AppError::bad_request("No fields to update"));
        }

        let changes = RegistrationChangeset {
            status: req.status,
            payment_method: req.payment_method.map(Some),
            payment_amount_cents: req.payment_amount_cents.map(Some),
            accommodation_type: req.accommodation_type,
            dietary_restrictions: req.dietary_restrictions.clone(),
            notes: req.notes.clone(),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let action = if req.status.is_some() {
            "status_change"
        } else {
            "updated"
        };
        let old_values = touched_values(&before, req);

        let registration = conn.transaction::<_, AppError, _>(|conn| {
            let registration = RegistrationRepo::update(conn, registration_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "registration",
                registration_id,
                action,
                Some(&old_values),
                Some(req),
            )?;
            Ok(registration)
        })?;

        Ok(RegistrationWithAttendee {
            registration,
            attendee,
        })
    }

    /// Staff-entered registration for walk-ins and comps.
    pub fn create_manual(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        req: &ManualRegistrationRequest,
    ) -> Result<RegistrationWithAttendee, AppError> {
        EventsService::find(conn, event_id)?;
        let source = req.source.unwrap_or(RegistrationSource::Manual);
        if !matches!(source, RegistrationSource::Manual | RegistrationSource::WalkIn) {
            return Err(AppError::validation("source must be manual or walk_in"));
        }
        let status = req.status.unwrap_or(RegistrationStatus::Complete);
        let now = Utc::now();

        conn.transaction::<_, AppError, _>(|conn| {
            let attendee = find_or_create_attendee(
                conn,
                &req.email,
                &req.first_name,
                &req.last_name,
                req.phone.as_deref(),
            )?;
            let attendee = AttendeeRepo::update(
                conn,
                attendee.id,
                &AttendeeChangeset {
                    first_name: Some(req.first_name.trim().to_string()),
                    last_name: Some(req.last_name.trim().to_string()),
                    phone: normalize_optional(req.phone.as_deref()).map(Some),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;

            if RegistrationRepo::find_for_attendee_and_event(conn, attendee.id, event_id)?.is_some() {
                return Err(AppError::conflict_with_code(
                    "This attendee is already registered for this event",
                    Some("email".to_string()),
                    error_codes::REGISTRATION_DUPLICATE,
                ));
            }

            let registration = RegistrationRepo::insert(
                conn,
                &NewRegistration {
                    attendee_id: attendee.id,
                    event_id,
                    status,
                    payment_method: req.payment_method,
                    payment_amount_cents: req.payment_amount_cents,
                    group_id: None,
                    accommodation_type: req.accommodation_type,
                    dietary_restrictions: req.dietary_restrictions.clone(),
                    intake_data: None,
                    waiver_accepted_at: (status == RegistrationStatus::Complete).then_some(now),
                    source,
                    notes: req.notes.clone(),
                    member_discount_applied: false,
                },
            )?;

            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "registration",
                registration.id,
                "manual_entry",
                None,
                Some(&json!({
                    "attendee_email": attendee.email,
                    "source": source,
                    "status": status,
                    "payment_amount_cents": req.payment_amount_cents,
                })),
            )?;
            tracing::info!(registration_id = %registration.id, event_id = %event_id, source = %source, "manual registration created");

            Ok(RegistrationWithAttendee {
                registration,
                attendee,
            })
        })
    }

    pub fn check_in(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        registration_id: Uuid,
    ) -> Result<RegistrationWithAttendee, AppError> {
        let (before, attendee) = RegistrationRepo::find_with_attendee(conn, registration_id)?
            .ok_or_else(|| AppError::not_found("Registration"))?;
        if !RegistrationStatus::ATTENDING.contains(&before.status) {
            return Err(AppError::validation(format!(
                "Cannot check in a registration with status {}",
                before.status
            )));
        }
        if before.checked_in_at.is_some() {
            return Ok(RegistrationWithAttendee {
                registration: before,
                attendee,
            });
        }

        let now = Utc::now();
        let changes = RegistrationChangeset {
            checked_in_at: Some(Some(now)),
            checked_in_by: Some(Some(ctx.actor.clone())),
            updated_at: Some(now),
            ..Default::default()
        };
        let registration = conn.transaction::<_, AppError, _>(|conn| {
            let registration = RegistrationRepo::update(conn, registration_id, &changes)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "registration",
                registration_id,
                "check_in",
                None,
                Some(&json!({ "checked_in_at": now })),
            )?;
            Ok(registration)
        })?;
        Ok(RegistrationWithAttendee {
            registration,
            attendee,
        })
    }

    pub fn undo_check_in(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        registration_id: Uuid,
    ) -> Result<RegistrationWithAttendee, AppError> {
        let (before, attendee) = RegistrationRepo::find_with_attendee(conn, registration_id)?
            .ok_or_else(|| AppError::not_found("Registration"))?;

        let changes = RegistrationChangeset {
            checked_in_at: Some(None),
            checked_in_by: Some(None),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };
        let registration = conn.transaction::<_, AppError, _>(|conn| {
            let registration = RegistrationRepo::update(conn, registration_id, &changes)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "registration",
                registration_id,
                "check_in_undone",
                Some(&json!({ "checked_in_at": before.checked_in_at, "checked_in_by": before.checked_in_by })),
                None,
            )?;
            Ok(registration)
        })?;
        Ok(RegistrationWithAttendee {
            registration,
            attendee,
        })
    }

    /// Returns `(filename, csv body)`.
    pub fn export_csv(conn: &mut PgConnection, event_id: Uuid) -> Result<(String, String), AppError> {
        let event = EventsService::find(conn, event_id)?;
        let rows = RegistrationRepo::list_all_with_attendees(conn, event_id)?;
        let body = registrations_csv(&rows)?;
        Ok((format!("{}_registrations.csv", event.slug), body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::AccommodationType;

    fn row() -> (Registration, Attendee) {
        let now = Utc::now();
        let attendee = Attendee {
            id: Uuid::new_v4(),
            email: "sky@example.com".into(),
            first_name: "Sky".into(),
            last_name: "Rivers, Jr".into(),
            phone: Some("+15551234567".into()),
            is_member: false,
            membership_id: None,
            admin_notes: None,
            created_at: now,
            updated_at: now,
        };
        let registration = Registration {
            id: Uuid::new_v4(),
            attendee_id: attendee.id,
            event_id: Uuid::new_v4(),
            status: RegistrationStatus::Complete,
            payment_method: None,
            payment_amount_cents: Some(5000),
            stripe_checkout_session_id: None,
            stripe_payment_intent_id: None,
            group_id: None,
            accommodation_type: Some(AccommodationType::BellTent),
            dietary_restrictions: None,
            intake_data: None,
            waiver_accepted_at: None,
            estimated_arrival: None,
            checked_in_at: None,
            checked_in_by: None,
            source: RegistrationSource::RegistrationForm,
            notes: None,
            member_discount_applied: false,
            created_at: now,
            updated_at: now,
        };
        (registration, attendee)
    }

    #[test]
    fn test_csv_header_and_quoting() {
        let rows = vec![row()];
        let out = registrations_csv(&rows).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Registration ID,First Name,Last Name,Email,Phone,Status,Accommodation,\
             Dietary Restrictions,Payment (cents),Source,Notes,Registered At"
        );
        let line = lines.next().unwrap();
        assert!(line.contains("\"Rivers, Jr\""));
        assert!(line.contains(",complete,bell_tent,,5000,registration_form,,"));
    }

    #[test]
    fn test_empty_update_and_touched_values() {
        assert!(is_empty_update(&UpdateRegistrationRequest::default()));
        let req = UpdateRegistrationRequest {
            notes: Some(None),
            ..Default::default()
        };
        assert!(!is_empty_update(&req));

        let (registration, _) = row();
        let old = touched_values(&registration, &req);
        assert_eq!(old, json!({ "notes": null }));
    }
}
