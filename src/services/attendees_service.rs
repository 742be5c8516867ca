use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    db::models::api::{PageParams, error_codes},
    db::models::attendee::{
        Attendee, AttendeeChangeset, AttendeeDetail, AttendeeListQuery, CreateMembershipRequest,
        ImportSummary, ImportedAttendee, Membership, MembershipChangeset, MembershipListQuery,
        MembershipWithAttendee, NewAttendee, NewMembership, UpdateAttendeeRequest,
        UpdateMembershipRequest,
    },
    db::repositories::attendees::{AttendeeRepo, MembershipRepo},
    db::repositories::registrations::RegistrationRepo,
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    utils::phone::normalize_phone,
};

pub const DEFAULT_PER_PAGE: i64 = 25;
pub const MAX_PER_PAGE: i64 = 100;

/// Blank or unparseable phone numbers clear the field.
fn phone_change(raw: &Option<Option<String>>) -> Option<Option<String>> {
    raw.as_ref()
        .map(|p| p.as_deref().and_then(normalize_phone))
}

#[derive(Deserialize)]
struct CsvRow {
    #[serde(rename = "First Name", default)]
    first_name: String,
    #[serde(rename = "Last Name", default)]
    last_name: String,
    #[serde(rename = "Email", default)]
    email: String,
    #[serde(rename = "Phone", default)]
    phone: String,
}

/// Parses a client list with `First Name,Last Name,Email,Phone` headers.
///
/// Rows without a usable email are dropped, only the first of several
/// comma-separated emails is kept, and the first row for an email wins.
pub fn parse_attendee_csv(data: &str) -> Result<Vec<ImportedAttendee>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data.as_bytes());

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        // header is line 1
        let row = record.map_err(|e| {
            AppError::validation(format!("Invalid CSV at line {}: {}", index + 2, e))
        })?;

        let email = row
            .email
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        if !email.contains('@') || !seen.insert(email.clone()) {
            continue;
        }
        rows.push(ImportedAttendee {
            first_name: row.first_name.replace('"', "").trim().to_string(),
            last_name: row.last_name,
            email,
            phone: normalize_phone(&row.phone),
        });
    }
    Ok(rows)
}

pub struct AttendeesService;

impl AttendeesService {
    /// Upserts attendees from a CSV client list. Existing attendees only gain
    /// a phone number when theirs is blank.
    pub fn import_csv(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        data: &str,
    ) -> Result<ImportSummary, AppError> {
        let rows = parse_attendee_csv(data)?;
        let mut summary = ImportSummary {
            total_parsed: rows.len(),
            ..Default::default()
        };

        conn.transaction::<_, AppError, _>(|conn| {
            for row in &rows {
                match AttendeeRepo::find_by_email(conn, &row.email)? {
                    Some(existing) if existing.phone.is_none() && row.phone.is_some() => {
                        let changes = AttendeeChangeset {
                            phone: Some(row.phone.clone()),
                            updated_at: Some(Utc::now()),
                            ..Default::default()
                        };
                        AttendeeRepo::update(conn, existing.id, &changes)?;
                        summary.updated += 1;
                    }
                    Some(_) => summary.skipped += 1,
                    None => {
                        let attendee = AttendeeRepo::insert(
                            conn,
                            &NewAttendee {
                                email: row.email.clone(),
                                first_name: row.first_name.clone(),
                                last_name: row.last_name.clone(),
                                phone: row.phone.clone(),
                            },
                        )?;
                        AuditService::record_change::<Value, _>(
                            conn,
                            ctx,
                            "attendee",
                            attendee.id,
                            "imported",
                            None,
                            Some(&json!({ "email": attendee.email })),
                        )?;
                        summary.created += 1;
                    }
                }
            }
            Ok(())
        })?;

        tracing::info!(
            total = summary.total_parsed,
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            "attendee import finished"
        );
        Ok(summary)
    }

    pub fn list(
        conn: &mut PgConnection,
        query: &AttendeeListQuery,
    ) -> Result<(Vec<Attendee>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let term = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let (items, total) = AttendeeRepo::search(conn, term, offset, per_page)?;
        Ok((items, total, page, per_page))
    }

    pub fn get(conn: &mut PgConnection, attendee_id: Uuid) -> Result<AttendeeDetail, AppError> {
        let attendee = AttendeeRepo::find_by_id(conn, attendee_id)?
            .ok_or_else(|| AppError::not_found("Attendee"))?;
        let registrations = RegistrationRepo::list_for_attendee(conn, attendee_id)?;
        Ok(AttendeeDetail {
            attendee,
            registrations,
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        attendee_id: Uuid,
        req: &UpdateAttendeeRequest,
    ) -> Result<Attendee, AppError> {
        let before = AttendeeRepo::find_by_id(conn, attendee_id)?
            .ok_or_else(|| AppError::not_found("Attendee"))?;
        if req.first_name.is_none()
            && req.last_name.is_none()
            && req.phone.is_none()
            && req.admin_notes.is_none()
        {
            return Err(AppError::bad_request("No fields to update"));
        }

        let changes = AttendeeChangeset {
            first_name: req.first_name.as_ref().map(|n| n.trim().to_string()),
            last_name: req.last_name.as_ref().map(|n| n.trim().to_string()),
            phone: phone_change(&req.phone),
            admin_notes: req.admin_notes.clone(),
            updated_at: Some(Utc::now()),
            ..Default::default()
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let attendee = AttendeeRepo::update(conn, attendee_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "attendee",
                attendee_id,
                "updated",
                Some(&before),
                Some(req),
            )?;
            Ok(attendee)
        })
    }
}

pub struct MembershipsService;

impl MembershipsService {
    pub fn list(
        conn: &mut PgConnection,
        query: &MembershipListQuery,
    ) -> Result<(Vec<MembershipWithAttendee>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let (rows, total) = MembershipRepo::list(conn, query.active_only, offset, per_page)?;
        let items = rows
            .into_iter()
            .map(|(membership, attendee)| MembershipWithAttendee {
                attendee_name: attendee.full_name(),
                attendee_email: attendee.email,
                membership,
            })
            .collect();
        Ok((items, total, page, per_page))
    }

    /// Creates a membership and flags the attendee as a member.
    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateMembershipRequest,
    ) -> Result<Membership, AppError> {
        AttendeeRepo::find_by_id(conn, req.attendee_id)?
            .ok_or_else(|| AppError::not_found("Attendee"))?;
        if MembershipRepo::exists_active_for_attendee(conn, req.attendee_id)? {
            return Err(AppError::conflict_with_code(
                "Attendee already has an active membership",
                Some("attendee_id".to_string()),
                error_codes::MEMBERSHIP_ACTIVE_EXISTS,
            ));
        }

        let now = Utc::now();
        let new_membership = NewMembership {
            attendee_id: req.attendee_id,
            tier: req.tier.trim().to_string(),
            discount_type: req.discount_type.clone(),
            discount_value_cents: req.discount_value_cents,
            started_at: req.started_at.unwrap_or(now),
            expires_at: req.expires_at,
            is_active: true,
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let membership = MembershipRepo::insert(conn, &new_membership)?;
            AttendeeRepo::update(
                conn,
                req.attendee_id,
                &AttendeeChangeset {
                    is_member: Some(true),
                    membership_id: Some(Some(membership.id)),
                    updated_at: Some(now),
                    ..Default::default()
                },
            )?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "membership",
                membership.id,
                "created",
                None,
                Some(req),
            )?;
            Ok(membership)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        membership_id: Uuid,
        req: &UpdateMembershipRequest,
    ) -> Result<Membership, AppError> {
        let before = MembershipRepo::find_by_id(conn, membership_id)?
            .ok_or_else(|| AppError::not_found("Membership"))?;
        let changes = MembershipChangeset {
            tier: req.tier.clone(),
            discount_type: req.discount_type.clone(),
            discount_value_cents: req.discount_value_cents,
            expires_at: req.expires_at,
            is_active: req.is_active,
        };
        if changes.tier.is_none()
            && changes.discount_type.is_none()
            && changes.discount_value_cents.is_none()
            && changes.expires_at.is_none()
            && changes.is_active.is_none()
        {
            return Err(AppError::bad_request("No fields to update"));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            let membership = MembershipRepo::update(conn, membership_id, &changes)?;
            Self::sync_attendee(conn, &membership)?;
            AuditService::record_change(
                conn,
                ctx,
                "membership",
                membership_id,
                "updated",
                Some(&before),
                Some(req),
            )?;
            Ok(membership)
        })
    }

    /// Soft delete: the membership stays on record but stops counting.
    pub fn deactivate(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        membership_id: Uuid,
    ) -> Result<(), AppError> {
        MembershipRepo::find_by_id(conn, membership_id)?
            .ok_or_else(|| AppError::not_found("Membership"))?;

        conn.transaction::<_, AppError, _>(|conn| {
            let membership = MembershipRepo::update(
                conn,
                membership_id,
                &MembershipChangeset {
                    is_active: Some(false),
                    ..Default::default()
                },
            )?;
            Self::sync_attendee(conn, &membership)?;
            let mut old = Map::new();
            old.insert("is_active".into(), json!(true));
            AuditService::record_change(
                conn,
                ctx,
                "membership",
                membership_id,
                "deactivated",
                Some(&Value::Object(old)),
                Some(&json!({ "is_active": false })),
            )?;
            Ok(())
        })
    }

    /// Keeps `attendees.is_member`/`membership_id` in step with the membership.
    fn sync_attendee(conn: &mut PgConnection, membership: &Membership) -> Result<(), AppError> {
        let changes = if membership.is_active {
            AttendeeChangeset {
                is_member: Some(true),
                membership_id: Some(Some(membership.id)),
                updated_at: Some(Utc::now()),
                ..Default::default()
            }
        } else {
            AttendeeChangeset {
                is_member: Some(false),
                membership_id: Some(None),
                updated_at: Some(Utc::now()),
                ..Default::default()
            }
        };
        AttendeeRepo::update(conn, membership.attendee_id, &changes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phone_change() {
        assert_eq!(phone_change(&None), None);
        assert_eq!(phone_change(&Some(None)), Some(None));
        assert_eq!(
            phone_change(&Some(Some("(555) 123-4567".into()))),
            Some(Some("+15551234567".into()))
        );
        assert_eq!(phone_change(&Some(Some("".into()))), Some(None));
    }
}
