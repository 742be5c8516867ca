use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{AccommodationType, EventStatus, RegistrationStatus};
use crate::db::models::attendee::Attendee;
use crate::db::models::registration::{
    NewRegistration, NewRegistrationSubEvent, Registration, RegistrationChangeset,
    RevivedRegistration,
};

/// Filters accepted by the per-event registration listing.
#[derive(Debug, Default, Clone)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    pub search: Option<String>,
}

pub struct RegistrationRepo;

impl RegistrationRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(id.eq(registration_id))
            .select(Registration::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_id_for_update(
        conn: &mut PgConnection,
        registration_id: Uuid,
    ) -> Result<Option<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(id.eq(registration_id))
            .select(Registration::as_select())
            .for_update()
            .first(conn)
            .optional()
    }

    pub fn find_with_attendee(
        conn: &mut PgConnection,
        registration_id: Uuid,
    ) -> Result<Option<(Registration, Attendee)>, diesel::result::Error> {
        use crate::schema::{attendees, registrations};
        registrations::table
            .inner_join(attendees::table)
            .filter(registrations::id.eq(registration_id))
            .select((Registration::as_select(), Attendee::as_select()))
            .first(conn)
            .optional()
    }

    /// Any registration of the attendee for the event, whatever its status.
    pub fn find_for_attendee_and_event(
        conn: &mut PgConnection,
        attendee_id_val: Uuid,
        event_id_val: Uuid,
    ) -> Result<Option<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(attendee_id.eq(attendee_id_val))
            .filter(event_id.eq(event_id_val))
            .select(Registration::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_payment_intent(
        conn: &mut PgConnection,
        payment_intent: &str,
    ) -> Result<Option<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(stripe_payment_intent_id.eq(payment_intent))
            .select(Registration::as_select())
            .first(conn)
            .optional()
    }

    pub fn latest_for_attendee(
        conn: &mut PgConnection,
        attendee_id_val: Uuid,
    ) -> Result<Option<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(attendee_id.eq(attendee_id_val))
            .order(created_at.desc())
            .select(Registration::as_select())
            .first(conn)
            .optional()
    }

    pub fn list_for_attendee(
        conn: &mut PgConnection,
        attendee_id_val: Uuid,
    ) -> Result<Vec<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(attendee_id.eq(attendee_id_val))
            .order(created_at.desc())
            .select(Registration::as_select())
            .load(conn)
    }

    pub fn list_by_group(
        conn: &mut PgConnection,
        group_id_val: Uuid,
    ) -> Result<Vec<Registration>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(group_id.eq(group_id_val))
            .order(created_at.asc())
            .select(Registration::as_select())
            .load(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_registration: &NewRegistration,
    ) -> Result<Registration, diesel::result::Error> {
        diesel::insert_into(crate::schema::registrations::table)
            .values(new_registration)
            .returning(Registration::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        registration_id: Uuid,
        changes: &RegistrationChangeset,
    ) -> Result<Registration, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        diesel::update(registrations.filter(id.eq(registration_id)))
            .set(changes)
            .returning(Registration::as_returning())
            .get_result(conn)
    }

    /// Resets a lapsed (expired/cancelled/refunded) row so the pair can be registered again.
    pub fn revive(
        conn: &mut PgConnection,
        registration_id: Uuid,
        fresh: &NewRegistration,
    ) -> Result<Registration, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        diesel::update(registrations.filter(id.eq(registration_id)))
            .set(&RevivedRegistration::from_new(fresh, chrono::Utc::now()))
            .returning(Registration::as_returning())
            .get_result(conn)
    }

    pub fn list_by_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        filter: &RegistrationFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<(Registration, Attendee)>, i64), diesel::result::Error> {
        use crate::schema::{attendees, registrations};

        let pattern = filter.search.as_ref().map(|s| format!("%{}%", s.trim()));
        let build = || {
            let mut query = registrations::table
                .inner_join(attendees::table)
                .filter(registrations::event_id.eq(event_id_val))
                .into_boxed();
            if let Some(s) = filter.status {
                query = query.filter(registrations::status.eq(s));
            }
            if let Some(p) = pattern.as_ref() {
                query = query.filter(
                    attendees::first_name
                        .ilike(p.clone())
                        .or(attendees::last_name.ilike(p.clone()))
                        .or(attendees::email.ilike(p.clone())),
                );
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(registrations::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select((Registration::as_select(), Attendee::as_select()))
            .load(conn)?;
        Ok((items, total))
    }

    /// All registrations of the event in the given statuses, oldest first.
    pub fn list_with_attendees_by_statuses(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<(Registration, Attendee)>, diesel::result::Error> {
        use crate::schema::{attendees, registrations};
        registrations::table
            .inner_join(attendees::table)
            .filter(registrations::event_id.eq(event_id_val))
            .filter(registrations::status.eq_any(statuses.to_vec()))
            .order(registrations::created_at.asc())
            .select((Registration::as_select(), Attendee::as_select()))
            .load(conn)
    }

    pub fn list_all_with_attendees(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<(Registration, Attendee)>, diesel::result::Error> {
        use crate::schema::{attendees, registrations};
        registrations::table
            .inner_join(attendees::table)
            .filter(registrations::event_id.eq(event_id_val))
            .order(registrations::created_at.asc())
            .select((Registration::as_select(), Attendee::as_select()))
            .load(conn)
    }

    /// Spot-holding registrations that already used the member discount.
    pub fn count_member_discounts(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(event_id.eq(event_id_val))
            .filter(member_discount_applied.eq(true))
            .filter(status.eq_any(RegistrationStatus::HOLDS_SPOT))
            .count()
            .get_result(conn)
    }

    pub fn count_by_status(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<(RegistrationStatus, i64)>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(event_id.eq(event_id_val))
            .group_by(status)
            .select((status, diesel::dsl::count(id)))
            .load(conn)
    }

    pub fn accommodation_breakdown(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<(Option<AccommodationType>, i64)>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(event_id.eq(event_id_val))
            .filter(status.eq_any(statuses.to_vec()))
            .group_by(accommodation_type)
            .select((accommodation_type, diesel::dsl::count(id)))
            .load(conn)
    }

    /// Payment sum and number of complete registrations of one event.
    pub fn revenue_for_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<(i64, i64), diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        let (total, paid): (Option<i64>, i64) = registrations
            .filter(event_id.eq(event_id_val))
            .filter(status.eq(RegistrationStatus::Complete))
            .select((
                diesel::dsl::sum(payment_amount_cents),
                diesel::dsl::count(id),
            ))
            .first(conn)?;
        Ok((total.unwrap_or(0), paid))
    }

    pub fn dietary_values(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<Option<String>>, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(event_id.eq(event_id_val))
            .filter(status.eq_any(statuses.to_vec()))
            .select(dietary_restrictions)
            .load(conn)
    }

    /// Registration counts per status across every event in the given state.
    pub fn count_by_status_for_event_status(
        conn: &mut PgConnection,
        event_status: EventStatus,
    ) -> Result<Vec<(RegistrationStatus, i64)>, diesel::result::Error> {
        use crate::schema::{events as e, registrations as r};
        r::table
            .inner_join(e::table)
            .filter(e::status.eq(event_status))
            .group_by(r::status)
            .select((r::status, diesel::dsl::count(r::id)))
            .load(conn)
    }

    pub fn revenue_for_event_status(
        conn: &mut PgConnection,
        event_status: EventStatus,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::{events as e, registrations as r};
        let total: Option<i64> = r::table
            .inner_join(e::table)
            .filter(e::status.eq(event_status))
            .filter(r::status.eq(RegistrationStatus::Complete))
            .select(diesel::dsl::sum(r::payment_amount_cents))
            .first(conn)?;
        Ok(total.unwrap_or(0))
    }
}

pub struct RegistrationSubEventRepo;

impl RegistrationSubEventRepo {
    pub fn insert_many(
        conn: &mut PgConnection,
        rows: &[NewRegistrationSubEvent],
    ) -> Result<usize, diesel::result::Error> {
        if rows.is_empty() {
            return Ok(0);
        }
        diesel::insert_into(crate::schema::registration_sub_events::table)
            .values(rows)
            .execute(conn)
    }

    pub fn delete_by_registration(
        conn: &mut PgConnection,
        registration_id_val: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::registration_sub_events::dsl::*;
        diesel::delete(registration_sub_events.filter(registration_id.eq(registration_id_val)))
            .execute(conn)
    }
}
