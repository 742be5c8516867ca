use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::attendee::{
    Attendee, AttendeeChangeset, Membership, MembershipChangeset, NewAttendee, NewMembership,
};

pub struct AttendeeRepo;

impl AttendeeRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        attendee_id: Uuid,
    ) -> Result<Option<Attendee>, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        attendees
            .filter(id.eq(attendee_id))
            .select(Attendee::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_email(
        conn: &mut PgConnection,
        email_val: &str,
    ) -> Result<Option<Attendee>, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        attendees
            .filter(email.eq(email_val))
            .select(Attendee::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_phone(
        conn: &mut PgConnection,
        phone_val: &str,
    ) -> Result<Option<Attendee>, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        attendees
            .filter(phone.eq(phone_val))
            .order(updated_at.desc())
            .select(Attendee::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_phones(
        conn: &mut PgConnection,
        phones: &[String],
    ) -> Result<Vec<Attendee>, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        attendees
            .filter(phone.eq_any(phones))
            .select(Attendee::as_select())
            .load(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_attendee: &NewAttendee,
    ) -> Result<Attendee, diesel::result::Error> {
        diesel::insert_into(crate::schema::attendees::table)
            .values(new_attendee)
            .returning(Attendee::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        attendee_id: Uuid,
        changes: &AttendeeChangeset,
    ) -> Result<Attendee, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        diesel::update(attendees.filter(id.eq(attendee_id)))
            .set(changes)
            .returning(Attendee::as_returning())
            .get_result(conn)
    }

    /// ILIKE search across names and email, newest first.
    pub fn search(
        conn: &mut PgConnection,
        term: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Attendee>, i64), diesel::result::Error> {
        use crate::schema::attendees::dsl::*;

        let pattern = term.map(|t| format!("%{}%", t.trim()));
        let build = || {
            let mut query = attendees.into_boxed();
            if let Some(p) = pattern.as_ref() {
                query = query.filter(
                    first_name
                        .ilike(p.clone())
                        .or(last_name.ilike(p.clone()))
                        .or(email.ilike(p.clone())),
                );
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(Attendee::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn count(conn: &mut PgConnection) -> Result<i64, diesel::result::Error> {
        use crate::schema::attendees::dsl::*;
        attendees.count().get_result(conn)
    }
}

pub struct MembershipRepo;

impl MembershipRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        membership_id: Uuid,
    ) -> Result<Option<Membership>, diesel::result::Error> {
        use crate::schema::memberships::dsl::*;
        memberships
            .filter(id.eq(membership_id))
            .select(Membership::as_select())
            .first(conn)
            .optional()
    }

    /// The attendee's active membership that has not expired at `now`.
    pub fn find_current_for_attendee(
        conn: &mut PgConnection,
        attendee_id_val: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Membership>, diesel::result::Error> {
        use crate::schema::memberships::dsl::*;
        memberships
            .filter(attendee_id.eq(attendee_id_val))
            .filter(is_active.eq(true))
            .filter(expires_at.is_null().or(expires_at.gt(now)))
            .order(started_at.desc())
            .select(Membership::as_select())
            .first(conn)
            .optional()
    }

    pub fn exists_active_for_attendee(
        conn: &mut PgConnection,
        attendee_id_val: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::memberships::dsl::*;
        diesel::select(diesel::dsl::exists(
            memberships
                .filter(attendee_id.eq(attendee_id_val))
                .filter(is_active.eq(true)),
        ))
        .get_result(conn)
    }

    pub fn list(
        conn: &mut PgConnection,
        active_only: bool,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<(Membership, Attendee)>, i64), diesel::result::Error> {
        use crate::schema::{attendees, memberships};

        let build = || {
            let mut query = memberships::table.inner_join(attendees::table).into_boxed();
            if active_only {
                query = query.filter(memberships::is_active.eq(true));
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(memberships::created_at.desc())
            .offset(offset)
            .limit(limit)
            .select((Membership::as_select(), Attendee::as_select()))
            .load(conn)?;
        Ok((items, total))
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_membership: &NewMembership,
    ) -> Result<Membership, diesel::result::Error> {
        diesel::insert_into(crate::schema::memberships::table)
            .values(new_membership)
            .returning(Membership::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        membership_id: Uuid,
        changes: &MembershipChangeset,
    ) -> Result<Membership, diesel::result::Error> {
        use crate::schema::memberships::dsl::*;
        diesel::update(memberships.filter(id.eq(membership_id)))
            .set(changes)
            .returning(Membership::as_returning())
            .get_result(conn)
    }
}
