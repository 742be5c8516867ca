use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{EventStatus, RegistrationStatus};
use crate::db::models::event::{
    Event, EventChangeset, NewEvent, NewSubEvent, SubEvent, SubEventChangeset,
};

/// Filters accepted by the event listing.
#[derive(Debug, Default, Clone)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

pub struct EventRepo;

impl EventRepo {
    pub fn exists_by_slug(
        conn: &mut PgConnection,
        slug_val: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        diesel::select(diesel::dsl::exists(events.filter(slug.eq(slug_val)))).get_result(conn)
    }

    pub fn exists_by_slug_excluding_id(
        conn: &mut PgConnection,
        slug_val: &str,
        exclude_id: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        diesel::select(diesel::dsl::exists(
            events.filter(slug.eq(slug_val)).filter(id.ne(exclude_id)),
        ))
        .get_result(conn)
    }

    pub fn insert(conn: &mut PgConnection, new_event: &NewEvent) -> Result<Event, diesel::result::Error> {
        diesel::insert_into(crate::schema::events::table)
            .values(new_event)
            .returning(Event::as_returning())
            .get_result(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        event_id: Uuid,
    ) -> Result<Option<Event>, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events
            .filter(id.eq(event_id))
            .select(Event::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_slug(
        conn: &mut PgConnection,
        slug_val: &str,
    ) -> Result<Option<Event>, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events
            .filter(slug.eq(slug_val))
            .select(Event::as_select())
            .first(conn)
            .optional()
    }

    /// Active event by slug with its row locked for the rest of the transaction.
    pub fn find_active_by_slug_for_update(
        conn: &mut PgConnection,
        slug_val: &str,
    ) -> Result<Option<Event>, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events
            .filter(slug.eq(slug_val))
            .filter(status.eq(EventStatus::Active))
            .select(Event::as_select())
            .for_update()
            .first(conn)
            .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        filter: &EventFilter,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<Event>, i64), diesel::result::Error> {
        use crate::schema::events::dsl::*;

        let build = || {
            let mut query = events.into_boxed();
            if let Some(s) = filter.status {
                query = query.filter(status.eq(s));
            }
            if let Some(from) = filter.date_from {
                query = query.filter(event_date.ge(from));
            }
            if let Some(to) = filter.date_to {
                query = query.filter(event_date.le(to));
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(event_date.desc())
            .offset(offset)
            .limit(limit)
            .select(Event::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn list_by_status(
        conn: &mut PgConnection,
        status_val: EventStatus,
    ) -> Result<Vec<Event>, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events
            .filter(status.eq(status_val))
            .order(event_date.asc())
            .select(Event::as_select())
            .load(conn)
    }

    pub fn list_upcoming(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Event>, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events
            .filter(status.eq_any([EventStatus::Active, EventStatus::Draft]))
            .filter(event_date.ge(now))
            .order(event_date.asc())
            .limit(limit)
            .select(Event::as_select())
            .load(conn)
    }

    pub fn count_by_status(
        conn: &mut PgConnection,
        status_val: EventStatus,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        events.filter(status.eq(status_val)).count().get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        event_id: Uuid,
        changes: &EventChangeset,
    ) -> Result<Event, diesel::result::Error> {
        use crate::schema::events::dsl::*;
        diesel::update(events.filter(id.eq(event_id)))
            .set(changes)
            .returning(Event::as_returning())
            .get_result(conn)
    }

    /// Registrations of the event that currently hold a spot.
    pub fn count_spot_holders(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::registrations::dsl::*;
        registrations
            .filter(event_id.eq(event_id_val))
            .filter(status.eq_any(RegistrationStatus::HOLDS_SPOT))
            .count()
            .get_result(conn)
    }
}

pub struct SubEventRepo;

impl SubEventRepo {
    pub fn list_by_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<SubEvent>, diesel::result::Error> {
        use crate::schema::sub_events::dsl::*;
        sub_events
            .filter(parent_event_id.eq(event_id_val))
            .order((sort_order.asc(), created_at.asc()))
            .select(SubEvent::as_select())
            .load(conn)
    }

    pub fn find_in_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        sub_event_id: Uuid,
    ) -> Result<Option<SubEvent>, diesel::result::Error> {
        use crate::schema::sub_events::dsl::*;
        sub_events
            .filter(id.eq(sub_event_id))
            .filter(parent_event_id.eq(event_id_val))
            .select(SubEvent::as_select())
            .first(conn)
            .optional()
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_sub_event: &NewSubEvent,
    ) -> Result<SubEvent, diesel::result::Error> {
        diesel::insert_into(crate::schema::sub_events::table)
            .values(new_sub_event)
            .returning(SubEvent::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        sub_event_id: Uuid,
        changes: &SubEventChangeset,
    ) -> Result<SubEvent, diesel::result::Error> {
        use crate::schema::sub_events::dsl::*;
        diesel::update(sub_events.filter(id.eq(sub_event_id)))
            .set(changes)
            .returning(SubEvent::as_returning())
            .get_result(conn)
    }

    pub fn delete_by_id(
        conn: &mut PgConnection,
        sub_event_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::sub_events::dsl::*;
        diesel::delete(sub_events.filter(id.eq(sub_event_id))).execute(conn)
    }

    pub fn has_registrations(
        conn: &mut PgConnection,
        sub_event_id_val: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::registration_sub_events::dsl::*;
        diesel::select(diesel::dsl::exists(
            registration_sub_events.filter(sub_event_id.eq(sub_event_id_val)),
        ))
        .get_result(conn)
    }

    /// Selections on this sub-event whose registration holds a spot.
    pub fn count_spot_holders(
        conn: &mut PgConnection,
        sub_event_id_val: Uuid,
    ) -> Result<i64, diesel::result::Error> {
        use crate::schema::{registration_sub_events as rse, registrations as r};
        rse::table
            .inner_join(r::table)
            .filter(rse::sub_event_id.eq(sub_event_id_val))
            .filter(r::status.eq_any(RegistrationStatus::HOLDS_SPOT))
            .count()
            .get_result(conn)
    }

    /// Headcount per sub-event over the given registration statuses.
    pub fn headcounts(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        statuses: &[RegistrationStatus],
    ) -> Result<Vec<(Uuid, i64)>, diesel::result::Error> {
        use crate::schema::{registration_sub_events as rse, registrations as r};
        rse::table
            .inner_join(r::table)
            .filter(r::event_id.eq(event_id_val))
            .filter(r::status.eq_any(statuses.to_vec()))
            .group_by(rse::sub_event_id)
            .select((rse::sub_event_id, diesel::dsl::count(rse::id)))
            .load(conn)
    }
}
