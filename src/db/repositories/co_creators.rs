use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::co_creator::{
    CoCreator, EventCoCreator, EventCoCreatorChangeset, NewCoCreator,
};
use crate::db::models::event::Event;

pub struct CoCreatorRepo;

impl CoCreatorRepo {
    pub fn exists_by_email(
        conn: &mut PgConnection,
        email_val: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        diesel::select(diesel::dsl::exists(co_creators.filter(email.eq(email_val))))
            .get_result(conn)
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        co_creator_id: Uuid,
    ) -> Result<Option<CoCreator>, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        co_creators
            .filter(id.eq(co_creator_id))
            .select(CoCreator::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_email(
        conn: &mut PgConnection,
        email_val: &str,
    ) -> Result<Option<CoCreator>, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        co_creators
            .filter(email.eq(email_val))
            .select(CoCreator::as_select())
            .first(conn)
            .optional()
    }

    pub fn find_by_token_hash(
        conn: &mut PgConnection,
        hash: &str,
    ) -> Result<Option<CoCreator>, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        co_creators
            .filter(auth_token_hash.eq(hash))
            .select(CoCreator::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(conn: &mut PgConnection) -> Result<Vec<CoCreator>, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        co_creators
            .order(name.asc())
            .select(CoCreator::as_select())
            .load(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_co_creator: &NewCoCreator,
    ) -> Result<CoCreator, diesel::result::Error> {
        diesel::insert_into(crate::schema::co_creators::table)
            .values(new_co_creator)
            .returning(CoCreator::as_returning())
            .get_result(conn)
    }

    pub fn set_token(
        conn: &mut PgConnection,
        co_creator_id: Uuid,
        hash: Option<String>,
        expires: Option<DateTime<Utc>>,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        diesel::update(co_creators.filter(id.eq(co_creator_id)))
            .set((auth_token_hash.eq(hash), token_expires_at.eq(expires)))
            .execute(conn)
    }

    pub fn delete_by_id(
        conn: &mut PgConnection,
        co_creator_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::co_creators::dsl::*;
        diesel::delete(co_creators.filter(id.eq(co_creator_id))).execute(conn)
    }
}

pub struct EventCoCreatorRepo;

impl EventCoCreatorRepo {
    pub fn find(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        co_creator_id_val: Uuid,
    ) -> Result<Option<EventCoCreator>, diesel::result::Error> {
        use crate::schema::event_co_creators::dsl::*;
        event_co_creators
            .filter(event_id.eq(event_id_val))
            .filter(co_creator_id.eq(co_creator_id_val))
            .select(EventCoCreator::as_select())
            .first(conn)
            .optional()
    }

    pub fn insert(
        conn: &mut PgConnection,
        link: &EventCoCreator,
    ) -> Result<EventCoCreator, diesel::result::Error> {
        diesel::insert_into(crate::schema::event_co_creators::table)
            .values(link)
            .returning(EventCoCreator::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        co_creator_id_val: Uuid,
        changes: &EventCoCreatorChangeset,
    ) -> Result<EventCoCreator, diesel::result::Error> {
        use crate::schema::event_co_creators::dsl::*;
        diesel::update(
            event_co_creators
                .filter(event_id.eq(event_id_val))
                .filter(co_creator_id.eq(co_creator_id_val)),
        )
        .set(changes)
        .returning(EventCoCreator::as_returning())
        .get_result(conn)
    }

    pub fn delete(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        co_creator_id_val: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::event_co_creators::dsl::*;
        diesel::delete(
            event_co_creators
                .filter(event_id.eq(event_id_val))
                .filter(co_creator_id.eq(co_creator_id_val)),
        )
        .execute(conn)
    }

    pub fn delete_for_co_creator(
        conn: &mut PgConnection,
        co_creator_id_val: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::event_co_creators::dsl::*;
        diesel::delete(event_co_creators.filter(co_creator_id.eq(co_creator_id_val)))
            .execute(conn)
    }

    /// Assignments of one co-creator with their events.
    pub fn list_events_for(
        conn: &mut PgConnection,
        co_creator_id_val: Uuid,
    ) -> Result<Vec<(EventCoCreator, Event)>, diesel::result::Error> {
        use crate::schema::{event_co_creators, events};
        event_co_creators::table
            .inner_join(events::table)
            .filter(event_co_creators::co_creator_id.eq(co_creator_id_val))
            .order(events::event_date.desc())
            .select((EventCoCreator::as_select(), Event::as_select()))
            .load(conn)
    }

    pub fn event_ids_for(
        conn: &mut PgConnection,
        co_creator_id_val: Uuid,
    ) -> Result<Vec<Uuid>, diesel::result::Error> {
        use crate::schema::event_co_creators::dsl::*;
        event_co_creators
            .filter(co_creator_id.eq(co_creator_id_val))
            .select(event_id)
            .load(conn)
    }

    /// Co-creators assigned to one event, for settlement splits.
    pub fn list_for_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<(EventCoCreator, CoCreator)>, diesel::result::Error> {
        use crate::schema::{co_creators, event_co_creators};
        event_co_creators::table
            .inner_join(co_creators::table)
            .filter(event_co_creators::event_id.eq(event_id_val))
            .order(co_creators::name.asc())
            .select((EventCoCreator::as_select(), CoCreator::as_select()))
            .load(conn)
    }
}
