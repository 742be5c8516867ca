use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::settlement::{EventSettlement, NewEventSettlement};

pub struct SettlementRepo;

impl SettlementRepo {
    pub fn latest_for_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Option<EventSettlement>, diesel::result::Error> {
        use crate::schema::event_settlements::dsl::*;
        event_settlements
            .filter(event_id.eq(event_id_val))
            .order(version.desc())
            .select(EventSettlement::as_select())
            .first(conn)
            .optional()
    }

    pub fn history(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<EventSettlement>, diesel::result::Error> {
        use crate::schema::event_settlements::dsl::*;
        event_settlements
            .filter(event_id.eq(event_id_val))
            .order(version.desc())
            .select(EventSettlement::as_select())
            .load(conn)
    }

    pub fn max_version(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<i32, diesel::result::Error> {
        use crate::schema::event_settlements::dsl::*;
        let max: Option<i32> = event_settlements
            .filter(event_id.eq(event_id_val))
            .select(diesel::dsl::max(version))
            .first(conn)?;
        Ok(max.unwrap_or(0))
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_settlement: &NewEventSettlement,
    ) -> Result<EventSettlement, diesel::result::Error> {
        diesel::insert_into(crate::schema::event_settlements::table)
            .values(new_settlement)
            .returning(EventSettlement::as_returning())
            .get_result(conn)
    }
}
