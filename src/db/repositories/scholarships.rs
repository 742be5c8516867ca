use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::scholarship::{NewScholarshipLink, ScholarshipLink};

pub struct ScholarshipRepo;

impl ScholarshipRepo {
    pub fn exists_by_code(
        conn: &mut PgConnection,
        code_val: &str,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        diesel::select(diesel::dsl::exists(scholarship_links.filter(code.eq(code_val))))
            .get_result(conn)
    }

    pub fn find_by_code(
        conn: &mut PgConnection,
        code_val: &str,
    ) -> Result<Option<ScholarshipLink>, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        scholarship_links
            .filter(code.eq(code_val))
            .select(ScholarshipLink::as_select())
            .first(conn)
            .optional()
    }

    /// Locks the link row so concurrent registrations cannot overspend it.
    pub fn find_by_code_for_update(
        conn: &mut PgConnection,
        code_val: &str,
    ) -> Result<Option<ScholarshipLink>, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        scholarship_links
            .filter(code.eq(code_val))
            .select(ScholarshipLink::as_select())
            .for_update()
            .first(conn)
            .optional()
    }

    pub fn find_by_id(
        conn: &mut PgConnection,
        link_id: Uuid,
    ) -> Result<Option<ScholarshipLink>, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        scholarship_links
            .filter(id.eq(link_id))
            .select(ScholarshipLink::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        event_id_val: Option<Uuid>,
    ) -> Result<Vec<ScholarshipLink>, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        let mut query = scholarship_links.into_boxed();
        if let Some(eid) = event_id_val {
            query = query.filter(event_id.eq(eid));
        }
        query
            .order(created_at.desc())
            .select(ScholarshipLink::as_select())
            .load(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_link: &NewScholarshipLink,
    ) -> Result<ScholarshipLink, diesel::result::Error> {
        diesel::insert_into(crate::schema::scholarship_links::table)
            .values(new_link)
            .returning(ScholarshipLink::as_returning())
            .get_result(conn)
    }

    pub fn increment_uses(
        conn: &mut PgConnection,
        link_id: Uuid,
        by: i32,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        diesel::update(scholarship_links.filter(id.eq(link_id)))
            .set(uses.eq(uses + by))
            .execute(conn)
    }

    /// Exhausts the link without deleting it.
    pub fn deactivate(
        conn: &mut PgConnection,
        link_id: Uuid,
    ) -> Result<ScholarshipLink, diesel::result::Error> {
        use crate::schema::scholarship_links::dsl::*;
        diesel::update(scholarship_links.filter(id.eq(link_id)))
            .set(max_uses.eq(uses))
            .returning(ScholarshipLink::as_returning())
            .get_result(conn)
    }
}
