use diesel::prelude::*;
use uuid::Uuid;

use crate::db::models::audit::{AuditLog, NewAuditLog};

pub struct AuditRepo;

impl AuditRepo {
    pub fn insert(
        conn: &mut PgConnection,
        entry: &NewAuditLog,
    ) -> Result<AuditLog, diesel::result::Error> {
        diesel::insert_into(crate::schema::audit_log::table)
            .values(entry)
            .returning(AuditLog::as_returning())
            .get_result(conn)
    }

    pub fn list(
        conn: &mut PgConnection,
        entity_type_val: Option<&str>,
        entity_id_val: Option<Uuid>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<AuditLog>, i64), diesel::result::Error> {
        use crate::schema::audit_log::dsl::*;

        let build = || {
            let mut query = audit_log.into_boxed();
            if let Some(t) = entity_type_val {
                query = query.filter(entity_type.eq(t));
            }
            if let Some(eid) = entity_id_val {
                query = query.filter(entity_id.eq(eid));
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(created_at.desc())
            .offset(offset)
            .limit(limit)
            .select(AuditLog::as_select())
            .load(conn)?;
        Ok((items, total))
    }
}
