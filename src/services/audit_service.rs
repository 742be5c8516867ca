use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::models::audit::{AuditLog, NewAuditLog},
    db::repositories::audit::AuditRepo,
    error::AppError,
    services::context::RequestContext,
};

pub struct AuditService;

impl AuditService {
    pub fn record(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
    ) -> Result<AuditLog, AppError> {
        let entry = NewAuditLog::new(entity_type, entity_id, action, &ctx.actor);
        Ok(AuditRepo::insert(conn, &entry)?)
    }

    /// Records a change with serialized before/after snapshots.
    pub fn record_change<O: Serialize, N: Serialize>(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        entity_type: &str,
        entity_id: Uuid,
        action: &str,
        old: Option<&O>,
        new: Option<&N>,
    ) -> Result<AuditLog, AppError> {
        let old_value = old.map(serde_json::to_value).transpose().map_err(|e| {
            AppError::internal(format!("failed to serialize audit value: {}", e))
        })?;
        let new_value = new.map(serde_json::to_value).transpose().map_err(|e| {
            AppError::internal(format!("failed to serialize audit value: {}", e))
        })?;
        let entry = NewAuditLog::new(entity_type, entity_id, action, &ctx.actor)
            .with_values(old_value, new_value);
        Ok(AuditRepo::insert(conn, &entry)?)
    }

    pub fn list(
        conn: &mut PgConnection,
        entity_type: Option<&str>,
        entity_id: Option<Uuid>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<AuditLog>, i64), AppError> {
        Ok(AuditRepo::list(conn, entity_type, entity_id, offset, limit)?)
    }
}
