use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::models::api::error_codes,
    db::models::scholarship::{
        CreateScholarshipRequest, NewScholarshipLink, ScholarshipLink, ScholarshipValidation,
    },
    db::repositories::scholarships::ScholarshipRepo,
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
    utils::tokens::generate_code,
};

pub const GENERATED_CODE_LEN: usize = 8;

/// What the public validation endpoint reports for a code.
pub fn describe(link: Option<&ScholarshipLink>) -> ScholarshipValidation {
    match link {
        Some(link) => ScholarshipValidation {
            valid: link.remaining_uses() > 0,
            event_id: Some(link.event_id),
            scholarship_price_cents: Some(link.scholarship_price_cents),
            remaining_uses: link.remaining_uses(),
        },
        None => ScholarshipValidation {
            valid: false,
            event_id: None,
            scholarship_price_cents: None,
            remaining_uses: 0,
        },
    }
}

pub struct ScholarshipsService;

impl ScholarshipsService {
    pub fn list(
        conn: &mut PgConnection,
        event_id: Option<Uuid>,
    ) -> Result<Vec<ScholarshipLink>, AppError> {
        Ok(ScholarshipRepo::list(conn, event_id)?)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateScholarshipRequest,
    ) -> Result<ScholarshipLink, AppError> {
        EventsService::find(conn, req.event_id)?;

        let code = match req.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => code.to_string(),
            None => loop {
                let candidate = generate_code(GENERATED_CODE_LEN);
                if !ScholarshipRepo::exists_by_code(conn, &candidate)? {
                    break candidate;
                }
            },
        };
        if ScholarshipRepo::exists_by_code(conn, &code)? {
            return Err(AppError::conflict_with_code(
                format!("Scholarship code '{}' already exists", code),
                Some("code".to_string()),
                error_codes::SCHOLARSHIP_CODE_EXISTS,
            ));
        }

        let new_link = NewScholarshipLink {
            event_id: req.event_id,
            attendee_id: req.attendee_id,
            code,
            scholarship_price_cents: req.scholarship_price_cents,
            stripe_coupon_id: req.stripe_coupon_id.clone(),
            max_uses: req.max_uses,
            created_by: Some(ctx.user_id).filter(|id| !id.is_nil()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let link = ScholarshipRepo::insert(conn, &new_link)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "scholarship_link",
                link.id,
                "created",
                None,
                Some(&link),
            )?;
            Ok(link)
        })
    }

    /// Exhausts the link (`max_uses = uses`); the row is kept.
    pub fn deactivate(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        link_id: Uuid,
    ) -> Result<ScholarshipLink, AppError> {
        let before = ScholarshipRepo::find_by_id(conn, link_id)?
            .ok_or_else(|| AppError::not_found("Scholarship link"))?;

        conn.transaction::<_, AppError, _>(|conn| {
            let link = ScholarshipRepo::deactivate(conn, link_id)?;
            AuditService::record_change(
                conn,
                ctx,
                "scholarship_link",
                link_id,
                "deactivated",
                Some(&json!({ "max_uses": before.max_uses })),
                Some(&json!({ "max_uses": link.max_uses })),
            )?;
            Ok(link)
        })
    }

    pub fn validate(conn: &mut PgConnection, code: &str) -> Result<ScholarshipValidation, AppError> {
        let link = ScholarshipRepo::find_by_code(conn, code.trim())?;
        Ok(describe(link.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn link(max_uses: i32, uses: i32) -> ScholarshipLink {
        ScholarshipLink {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            attendee_id: None,
            code: "SUNRISE8".into(),
            scholarship_price_cents: 3000,
            stripe_coupon_id: None,
            max_uses,
            uses,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_describe() {
        let usable = link(3, 1);
        let out = describe(Some(&usable));
        assert!(out.valid);
        assert_eq!(out.remaining_uses, 2);
        assert_eq!(out.scholarship_price_cents, Some(3000));

        let spent = describe(Some(&link(1, 1)));
        assert!(!spent.valid);
        assert_eq!(spent.remaining_uses, 0);

        let unknown = describe(None);
        assert!(!unknown.valid);
        assert_eq!(unknown.event_id, None);
    }
}
