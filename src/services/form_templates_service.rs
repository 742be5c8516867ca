use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::models::api::{PageParams, error_codes},
    db::models::form_template::{
        AttachFormRequest, CreateFormTemplateRequest, EventFormLink, EventFormLinkWithTemplate,
        FormTemplate, FormTemplateChangeset, FormTemplateListQuery, NewEventFormLink,
        NewFormTemplate, UpdateFormTemplateRequest,
    },
    db::repositories::form_templates::{EventFormLinkRepo, FormTemplateRepo},
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    services::events_service::EventsService,
};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 200;

/// Copy of a template under a new name. Copies are never the default.
pub fn duplicate_of(source: &FormTemplate, created_by: Option<Uuid>) -> NewFormTemplate {
    NewFormTemplate {
        name: format!("Copy of {}", source.name),
        description: source.description.clone(),
        form_type: source.form_type,
        fields: source.fields.clone(),
        is_default: false,
        created_by,
    }
}

fn actor_user(ctx: &RequestContext) -> Option<Uuid> {
    Some(ctx.user_id).filter(|id| !id.is_nil())
}

pub struct FormTemplatesService;

impl FormTemplatesService {
    fn find(conn: &mut PgConnection, template_id: Uuid) -> Result<FormTemplate, AppError> {
        FormTemplateRepo::find_by_id(conn, template_id)?
            .ok_or_else(|| AppError::not_found("Form template"))
    }

    pub fn list(
        conn: &mut PgConnection,
        query: &FormTemplateListQuery,
    ) -> Result<(Vec<FormTemplate>, i64, i64, i64), AppError> {
        let (page, per_page, offset) = PageParams {
            page: query.page,
            per_page: query.per_page,
        }
        .resolve(DEFAULT_PER_PAGE, MAX_PER_PAGE);
        let (items, total) = FormTemplateRepo::list(conn, query.form_type, offset, per_page)?;
        Ok((items, total, page, per_page))
    }

    pub fn get(conn: &mut PgConnection, template_id: Uuid) -> Result<FormTemplate, AppError> {
        Self::find(conn, template_id)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateFormTemplateRequest,
    ) -> Result<FormTemplate, AppError> {
        let new_template = NewFormTemplate {
            name: req.name.trim().to_string(),
            description: req.description.clone(),
            form_type: req.form_type,
            fields: json!(req.fields),
            is_default: req.is_default,
            created_by: actor_user(ctx),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let template = FormTemplateRepo::insert(conn, &new_template)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "form_template",
                template.id,
                "created",
                None,
                Some(&json!({ "name": template.name, "form_type": template.form_type })),
            )?;
            Ok(template)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
        req: &UpdateFormTemplateRequest,
    ) -> Result<FormTemplate, AppError> {
        let before = Self::find(conn, template_id)?;
        if req.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        let changes = FormTemplateChangeset {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            description: req.description.clone(),
            form_type: req.form_type,
            fields: req.fields.as_ref().map(|f| json!(f)),
            is_default: req.is_default,
            updated_at: Some(Utc::now()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let template = FormTemplateRepo::update(conn, template_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "form_template",
                template_id,
                "updated",
                Some(&before),
                Some(req),
            )?;
            Ok(template)
        })
    }

    pub fn delete(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
    ) -> Result<(), AppError> {
        let before = Self::find(conn, template_id)?;
        if FormTemplateRepo::is_linked_to_live_event(conn, template_id)? {
            return Err(AppError::conflict_with_code(
                "Form template is attached to an active or draft event",
                None,
                error_codes::FORM_TEMPLATE_IN_USE,
            ));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            FormTemplateRepo::delete_by_id(conn, template_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "form_template",
                template_id,
                "deleted",
                Some(&json!({ "name": before.name })),
                None,
            )?;
            Ok(())
        })
    }

    pub fn duplicate(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
    ) -> Result<FormTemplate, AppError> {
        let source = Self::find(conn, template_id)?;
        let copy = duplicate_of(&source, actor_user(ctx));

        conn.transaction::<_, AppError, _>(|conn| {
            let template = FormTemplateRepo::insert(conn, &copy)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "form_template",
                template.id,
                "duplicated",
                None,
                Some(&json!({ "source_id": source.id, "name": template.name })),
            )?;
            Ok(template)
        })
    }

    pub fn event_forms(
        conn: &mut PgConnection,
        event_id: Uuid,
    ) -> Result<Vec<EventFormLinkWithTemplate>, AppError> {
        EventsService::find(conn, event_id)?;
        Ok(EventFormLinkRepo::list_for_event(conn, event_id)?
            .into_iter()
            .map(|(link, form_template)| EventFormLinkWithTemplate {
                link,
                form_template,
            })
            .collect())
    }

    pub fn attach(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        req: &AttachFormRequest,
    ) -> Result<EventFormLink, AppError> {
        EventsService::find(conn, event_id)?;
        Self::find(conn, req.form_template_id)?;
        if EventFormLinkRepo::exists(conn, event_id, req.form_template_id)? {
            return Err(AppError::conflict_with_code(
                "Form is already attached to this event",
                Some("form_template_id".to_string()),
                error_codes::FORM_ALREADY_ATTACHED,
            ));
        }

        conn.transaction::<_, AppError, _>(|conn| {
            let link = EventFormLinkRepo::insert(
                conn,
                &NewEventFormLink {
                    event_id,
                    form_template_id: req.form_template_id,
                    is_waiver: req.is_waiver,
                    sort_order: req.sort_order,
                },
            )?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "event",
                event_id,
                "form_attached",
                None,
                Some(&json!({ "link_id": link.id, "form_template_id": link.form_template_id })),
            )?;
            Ok(link)
        })
    }

    pub fn detach(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        event_id: Uuid,
        link_id: Uuid,
    ) -> Result<(), AppError> {
        conn.transaction::<_, AppError, _>(|conn| {
            if EventFormLinkRepo::delete_in_event(conn, event_id, link_id)? == 0 {
                return Err(AppError::not_found("Form link"));
            }
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "event",
                event_id,
                "form_detached",
                Some(&json!({ "link_id": link_id })),
                None,
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::FormType;

    #[test]
    fn test_duplicate_is_renamed_and_not_default() {
        let now = Utc::now();
        let source = FormTemplate {
            id: Uuid::new_v4(),
            name: "Liability Waiver".into(),
            description: Some("Signed on arrival".into()),
            form_type: FormType::Waiver,
            fields: json!([{ "name": "signature", "type": "text", "required": true }]),
            is_default: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        };
        let copy = duplicate_of(&source, None);
        assert_eq!(copy.name, "Copy of Liability Waiver");
        assert!(!copy.is_default);
        assert_eq!(copy.form_type, FormType::Waiver);
        assert_eq!(copy.fields, source.fields);
    }
}
