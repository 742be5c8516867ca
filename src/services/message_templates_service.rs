use std::collections::HashMap;

use chrono::Utc;
use diesel::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    db::models::communication::{
        CreateMessageTemplateRequest, MessageTemplate, MessageTemplateChangeset,
        MessageTemplateListQuery, NewMessageTemplate, PreviewTemplateRequest, TemplatePreview,
        UpdateMessageTemplateRequest,
    },
    db::repositories::communications::MessageTemplateRepo,
    error::AppError,
    services::audit_service::AuditService,
    services::context::RequestContext,
    utils::render_template,
};

/// Values used by the preview when the caller supplies none.
pub fn sample_variables() -> HashMap<String, String> {
    [
        ("first_name", "Jane"),
        ("last_name", "Doe"),
        ("email", "jane@example.com"),
        ("phone", "+14045551234"),
        ("event_name", "Emerging from Winter Retreat"),
        ("event_date", "March 15, 2026"),
        ("event_time", "2:00 PM"),
        ("meeting_point", "Main gate parking area"),
        ("cancel_url", "https://example.org/register/example/cancel?reg=abc123"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn preview(template: &MessageTemplate, overrides: &HashMap<String, String>) -> TemplatePreview {
    let mut vars = sample_variables();
    vars.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    TemplatePreview {
        rendered_subject: template
            .subject
            .as_deref()
            .map(|subject| render_template(subject, &vars)),
        rendered_body: render_template(&template.body, &vars),
    }
}

pub struct MessageTemplatesService;

impl MessageTemplatesService {
    fn find(conn: &mut PgConnection, template_id: Uuid) -> Result<MessageTemplate, AppError> {
        MessageTemplateRepo::find_by_id(conn, template_id)?
            .ok_or_else(|| AppError::not_found("Template"))
    }

    pub fn list(
        conn: &mut PgConnection,
        query: &MessageTemplateListQuery,
    ) -> Result<Vec<MessageTemplate>, AppError> {
        Ok(MessageTemplateRepo::list(conn, query.category)?)
    }

    pub fn get(conn: &mut PgConnection, template_id: Uuid) -> Result<MessageTemplate, AppError> {
        Self::find(conn, template_id)
    }

    pub fn create(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        req: &CreateMessageTemplateRequest,
    ) -> Result<MessageTemplate, AppError> {
        let new_template = NewMessageTemplate {
            name: req.name.trim().to_string(),
            category: req.category,
            channel: req.channel,
            subject: req.subject.clone(),
            body: req.body.clone(),
            variables: json!(req.variables),
            is_default: req.is_default,
            created_by: Some(ctx.user_id).filter(|id| !id.is_nil()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let template = MessageTemplateRepo::insert(conn, &new_template)?;
            AuditService::record_change::<Value, _>(
                conn,
                ctx,
                "message_template",
                template.id,
                "created",
                None,
                Some(&json!({ "name": template.name, "category": template.category })),
            )?;
            Ok(template)
        })
    }

    pub fn update(
        conn: &mut PgConnection,
        ctx: &RequestContext,
        template_id: Uuid,
        req: &UpdateMessageTemplateRequest,
    ) -> Result<MessageTemplate, AppError> {
        let before = Self::find(conn, template_id)?;
        if req.is_empty() {
            return Err(AppError::bad_request("No fields to update"));
        }
        let changes = MessageTemplateChangeset {
            name: req.name.as_ref().map(|n| n.trim().to_string()),
            category: req.category,
            channel: req.channel,
            subject: req.subject.clone(),
            body: req.body.clone(),
            variables: req.variables.as_ref().map(|v| json!(v)),
            is_default: req.is_default,
            updated_at: Some(Utc::now()),
        };

        conn.transaction::<_, AppError, _>(|conn| {
            let template = MessageTemplateRepo::update(conn, template_id, &changes)?;
            AuditService::record_change(
                conn,
                ctx,
                "message_template",
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
        conn.transaction::<_, AppError, _>(|conn| {
            MessageTemplateRepo::delete_by_id(conn, template_id)?;
            AuditService::record_change::<_, Value>(
                conn,
                ctx,
                "message_template",
                template_id,
                "deleted",
                Some(&json!({ "name": before.name })),
                None,
            )?;
            Ok(())
        })
    }

    pub fn preview(
        conn: &mut PgConnection,
        template_id: Uuid,
        req: &PreviewTemplateRequest,
    ) -> Result<TemplatePreview, AppError> {
        let template = Self::find(conn, template_id)?;
        Ok(preview(&template, &req.sample_data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::{TemplateCategory, TemplateChannel};

    fn template(subject: Option<&str>, body: &str) -> MessageTemplate {
        let now = Utc::now();
        MessageTemplate {
            id: Uuid::new_v4(),
            name: "Reminder".into(),
            category: TemplateCategory::Reminder,
            channel: TemplateChannel::Both,
            subject: subject.map(str::to_string),
            body: body.into(),
            variables: json!(["first_name"]),
            is_default: false,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_preview_uses_sample_data() {
        let t = template(Some("{{event_name}} tomorrow"), "Hi {{first_name}} {{last_name}}!");
        let out = preview(&t, &HashMap::new());
        assert_eq!(out.rendered_body, "Hi Jane Doe!");
        assert_eq!(
            out.rendered_subject.as_deref(),
            Some("Emerging from Winter Retreat tomorrow")
        );
    }

    #[test]
    fn test_preview_overrides_and_unknown_placeholders() {
        let t = template(None, "Hi {{first_name}}, code {{promo_code}}");
        let mut overrides = HashMap::new();
        overrides.insert("first_name".to_string(), "River".to_string());
        let out = preview(&t, &overrides);
        assert_eq!(out.rendered_body, "Hi River, code {{promo_code}}");
        assert_eq!(out.rendered_subject, None);
    }
}
