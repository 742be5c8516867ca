use crate::db::enums::FormType;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::form_templates)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FormTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub form_type: FormType,
    pub fields: serde_json::Value,
    pub is_default: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::form_templates)]
pub struct NewFormTemplate {
    pub name: String,
    pub description: Option<String>,
    pub form_type: FormType,
    pub fields: serde_json::Value,
    pub is_default: bool,
    pub created_by: Option<Uuid>,
}

#[derive(AsChangeset, Default, Debug)]
#[diesel(table_name = crate::schema::form_templates)]
pub struct FormTemplateChangeset {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub form_type: Option<FormType>,
    pub fields: Option<serde_json::Value>,
    pub is_default: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Clone, Debug)]
#[diesel(table_name = crate::schema::event_form_links)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventFormLink {
    pub id: Uuid,
    pub event_id: Uuid,
    pub form_template_id: Uuid,
    pub is_waiver: bool,
    pub sort_order: i32,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::event_form_links)]
pub struct NewEventFormLink {
    pub event_id: Uuid,
    pub form_template_id: Uuid,
    pub is_waiver: bool,
    pub sort_order: i32,
}

#[derive(Serialize, Debug, Clone)]
pub struct EventFormLinkWithTemplate {
    #[serde(flatten)]
    pub link: EventFormLink,
    pub form_template: FormTemplate,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FormTemplateListQuery {
    pub form_type: Option<FormType>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct CreateFormTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    pub description: Option<String>,
    pub form_type: FormType,

    #[serde(default)]
    pub fields: Vec<serde_json::Value>,

    #[serde(default)]
    pub is_default: bool,
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone, Default)]
pub struct UpdateFormTemplateRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "crate::db::models::api::nullable", skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,

    pub form_type: Option<FormType>,
    pub fields: Option<Vec<serde_json::Value>>,
    pub is_default: Option<bool>,
}

impl UpdateFormTemplateRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.form_type.is_none()
            && self.fields.is_none()
            && self.is_default.is_none()
    }
}

#[derive(Deserialize, Serialize, Validate, Debug, Clone)]
pub struct AttachFormRequest {
    pub form_template_id: Uuid,
    #[serde(default)]
    pub is_waiver: bool,
    #[serde(default)]
    pub sort_order: i32,
}
