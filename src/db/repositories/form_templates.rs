use diesel::prelude::*;
use uuid::Uuid;

use crate::db::enums::{EventStatus, FormType};
use crate::db::models::form_template::{
    EventFormLink, FormTemplate, FormTemplateChangeset, NewEventFormLink, NewFormTemplate,
};

pub struct FormTemplateRepo;

impl FormTemplateRepo {
    pub fn find_by_id(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<Option<FormTemplate>, diesel::result::Error> {
        use crate::schema::form_templates::dsl::*;
        form_templates
            .filter(id.eq(template_id))
            .select(FormTemplate::as_select())
            .first(conn)
            .optional()
    }

    pub fn list(
        conn: &mut PgConnection,
        form_type_val: Option<FormType>,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<FormTemplate>, i64), diesel::result::Error> {
        use crate::schema::form_templates::dsl::*;

        let build = || {
            let mut query = form_templates.into_boxed();
            if let Some(t) = form_type_val {
                query = query.filter(form_type.eq(t));
            }
            query
        };

        let total: i64 = build().count().get_result(conn)?;
        let items = build()
            .order(name.asc())
            .offset(offset)
            .limit(limit)
            .select(FormTemplate::as_select())
            .load(conn)?;
        Ok((items, total))
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_template: &NewFormTemplate,
    ) -> Result<FormTemplate, diesel::result::Error> {
        diesel::insert_into(crate::schema::form_templates::table)
            .values(new_template)
            .returning(FormTemplate::as_returning())
            .get_result(conn)
    }

    pub fn update(
        conn: &mut PgConnection,
        template_id: Uuid,
        changes: &FormTemplateChangeset,
    ) -> Result<FormTemplate, diesel::result::Error> {
        use crate::schema::form_templates::dsl::*;
        diesel::update(form_templates.filter(id.eq(template_id)))
            .set(changes)
            .returning(FormTemplate::as_returning())
            .get_result(conn)
    }

    pub fn delete_by_id(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::form_templates::dsl::*;
        diesel::delete(form_templates.filter(id.eq(template_id))).execute(conn)
    }

    /// Whether any draft or active event still links this template.
    pub fn is_linked_to_live_event(
        conn: &mut PgConnection,
        template_id: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::{event_form_links as efl, events as e};
        diesel::select(diesel::dsl::exists(
            efl::table
                .inner_join(e::table)
                .filter(efl::form_template_id.eq(template_id))
                .filter(e::status.eq_any([EventStatus::Active, EventStatus::Draft])),
        ))
        .get_result(conn)
    }
}

pub struct EventFormLinkRepo;

impl EventFormLinkRepo {
    pub fn exists(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        template_id: Uuid,
    ) -> Result<bool, diesel::result::Error> {
        use crate::schema::event_form_links::dsl::*;
        diesel::select(diesel::dsl::exists(
            event_form_links
                .filter(event_id.eq(event_id_val))
                .filter(form_template_id.eq(template_id)),
        ))
        .get_result(conn)
    }

    pub fn insert(
        conn: &mut PgConnection,
        new_link: &NewEventFormLink,
    ) -> Result<EventFormLink, diesel::result::Error> {
        diesel::insert_into(crate::schema::event_form_links::table)
            .values(new_link)
            .returning(EventFormLink::as_returning())
            .get_result(conn)
    }

    pub fn list_for_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
    ) -> Result<Vec<(EventFormLink, FormTemplate)>, diesel::result::Error> {
        use crate::schema::{event_form_links as efl, form_templates as ft};
        efl::table
            .inner_join(ft::table)
            .filter(efl::event_id.eq(event_id_val))
            .order(efl::sort_order.asc())
            .select((EventFormLink::as_select(), FormTemplate::as_select()))
            .load(conn)
    }

    pub fn delete_in_event(
        conn: &mut PgConnection,
        event_id_val: Uuid,
        link_id: Uuid,
    ) -> Result<usize, diesel::result::Error> {
        use crate::schema::event_form_links::dsl::*;
        diesel::delete(
            event_form_links
                .filter(id.eq(link_id))
                .filter(event_id.eq(event_id_val)),
        )
        .execute(conn)
    }
}
