pub mod attendees;
pub mod auth;
pub mod co_creators;
pub mod dashboard;
pub mod events;
pub mod expenses;
pub mod form_templates;
pub mod health;
pub mod message_templates;
pub mod notifications;
pub mod portal;
pub mod register;
pub mod registrations;
pub mod scholarships;
pub mod settlements;
pub mod sms;
pub mod users;
pub mod webhooks;

use crate::AppState;
use crate::middleware::{auth::auth_middleware, rate_limit::rate_limit_middleware};
use crate::providers::storage::MAX_RECEIPT_BYTES;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, patch, post, put},
};
use std::sync::Arc;

/// Multipart overhead allowed on top of the receipt size cap.
const UPLOAD_SLACK_BYTES: usize = 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api = public_routes(state.clone()).merge(protected_routes(state.clone()));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/deep", get(health::deep_health))
        .nest("/api/v1", api)
        .with_state(state)
}

/// Routes reachable without a bearer token.
fn public_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // 报名接口按 IP 限流
    let limited = Router::new()
        .route("/register/:slug", post(register::register))
        .route("/register/:slug/group", post(register::register_group))
        .route_layer(from_fn_with_state(state, rate_limit_middleware));

    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/magic-link", post(auth::request_magic_link))
        .route("/auth/verify", get(auth::verify))
        .route("/admin/bootstrap", post(users::bootstrap_admin))
        .route("/register/:slug/info", get(register::info))
        .route("/register/:slug/success", get(register::success))
        .route("/register/:slug/cancelled", get(register::cancelled))
        .route("/register/:slug/cancel-request", post(register::cancel_request))
        .route("/webhooks/stripe", post(webhooks::stripe))
        .route("/webhooks/twilio/inbound", post(webhooks::twilio_inbound))
        .route(
            "/scholarship-links/validate/:code",
            get(scholarships::validate_code),
        )
        .route("/events/:event_id/recurring-dates", get(events::recurring_dates))
        .merge(limited)
}

/// Routes behind `auth_middleware`; role checks happen in the extractors.
fn protected_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let upload_limit = DefaultBodyLimit::max(MAX_RECEIPT_BYTES + UPLOAD_SLACK_BYTES);

    Router::new()
        .route("/auth/me", get(auth::me))
        // admin users
        .route("/admin/users", get(users::list_users).post(users::create_user))
        .route(
            "/admin/users/:user_id",
            patch(users::update_user).delete(users::delete_user),
        )
        // events
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/:event_id",
            get(events::get_event)
                .patch(events::update_event)
                .put(events::update_event)
                .delete(events::cancel_event),
        )
        .route(
            "/events/:event_id/sub-events",
            get(events::list_sub_events).post(events::create_sub_event),
        )
        .route(
            "/events/:event_id/sub-events/:sub_event_id",
            patch(events::update_sub_event).delete(events::delete_sub_event),
        )
        // registrations
        .route(
            "/events/:event_id/registrations",
            get(registrations::list_registrations),
        )
        .route(
            "/events/:event_id/registrations/manual",
            post(registrations::create_manual_registration),
        )
        .route(
            "/events/:event_id/registrations/export",
            get(registrations::export_registrations),
        )
        .route(
            "/registrations/:registration_id",
            get(registrations::get_registration).patch(registrations::update_registration),
        )
        .route(
            "/registrations/:registration_id/check-in",
            post(registrations::check_in).delete(registrations::undo_check_in),
        )
        // attendees & memberships
        .route("/attendees", get(attendees::list_attendees))
        .route("/admin/import-attendees", post(attendees::import_attendees))
        .route(
            "/attendees/:attendee_id",
            get(attendees::get_attendee).patch(attendees::update_attendee),
        )
        .route(
            "/memberships",
            get(attendees::list_memberships).post(attendees::create_membership),
        )
        .route(
            "/memberships/:membership_id",
            patch(attendees::update_membership).delete(attendees::deactivate_membership),
        )
        // scholarship links
        .route(
            "/scholarship-links",
            get(scholarships::list_links).post(scholarships::create_link),
        )
        .route("/scholarship-links/:link_id", delete(scholarships::deactivate_link))
        // event expenses
        .route(
            "/events/:event_id/expenses",
            get(expenses::list_expenses).post(expenses::create_expense),
        )
        .route(
            "/events/:event_id/expenses/:expense_id",
            patch(expenses::update_expense).delete(expenses::delete_expense),
        )
        .route(
            "/events/:event_id/expenses/:expense_id/receipt",
            post(expenses::upload_receipt).layer(upload_limit.clone()),
        )
        // operating expenses
        .route(
            "/operating-expenses",
            get(expenses::list_operating_expenses).post(expenses::create_operating_expense),
        )
        .route(
            "/operating-expenses/:expense_id",
            get(expenses::get_operating_expense)
                .patch(expenses::update_operating_expense)
                .delete(expenses::delete_operating_expense),
        )
        .route(
            "/operating-expenses/:expense_id/reimburse",
            put(expenses::reimburse_operating_expense),
        )
        .route(
            "/operating-expenses/:expense_id/receipt",
            post(expenses::upload_operating_receipt).layer(upload_limit),
        )
        // co-creators
        .route(
            "/co-creators",
            get(co_creators::list_co_creators).post(co_creators::create_co_creator),
        )
        .route(
            "/co-creators/:co_creator_id",
            get(co_creators::get_co_creator).delete(co_creators::delete_co_creator),
        )
        .route(
            "/co-creators/:co_creator_id/events",
            post(co_creators::assign_event),
        )
        .route(
            "/co-creators/:co_creator_id/events/:event_id",
            patch(co_creators::update_assignment).delete(co_creators::unassign_event),
        )
        .route(
            "/co-creators/:co_creator_id/invite",
            post(co_creators::invite_co_creator),
        )
        // co-creator portal
        .route("/portal/events", get(portal::list_events))
        .route("/portal/events/:event_id", get(portal::get_event))
        .route("/portal/events/:event_id/attendees", get(portal::list_attendees))
        .route(
            "/portal/events/:event_id/expenses",
            get(portal::list_expenses).post(portal::create_expense),
        )
        .route("/portal/events/:event_id/settlement", get(portal::get_settlement))
        // settlements
        .route(
            "/events/:event_id/settlements",
            get(settlements::latest_settlement).post(settlements::calculate_settlement),
        )
        .route(
            "/events/:event_id/settlements/history",
            get(settlements::settlement_history),
        )
        // notifications
        .route(
            "/events/:event_id/notifications/sms",
            post(notifications::sms_blast),
        )
        .route(
            "/events/:event_id/notifications/bulk",
            post(notifications::bulk_send),
        )
        .route("/notifications/log", get(notifications::notification_log))
        // message templates
        .route(
            "/message-templates",
            get(message_templates::list_templates).post(message_templates::create_template),
        )
        .route(
            "/message-templates/:template_id",
            get(message_templates::get_template)
                .patch(message_templates::update_template)
                .delete(message_templates::delete_template),
        )
        .route(
            "/message-templates/:template_id/preview",
            post(message_templates::preview_template),
        )
        // form templates
        .route(
            "/form-templates",
            get(form_templates::list_templates).post(form_templates::create_template),
        )
        .route(
            "/form-templates/:template_id",
            get(form_templates::get_template)
                .put(form_templates::update_template)
                .patch(form_templates::update_template)
                .delete(form_templates::delete_template),
        )
        .route(
            "/form-templates/:template_id/duplicate",
            post(form_templates::duplicate_template),
        )
        .route(
            "/events/:event_id/forms",
            get(form_templates::list_event_forms).post(form_templates::attach_form),
        )
        .route(
            "/events/:event_id/forms/:link_id",
            delete(form_templates::detach_form),
        )
        // sms inbox
        .route("/sms/conversations", get(sms::list_conversations))
        .route("/sms/conversations/:phone", get(sms::get_thread))
        .route("/sms/conversations/:phone/reply", post(sms::reply))
        // dashboard & audit
        .route("/dashboard/overview", get(dashboard::overview))
        .route("/dashboard/events/:event_id", get(dashboard::event_dashboard))
        .route("/audit-log", get(dashboard::audit_log))
        .route_layer(from_fn_with_state(state, auth_middleware))
}
