pub mod attendees_service;
pub mod audit_service;
pub mod co_creators_service;
pub mod context;
pub mod dashboard_service;
pub mod eta;
pub mod events_service;
pub mod expenses_service;
pub mod form_templates_service;
pub mod message_templates_service;
pub mod notifications_service;
pub mod pricing;
pub mod recurrence;
pub mod registration_service;
pub mod registrations_service;
pub mod scholarships_service;
pub mod session_service;
pub mod settlements_service;
pub mod sms_conversations_service;
pub mod sub_events_service;
pub mod users_service;
pub mod webhooks_service;

pub use audit_service::AuditService;
pub use events_service::EventsService;
pub use registration_service::RegistrationService;
pub use session_service::SessionService;
