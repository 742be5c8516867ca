pub mod attendees;
pub mod audit;
pub mod co_creators;
pub mod communications;
pub mod events;
pub mod expenses;
pub mod form_templates;
pub mod registrations;
pub mod scholarships;
pub mod settlements;
pub mod users;
