// Sub-modules organized by functional domain
pub mod api;
pub mod attendee;
pub mod audit;
pub mod auth;
pub mod co_creator;
pub mod communication;
pub mod dashboard;
pub mod event;
pub mod expense;
pub mod form_template;
pub mod registration;
pub mod scholarship;
pub mod settlement;

// API response structures
pub use api::*;

// Users, principals and auth DTOs
pub use auth::*;

pub use attendee::*;
pub use audit::*;
pub use co_creator::*;
pub use communication::*;
pub use dashboard::*;
pub use event::*;
pub use expense::*;
pub use form_template::*;
pub use registration::*;
pub use scholarship::*;
pub use settlement::*;
