use uuid::Uuid;

use crate::db::models::auth::{Principal, StaffUser};

/// Caller identity handed to services that write the audit log.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub actor: String,
    pub is_admin: bool,
}

impl RequestContext {
    /// Context for work done by webhooks and the scheduler.
    pub fn system(actor: &str) -> Self {
        Self {
            user_id: Uuid::nil(),
            actor: actor.to_string(),
            is_admin: false,
        }
    }
}

impl From<&StaffUser> for RequestContext {
    fn from(user: &StaffUser) -> Self {
        Self {
            user_id: user.id,
            actor: user.email.clone(),
            is_admin: user.is_admin(),
        }
    }
}

impl From<&Principal> for RequestContext {
    fn from(principal: &Principal) -> Self {
        Self {
            user_id: principal.id(),
            actor: principal.actor(),
            is_admin: principal.is_admin(),
        }
    }
}
