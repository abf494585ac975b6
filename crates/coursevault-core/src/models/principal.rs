use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::file::Role;

/// The requesting principal, as resolved by the upstream identity layer.
///
/// The role arrives as a value with the request; this subsystem never
/// derives it from user attributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Principal {
    /// None for anonymous principals
    pub user_id: Option<Uuid>,
    pub role: Role,
}

impl Principal {
    pub fn authenticated(user_id: Uuid, role: Role) -> Self {
        Self {
            user_id: Some(user_id),
            role,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Client request context captured for audit logging
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub ip_address: String,
    pub user_agent: String,
    pub referer: Option<String>,
}

impl ClientContext {
    /// Context for callers that don't go through HTTP (tests, jobs)
    pub fn internal() -> Self {
        Self {
            ip_address: "127.0.0.1".to_string(),
            user_agent: "internal".to_string(),
            referer: None,
        }
    }
}
