use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::access_grant::AccessAction;

/// Audited action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "log_action", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum LogAction {
    View,
    Download,
    Stream,
    Upload,
    Delete,
}

impl From<AccessAction> for LogAction {
    fn from(action: AccessAction) -> Self {
        match action {
            AccessAction::Download => LogAction::Download,
            AccessAction::Stream => LogAction::Stream,
            // Reads and edits surface as views in the audit trail
            AccessAction::Read | AccessAction::Edit => LogAction::View,
        }
    }
}

/// Append-only audit record of one access attempt (success or failure).
/// Never mutated or deleted by normal operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AccessLogEntry {
    pub id: Uuid,
    pub file_id: Uuid,
    /// None for anonymous principals (public-tier access)
    pub user_id: Option<Uuid>,
    pub action: LogAction,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub response_code: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub duration_ms: Option<i32>,
}

/// Input for appending an audit record (id and timestamp are assigned on insert)
#[derive(Debug, Clone)]
pub struct NewAccessLog {
    pub file_id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: LogAction,
    pub ip_address: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub response_code: Option<i32>,
    pub duration_ms: Option<i32>,
}

impl NewAccessLog {
    /// Successful attempt with a 200 response code
    pub fn success(
        file_id: Uuid,
        user_id: Option<Uuid>,
        action: LogAction,
        ip_address: String,
        user_agent: String,
        referer: Option<String>,
    ) -> Self {
        Self {
            file_id,
            user_id,
            action,
            ip_address,
            user_agent,
            referer,
            success: true,
            error_message: None,
            response_code: Some(200),
            duration_ms: None,
        }
    }

    /// Failed attempt with the denial/error detail and a 403 response code
    pub fn failure(
        file_id: Uuid,
        user_id: Option<Uuid>,
        action: LogAction,
        ip_address: String,
        user_agent: String,
        referer: Option<String>,
        error_message: String,
    ) -> Self {
        Self {
            file_id,
            user_id,
            action,
            ip_address,
            user_agent,
            referer,
            success: false,
            error_message: Some(error_message),
            response_code: Some(403),
            duration_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_action_from_access_action() {
        assert_eq!(LogAction::from(AccessAction::Download), LogAction::Download);
        assert_eq!(LogAction::from(AccessAction::Stream), LogAction::Stream);
        assert_eq!(LogAction::from(AccessAction::Read), LogAction::View);
        assert_eq!(LogAction::from(AccessAction::Edit), LogAction::View);
    }

    #[test]
    fn test_new_access_log_constructors() {
        let file_id = Uuid::new_v4();
        let entry = NewAccessLog::success(
            file_id,
            None,
            LogAction::Stream,
            "127.0.0.1".to_string(),
            "test-agent".to_string(),
            None,
        );
        assert!(entry.success);
        assert_eq!(entry.response_code, Some(200));
        assert!(entry.error_message.is_none());

        let entry = NewAccessLog::failure(
            file_id,
            Some(Uuid::new_v4()),
            LogAction::Download,
            "127.0.0.1".to_string(),
            "test-agent".to_string(),
            None,
            "quota_exceeded".to_string(),
        );
        assert!(!entry.success);
        assert_eq!(entry.response_code, Some(403));
        assert_eq!(entry.error_message.as_deref(), Some("quota_exceeded"));
    }
}
