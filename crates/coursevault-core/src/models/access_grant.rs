use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Action a grant can authorize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "access_action", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    Read,
    Download,
    Stream,
    Edit,
}

impl std::fmt::Display for AccessAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessAction::Read => write!(f, "read"),
            AccessAction::Download => write!(f, "download"),
            AccessAction::Stream => write!(f, "stream"),
            AccessAction::Edit => write!(f, "edit"),
        }
    }
}

impl std::str::FromStr for AccessAction {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "read" => Ok(AccessAction::Read),
            "download" => Ok(AccessAction::Download),
            "stream" => Ok(AccessAction::Stream),
            "edit" => Ok(AccessAction::Edit),
            other => Err(crate::AppError::InvalidInput(format!(
                "Unknown access action: {}",
                other
            ))),
        }
    }
}

/// Explicit per-user, per-action permission record layered on top of tier
/// checks. At most one grant exists per (file, user, action); re-granting
/// updates the existing row. Grants also carry the usage counter that backs
/// per-file download quotas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct AccessGrant {
    pub id: Uuid,
    pub file_id: Uuid,
    pub user_id: Uuid,
    pub access_type: AccessAction,
    pub granted_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub granted_by: Uuid,
    pub access_count: i32,
    pub last_accessed: Option<DateTime<Utc>>,
}

impl AccessGrant {
    /// Check if the grant has expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_grant_expiry() {
        let now = Utc::now();
        let mut grant = AccessGrant {
            id: Uuid::new_v4(),
            file_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            access_type: AccessAction::Download,
            granted_at: now,
            expires_at: None,
            granted_by: Uuid::new_v4(),
            access_count: 0,
            last_accessed: None,
        };
        assert!(!grant.is_expired(now));

        grant.expires_at = Some(now - Duration::minutes(1));
        assert!(grant.is_expired(now));

        grant.expires_at = Some(now + Duration::minutes(1));
        assert!(!grant.is_expired(now));
    }

    #[test]
    fn test_access_action_parse_roundtrip() {
        for action in [
            AccessAction::Read,
            AccessAction::Download,
            AccessAction::Stream,
            AccessAction::Edit,
        ] {
            let parsed: AccessAction = action.to_string().parse().unwrap();
            assert_eq!(parsed, action);
        }
        assert!("execute".parse::<AccessAction>().is_err());
    }
}
