//! Anomaly detection over the audit trail
//!
//! Counts access attempts for a (principal, file) pair within a trailing
//! window and flags the pair once the count reaches the threshold. The
//! signal is advisory; whether it gates access is the facade's call
//! (`anomaly_enforce`).

use chrono::{Duration, Utc};
use coursevault_core::AppError;
use coursevault_db::AccessLogRepositoryTrait;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct AnomalyDetector {
    logs: Arc<dyn AccessLogRepositoryTrait>,
    window_secs: u64,
    threshold: i64,
}

impl AnomalyDetector {
    pub fn new(logs: Arc<dyn AccessLogRepositoryTrait>, window_secs: u64, threshold: i64) -> Self {
        Self {
            logs,
            window_secs,
            threshold,
        }
    }

    /// True when the (principal, file) pair has reached the threshold number
    /// of access attempts within the trailing window.
    pub async fn is_suspicious(&self, file_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
        let since = Utc::now() - Duration::seconds(self.window_secs as i64);
        let recent = self.logs.count_recent(file_id, user_id, since).await?;

        if recent >= self.threshold {
            tracing::warn!(
                user_id = %user_id,
                file_id = %file_id,
                recent_accesses = recent,
                threshold = self.threshold,
                "Suspicious activity detected"
            );
            return Ok(true);
        }

        Ok(false)
    }
}
