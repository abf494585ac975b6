//! Audit log sink
//!
//! Append-only recorder of access attempts. A failure to write an audit
//! entry must never block or fail the access decision itself, so errors are
//! swallowed here and surfaced only to operational monitoring via logs.

use coursevault_core::models::NewAccessLog;
use coursevault_db::AccessLogRepositoryTrait;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuditLogSink {
    logs: Arc<dyn AccessLogRepositoryTrait>,
}

impl AuditLogSink {
    pub fn new(logs: Arc<dyn AccessLogRepositoryTrait>) -> Self {
        Self { logs }
    }

    /// Append one audit record. Fire-and-forget: errors are logged, not returned.
    pub async fn record(&self, entry: NewAccessLog) {
        let file_id = entry.file_id;
        if let Err(e) = self.logs.insert(entry).await {
            tracing::warn!(
                error = %e,
                file_id = %file_id,
                "Failed to write access log entry"
            );
        }
    }
}
