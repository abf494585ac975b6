//! Periodic expiry sweep for upload sessions
//!
//! Open sessions are also cancelled lazily on next touch; the sweep keeps
//! the table from accumulating dead sessions that nobody touches again.
//! The interval is a deployment parameter, not a protocol requirement.

use coursevault_db::UploadSessionRepositoryTrait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[derive(Clone)]
pub struct SessionSweeper {
    sessions: Arc<dyn UploadSessionRepositoryTrait>,
    interval_secs: u64,
}

impl SessionSweeper {
    pub fn new(sessions: Arc<dyn UploadSessionRepositoryTrait>, interval_secs: u64) -> Self {
        Self {
            sessions,
            interval_secs,
        }
    }

    /// Start the background sweep. Returns None when disabled
    /// (interval of 0), otherwise a JoinHandle for graceful shutdown.
    pub fn start(self) -> Option<tokio::task::JoinHandle<()>> {
        if self.interval_secs == 0 {
            tracing::info!("Upload session sweep disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut sweep_interval = interval(Duration::from_secs(self.interval_secs));

            loop {
                sweep_interval.tick().await;

                match self.sessions.cancel_expired().await {
                    Ok(0) => {}
                    Ok(cancelled) => {
                        tracing::info!(cancelled, "Cancelled expired upload sessions");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Upload session sweep failed");
                    }
                }
            }
        }))
    }
}
