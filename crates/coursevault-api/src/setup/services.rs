//! Repository and service wiring

use crate::state::AppState;
use anyhow::Result;
use coursevault_core::Config;
use coursevault_db::{
    AccessGrantRepository, AccessGrantRepositoryTrait, AccessLogRepository,
    AccessLogRepositoryTrait, FileRepository, FileRepositoryTrait, UploadSessionRepository,
    UploadSessionRepositoryTrait,
};
use coursevault_services::{
    AnomalyDetector, FileAccessService, SessionSweeper, UploadSessionManager,
};
use coursevault_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Build repositories, services, and the facade into the shared AppState.
/// Also starts the background session sweep.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let files: Arc<dyn FileRepositoryTrait> = Arc::new(FileRepository::new(pool.clone()));
    let grants: Arc<dyn AccessGrantRepositoryTrait> =
        Arc::new(AccessGrantRepository::new(pool.clone()));
    let logs: Arc<dyn AccessLogRepositoryTrait> = Arc::new(AccessLogRepository::new(pool.clone()));
    let sessions: Arc<dyn UploadSessionRepositoryTrait> =
        Arc::new(UploadSessionRepository::new(pool.clone()));

    let uploads = Arc::new(UploadSessionManager::new(
        sessions.clone(),
        files.clone(),
        storage.clone(),
        config.upload_token_secret.as_bytes().to_vec(),
        config.max_upload_size_bytes,
        config.upload_session_ttl_secs,
    ));

    let anomaly = AnomalyDetector::new(
        logs.clone(),
        config.anomaly_window_secs,
        config.anomaly_threshold,
    );

    let facade = FileAccessService::new(
        files,
        grants,
        logs,
        storage,
        uploads,
        anomaly,
        config.signed_url_ttl_secs,
        config.signed_url_max_ttl_secs,
        config.grant_default_expiry_days,
        config.anomaly_enforce,
    );

    // Background sweep for dead upload sessions; lazy expiry still applies
    SessionSweeper::new(sessions, config.upload_session_sweep_interval_secs).start();

    Ok(Arc::new(AppState { pool, facade }))
}
