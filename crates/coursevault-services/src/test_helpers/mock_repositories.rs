//! Mock repository and storage implementations for testing
//!
//! These mocks allow exercising the facade and upload manager without a
//! database or object store. The upload-session mock claims sessions under
//! a mutex, so the single-use transition behaves like the conditional
//! update in PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursevault_core::models::{
    AccessAction, AccessGrant, AccessLevel, AccessLogEntry, FileType, NewAccessLog, StoredFile,
    UploadSession, UploadStatus,
};
use coursevault_core::{AppError, StorageBackend};
use coursevault_db::{
    AccessGrantRepositoryTrait, AccessLogRepositoryTrait, FileRepositoryTrait,
    UploadSessionRepositoryTrait,
};
use coursevault_storage::{Storage, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Mock file repository
#[derive(Clone, Default)]
pub struct MockFileRepository {
    files: Arc<Mutex<HashMap<Uuid, StoredFile>>>,
}

impl MockFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, file: StoredFile) {
        self.files.lock().unwrap().insert(file.id, file);
    }

    pub fn count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl FileRepositoryTrait for MockFileRepository {
    async fn create(&self, file: &StoredFile) -> Result<(), AppError> {
        self.files.lock().unwrap().insert(file.id, file.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredFile>, AppError> {
        Ok(self.files.lock().unwrap().get(&id).cloned())
    }

    async fn list_by_uploader(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError> {
        let mut files: Vec<StoredFile> = self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.uploaded_by == user_id && f.is_active)
            .cloned()
            .collect();
        files.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(files)
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let mut files = self.files.lock().unwrap();
        match files.get_mut(&id) {
            Some(file) => {
                file.is_active = false;
                file.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Mock access grant repository
#[derive(Clone, Default)]
pub struct MockGrantRepository {
    grants: Arc<Mutex<HashMap<(Uuid, Uuid, AccessAction), AccessGrant>>>,
}

impl MockGrantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, grant: AccessGrant) {
        self.grants
            .lock()
            .unwrap()
            .insert((grant.file_id, grant.user_id, grant.access_type), grant);
    }

    pub fn usage_count(&self, file_id: Uuid, user_id: Uuid, action: AccessAction) -> Option<i32> {
        self.grants
            .lock()
            .unwrap()
            .get(&(file_id, user_id, action))
            .map(|g| g.access_count)
    }
}

#[async_trait]
impl AccessGrantRepositoryTrait for MockGrantRepository {
    async fn get(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
    ) -> Result<Option<AccessGrant>, AppError> {
        Ok(self
            .grants
            .lock()
            .unwrap()
            .get(&(file_id, user_id, action))
            .cloned())
    }

    async fn record_usage(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
        granted_by: Uuid,
        default_expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, AppError> {
        let mut grants = self.grants.lock().unwrap();
        let now = Utc::now();
        let grant = grants
            .entry((file_id, user_id, action))
            .and_modify(|g| {
                g.access_count += 1;
                g.last_accessed = Some(now);
            })
            .or_insert_with(|| AccessGrant {
                id: Uuid::new_v4(),
                file_id,
                user_id,
                access_type: action,
                granted_at: now,
                expires_at: default_expires_at,
                granted_by,
                access_count: 1,
                last_accessed: Some(now),
            });
        Ok(grant.clone())
    }
}

/// Mock audit log repository
#[derive(Clone, Default)]
pub struct MockAccessLogRepository {
    entries: Arc<Mutex<Vec<AccessLogEntry>>>,
    fail_inserts: Arc<Mutex<bool>>,
}

impl MockAccessLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AccessLogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn set_fail_inserts(&self, fail: bool) {
        *self.fail_inserts.lock().unwrap() = fail;
    }
}

#[async_trait]
impl AccessLogRepositoryTrait for MockAccessLogRepository {
    async fn insert(&self, log: NewAccessLog) -> Result<(), AppError> {
        if *self.fail_inserts.lock().unwrap() {
            return Err(AppError::Internal("audit sink unavailable".to_string()));
        }
        self.entries.lock().unwrap().push(AccessLogEntry {
            id: Uuid::new_v4(),
            file_id: log.file_id,
            user_id: log.user_id,
            action: log.action,
            ip_address: log.ip_address,
            user_agent: log.user_agent,
            referer: log.referer,
            success: log.success,
            error_message: log.error_message,
            response_code: log.response_code,
            created_at: Utc::now(),
            duration_ms: log.duration_ms,
        });
        Ok(())
    }

    async fn count_recent(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.file_id == file_id && e.user_id == Some(user_id) && e.created_at >= since)
            .count();
        Ok(count as i64)
    }

    async fn list_for_file(
        &self,
        file_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        let mut entries: Vec<AccessLogEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.file_id == file_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        entries.truncate(limit as usize);
        Ok(entries)
    }
}

/// Mock upload session repository
#[derive(Clone, Default)]
pub struct MockUploadSessionRepository {
    sessions: Arc<Mutex<HashMap<Uuid, UploadSession>>>,
}

impl MockUploadSessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: Uuid) -> Option<UploadSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }
}

#[async_trait]
impl UploadSessionRepositoryTrait for MockUploadSessionRepository {
    async fn create(&self, session: &UploadSession) -> Result<(), AppError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<UploadSession>, AppError> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.upload_token == token)
            .cloned())
    }

    async fn claim_for_upload(&self, id: Uuid) -> Result<bool, AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get_mut(&id) {
            Some(session) if session.status == UploadStatus::Pending => {
                session.status = UploadStatus::Uploading;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_completed(&self, id: Uuid, file_id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&id) {
            session.status = UploadStatus::Completed;
            session.file_id = Some(file_id);
            session.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&id) {
            session.status = UploadStatus::Failed;
            session.error_message = Some(error_message.to_string());
        }
        Ok(())
    }

    async fn mark_cancelled(&self, id: Uuid) -> Result<(), AppError> {
        let mut sessions = self.sessions.lock().unwrap();
        if let Some(session) = sessions.get_mut(&id) {
            if session.is_open() {
                session.status = UploadStatus::Cancelled;
            }
        }
        Ok(())
    }

    async fn cancel_expired(&self) -> Result<u64, AppError> {
        let now = Utc::now();
        let mut cancelled = 0;
        let mut sessions = self.sessions.lock().unwrap();
        for session in sessions.values_mut() {
            if session.is_open() && session.is_expired(now) {
                session.status = UploadStatus::Cancelled;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }
}

/// Mock object storage
#[derive(Clone, Default)]
pub struct MockStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_uploads: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        *self.fail_uploads.lock().unwrap() = fail;
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        if *self.fail_uploads.lock().unwrap() {
            return Err(StorageError::UploadFailed("mock upload failure".to_string()));
        }
        self.objects
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), data);
        Ok(format!("mock://{}", storage_key))
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.objects.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn presigned_get_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        Ok(format!(
            "mock://{}?expires={}",
            storage_key,
            expires_in.as_secs()
        ))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.objects.lock().unwrap().contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

pub const TEST_SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

/// A fully wired facade over mocks, with handles kept for assertions
pub struct TestHarness {
    pub files: Arc<MockFileRepository>,
    pub grants: Arc<MockGrantRepository>,
    pub logs: Arc<MockAccessLogRepository>,
    pub sessions: Arc<MockUploadSessionRepository>,
    pub storage: Arc<MockStorage>,
    pub uploads: Arc<crate::UploadSessionManager>,
    pub service: crate::FileAccessService,
}

/// Harness with default limits: 100 MiB uploads, 1 h sessions, 1 h signed
/// URLs (24 h cap), 30-day lazy grants, anomaly 20-in-5-min advisory.
pub fn harness() -> TestHarness {
    harness_with(false, 20)
}

pub fn harness_with(anomaly_enforce: bool, anomaly_threshold: i64) -> TestHarness {
    let files = Arc::new(MockFileRepository::new());
    let grants = Arc::new(MockGrantRepository::new());
    let logs = Arc::new(MockAccessLogRepository::new());
    let sessions = Arc::new(MockUploadSessionRepository::new());
    let storage = Arc::new(MockStorage::new());

    let uploads = Arc::new(crate::UploadSessionManager::new(
        sessions.clone(),
        files.clone(),
        storage.clone(),
        TEST_SECRET.to_vec(),
        100 * 1024 * 1024,
        3600,
    ));

    let anomaly = crate::AnomalyDetector::new(logs.clone(), 300, anomaly_threshold);

    let service = crate::FileAccessService::new(
        files.clone(),
        grants.clone(),
        logs.clone(),
        storage.clone(),
        uploads.clone(),
        anomaly,
        3600,
        86400,
        30,
        anomaly_enforce,
    );

    TestHarness {
        files,
        grants,
        logs,
        sessions,
        storage,
        uploads,
        service,
    }
}

/// File fixture: active student-tier video, unlimited downloads
pub fn sample_file(access_level: AccessLevel) -> StoredFile {
    let now = Utc::now();
    StoredFile {
        id: Uuid::new_v4(),
        name: "lecture.mp4".to_string(),
        original_name: "lecture.mp4".to_string(),
        storage_path: format!("protected/videos/{}.mp4", Uuid::new_v4()),
        file_type: FileType::Video,
        file_size: 1024,
        mime_type: "video/mp4".to_string(),
        access_level,
        course_id: None,
        chapter_id: None,
        lesson_id: None,
        is_encrypted: false,
        encryption_key: None,
        checksum: None,
        uploaded_by: Uuid::new_v4(),
        created_at: now,
        updated_at: now,
        is_active: true,
        allow_download: true,
        allow_streaming: true,
        max_downloads: None,
        expires_at: None,
    }
}
