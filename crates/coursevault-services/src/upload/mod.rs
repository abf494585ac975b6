//! Upload session management
//!
//! Issues short-lived, signed upload tokens, tracks session state, and
//! finalizes a completed upload into a stored file record. A token is
//! consumable exactly once: the pending -> uploading transition is a
//! conditional update only one concurrent caller can win.

pub mod token;

use chrono::{Duration, Utc};
use coursevault_core::models::{
    CreateUploadSessionRequest, StoredFile, UploadSession, UploadStatus,
};
use coursevault_core::AppError;
use coursevault_db::{FileRepositoryTrait, UploadSessionRepositoryTrait};
use coursevault_storage::{generate_storage_path, Storage};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

pub use token::UploadTokenClaims;

/// Manages the lifecycle of upload sessions
pub struct UploadSessionManager {
    sessions: Arc<dyn UploadSessionRepositoryTrait>,
    files: Arc<dyn FileRepositoryTrait>,
    storage: Arc<dyn Storage>,
    token_secret: Vec<u8>,
    max_upload_size_bytes: usize,
    session_ttl_secs: u64,
}

impl UploadSessionManager {
    pub fn new(
        sessions: Arc<dyn UploadSessionRepositoryTrait>,
        files: Arc<dyn FileRepositoryTrait>,
        storage: Arc<dyn Storage>,
        token_secret: Vec<u8>,
        max_upload_size_bytes: usize,
        session_ttl_secs: u64,
    ) -> Self {
        Self {
            sessions,
            files,
            storage,
            token_secret,
            max_upload_size_bytes,
            session_ttl_secs,
        }
    }

    /// Create an upload session and issue its bearer token.
    #[tracing::instrument(skip(self, request), fields(
        user_id = %owner,
        file_name = %request.file_name,
        file_size = request.file_size
    ))]
    pub async fn create_session(
        &self,
        owner: Uuid,
        request: CreateUploadSessionRequest,
        client_ip: String,
    ) -> Result<UploadSession, AppError> {
        request.validate()?;

        if request.file_size as usize > self.max_upload_size_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "File size {} exceeds maximum allowed size of {} bytes",
                request.file_size, self.max_upload_size_bytes
            )));
        }

        if !request.mime_type.contains('/') {
            return Err(AppError::InvalidInput(format!(
                "Invalid MIME type: {}",
                request.mime_type
            )));
        }

        let session_id = Uuid::new_v4();
        let now = Utc::now();
        let expires_at = now + Duration::seconds(self.session_ttl_secs as i64);

        let upload_token = token::create(
            owner,
            session_id,
            &request.file_name,
            request.file_size,
            expires_at,
            &self.token_secret,
        );

        let session = UploadSession {
            id: session_id,
            user_id: owner,
            file_name: request.file_name,
            file_size: request.file_size as i64,
            file_type: request.file_type,
            mime_type: request.mime_type,
            access_level: request.access_level,
            course_id: request.course_id,
            chapter_id: request.chapter_id,
            lesson_id: request.lesson_id,
            upload_token,
            ip_address: client_ip,
            status: UploadStatus::Pending,
            created_at: now,
            expires_at,
            completed_at: None,
            file_id: None,
            error_message: None,
        };

        self.sessions.create(&session).await?;

        tracing::info!(
            session_id = %session.id,
            expires_at = %session.expires_at,
            "Upload session created"
        );

        Ok(session)
    }

    /// Consume an upload token: validate, claim the session, verify the
    /// byte count, write to storage, and finalize the file record.
    ///
    /// `expected_owner` is the authenticated caller, when there is one: the
    /// session must belong to them even if the token itself checks out.
    #[tracing::instrument(skip(self, token, data))]
    pub async fn begin_upload(
        &self,
        token: &str,
        data: &[u8],
        expected_owner: Option<Uuid>,
    ) -> Result<StoredFile, AppError> {
        let now = Utc::now();

        // Offline check first: signature and expiry without touching the database
        let claims = token::verify(token, &self.token_secret, now)?;

        // The session record is still authoritative for state transitions
        let session = self
            .sessions
            .get_by_token(token)
            .await?
            .ok_or(AppError::SessionInvalid)?;

        if let Some(owner) = expected_owner {
            if session.user_id != owner {
                return Err(AppError::SessionInvalid);
            }
        }

        if session.id != claims.session_id
            || session.user_id != claims.user_id
            || session.file_size != claims.declared_size as i64
            || token::name_digest(&session.file_name) != claims.name_digest
        {
            return Err(AppError::TokenInvalid);
        }

        if !session.is_open() {
            return Err(AppError::SessionAlreadyConsumed);
        }

        if session.is_expired(now) {
            self.sessions.mark_cancelled(session.id).await?;
            return Err(AppError::SessionExpired);
        }

        // Single-use claim: only one concurrent caller observes `pending`
        if !self.sessions.claim_for_upload(session.id).await? {
            return Err(AppError::SessionAlreadyConsumed);
        }

        if data.len() as i64 != session.file_size {
            self.sessions
                .mark_failed(session.id, "File size mismatch")
                .await?;
            return Err(AppError::SizeMismatch {
                expected: session.file_size,
                actual: data.len() as i64,
            });
        }

        let checksum = hex::encode(Sha256::digest(data));

        // Fresh collision-resistant path; the client filename never becomes a key
        let storage_path = generate_storage_path(session.file_type, &session.file_name);

        if let Err(e) = self
            .storage
            .upload_with_key(&storage_path, data.to_vec(), &session.mime_type)
            .await
        {
            self.sessions.mark_failed(session.id, &e.to_string()).await?;
            return Err(AppError::Storage(e.to_string()));
        }

        let file = StoredFile {
            id: Uuid::new_v4(),
            name: session.file_name.clone(),
            original_name: session.file_name.clone(),
            storage_path,
            file_type: session.file_type,
            file_size: session.file_size,
            mime_type: session.mime_type.clone(),
            access_level: session.access_level,
            course_id: session.course_id,
            chapter_id: session.chapter_id,
            lesson_id: session.lesson_id,
            is_encrypted: false,
            encryption_key: None,
            checksum: Some(checksum),
            uploaded_by: session.user_id,
            created_at: now,
            updated_at: now,
            is_active: true,
            allow_download: true,
            allow_streaming: true,
            max_downloads: None,
            expires_at: None,
        };

        if let Err(e) = self.files.create(&file).await {
            // Never leave a half-finalized session in a non-terminal state
            self.sessions
                .mark_failed(session.id, "Failed to create file record")
                .await?;
            return Err(e);
        }

        self.sessions.mark_completed(session.id, file.id).await?;

        tracing::info!(
            session_id = %session.id,
            file_id = %file.id,
            storage_path = %file.storage_path,
            "Upload finalized"
        );

        Ok(file)
    }

    /// Lazily cancel every open session past its expiry. Also run by the
    /// periodic sweeper; see [`crate::sweep`].
    pub async fn sweep_expired(&self) -> Result<u64, AppError> {
        self.sessions.cancel_expired().await
    }
}
