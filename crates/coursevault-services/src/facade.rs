//! File access facade
//!
//! The single entry point the external CRUD layer talks to: answers "give
//! me a delivery URL" and "accept this upload" requests by orchestrating
//! the policy evaluator, upload session manager, object store, audit sink,
//! and anomaly detector.

use chrono::{Duration as ChronoDuration, Utc};
use coursevault_core::models::{
    AccessAction, AccessLogEntry, ClientContext, CreateUploadSessionRequest, LogAction,
    NewAccessLog, Principal, StoredFile, UploadSession,
};
use coursevault_core::{AppError, DenyReason};
use coursevault_db::{AccessGrantRepositoryTrait, AccessLogRepositoryTrait, FileRepositoryTrait};
use coursevault_storage::Storage;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::anomaly::AnomalyDetector;
use crate::audit::AuditLogSink;
use crate::upload::UploadSessionManager;

/// A granted access: the signed URL plus the file it covers
#[derive(Debug)]
pub struct SignedAccess {
    pub file: StoredFile,
    pub signed_url: String,
    pub expires_in: u64,
    pub action: AccessAction,
}

/// Outcome of an access request. Denial is a first-class outcome, not an
/// error; both branches are audit-logged.
#[derive(Debug)]
pub enum AccessOutcome {
    Granted(Box<SignedAccess>),
    Denied(DenyReason),
}

pub struct FileAccessService {
    files: Arc<dyn FileRepositoryTrait>,
    grants: Arc<dyn AccessGrantRepositoryTrait>,
    logs: Arc<dyn AccessLogRepositoryTrait>,
    storage: Arc<dyn Storage>,
    uploads: Arc<UploadSessionManager>,
    audit: AuditLogSink,
    anomaly: AnomalyDetector,
    signed_url_ttl_secs: u64,
    signed_url_max_ttl_secs: u64,
    grant_default_expiry_days: i64,
    anomaly_enforce: bool,
}

impl FileAccessService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        files: Arc<dyn FileRepositoryTrait>,
        grants: Arc<dyn AccessGrantRepositoryTrait>,
        logs: Arc<dyn AccessLogRepositoryTrait>,
        storage: Arc<dyn Storage>,
        uploads: Arc<UploadSessionManager>,
        anomaly: AnomalyDetector,
        signed_url_ttl_secs: u64,
        signed_url_max_ttl_secs: u64,
        grant_default_expiry_days: i64,
        anomaly_enforce: bool,
    ) -> Self {
        let audit = AuditLogSink::new(logs.clone());
        Self {
            files,
            grants,
            logs,
            storage,
            uploads,
            audit,
            anomaly,
            signed_url_ttl_secs,
            signed_url_max_ttl_secs,
            grant_default_expiry_days,
            anomaly_enforce,
        }
    }

    /// Decide access for a file and, when allowed, issue a presigned URL.
    ///
    /// Exactly one audit entry is written per call, success flag matching
    /// the decision. `content_allowed` is the entitlement collaborator's
    /// answer for course-linked files.
    #[tracing::instrument(skip(self, ctx), fields(file_id = %file_id, role = ?principal.role))]
    pub async fn request_access(
        &self,
        file_id: Uuid,
        principal: Principal,
        action: Option<AccessAction>,
        ctx: ClientContext,
        content_allowed: Option<bool>,
    ) -> Result<AccessOutcome, AppError> {
        let now = Utc::now();

        // Missing row: nothing to audit against, deny outright
        let file = match self.files.get(file_id).await? {
            Some(file) => file,
            None => return Ok(AccessOutcome::Denied(DenyReason::NotFound)),
        };

        let action = action.unwrap_or_else(|| file.file_type.default_action());
        let log_action = LogAction::from(action);

        // Anomaly consult; advisory unless enforcement is configured
        if let Some(user_id) = principal.user_id {
            let suspicious = self
                .anomaly
                .is_suspicious(file.id, user_id)
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Anomaly check failed; treating as not suspicious");
                    false
                });
            if suspicious && self.anomaly_enforce {
                self.audit
                    .record(NewAccessLog::failure(
                        file.id,
                        principal.user_id,
                        log_action,
                        ctx.ip_address,
                        ctx.user_agent,
                        ctx.referer,
                        DenyReason::SuspiciousActivity.code().to_string(),
                    ))
                    .await;
                return Ok(AccessOutcome::Denied(DenyReason::SuspiciousActivity));
            }
        }

        let grant = match principal.user_id {
            Some(user_id) => self.grants.get(file.id, user_id, action).await?,
            None => None,
        };

        if let Err(reason) = crate::policy::evaluate(
            &file,
            principal.role,
            action,
            grant.as_ref(),
            content_allowed,
            now,
        ) {
            self.audit
                .record(NewAccessLog::failure(
                    file.id,
                    principal.user_id,
                    log_action,
                    ctx.ip_address,
                    ctx.user_agent,
                    ctx.referer,
                    reason.code().to_string(),
                ))
                .await;
            return Ok(AccessOutcome::Denied(reason));
        }

        let expires_in = self.signed_url_ttl_secs.min(self.signed_url_max_ttl_secs);
        let signed_url = match self
            .storage
            .presigned_get_url(&file.storage_path, Duration::from_secs(expires_in))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                self.audit
                    .record(NewAccessLog::failure(
                        file.id,
                        principal.user_id,
                        log_action,
                        ctx.ip_address,
                        ctx.user_agent,
                        ctx.referer,
                        e.to_string(),
                    ))
                    .await;
                return Err(AppError::Storage(e.to_string()));
            }
        };

        // One usage increment per allowed call; the grant is created lazily
        // on first allowed access to begin tracking
        if let Some(user_id) = principal.user_id {
            let default_expiry = now + ChronoDuration::days(self.grant_default_expiry_days);
            self.grants
                .record_usage(file.id, user_id, action, user_id, Some(default_expiry))
                .await?;
        }

        self.audit
            .record(NewAccessLog::success(
                file.id,
                principal.user_id,
                log_action,
                ctx.ip_address,
                ctx.user_agent,
                ctx.referer,
            ))
            .await;

        tracing::info!(
            file_id = %file.id,
            action = %action,
            expires_in,
            "File access granted"
        );

        Ok(AccessOutcome::Granted(Box::new(SignedAccess {
            file,
            signed_url,
            expires_in,
            action,
        })))
    }

    /// Open an upload session for the owner. Delegates to the session
    /// manager; validation failures surface before any audit state exists.
    pub async fn create_upload_session(
        &self,
        owner: Uuid,
        request: CreateUploadSessionRequest,
        client_ip: String,
    ) -> Result<UploadSession, AppError> {
        self.uploads.create_session(owner, request, client_ip).await
    }

    /// Consume an upload token and finalize the file, auditing the upload.
    /// The token must belong to `owner` — the authenticated caller.
    pub async fn finalize_upload(
        &self,
        upload_token: &str,
        data: &[u8],
        owner: Uuid,
        ctx: ClientContext,
    ) -> Result<StoredFile, AppError> {
        let file = self
            .uploads
            .begin_upload(upload_token, data, Some(owner))
            .await?;

        self.audit
            .record(NewAccessLog::success(
                file.id,
                Some(file.uploaded_by),
                LogAction::Upload,
                ctx.ip_address,
                ctx.user_agent,
                ctx.referer,
            ))
            .await;

        Ok(file)
    }

    /// Soft delete: owner or admin only; idempotent (an already-inactive
    /// file deletes successfully again).
    #[tracing::instrument(skip(self, ctx), fields(file_id = %file_id))]
    pub async fn delete_file(
        &self,
        file_id: Uuid,
        principal: Principal,
        ctx: ClientContext,
    ) -> Result<(), AppError> {
        let file = self
            .files
            .get(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File not found: {}", file_id)))?;

        let user_id = principal
            .user_id
            .ok_or(AppError::AccessDenied(DenyReason::InsufficientTier))?;

        if file.uploaded_by != user_id && !principal.role.is_admin() {
            return Err(AppError::AccessDenied(DenyReason::InsufficientTier));
        }

        self.files.soft_delete(file_id).await?;

        self.audit
            .record(NewAccessLog::success(
                file.id,
                Some(user_id),
                LogAction::Delete,
                ctx.ip_address,
                ctx.user_agent,
                ctx.referer,
            ))
            .await;

        tracing::info!(file_id = %file_id, "File soft-deleted");

        Ok(())
    }

    /// List the principal's own active files, newest first.
    pub async fn list_files(&self, owner: Uuid) -> Result<Vec<StoredFile>, AppError> {
        self.files.list_by_uploader(owner).await
    }

    /// Forensic view of a file's audit trail. Admin only.
    pub async fn list_access_logs(
        &self,
        file_id: Uuid,
        principal: Principal,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        if !principal.role.is_admin() {
            return Err(AppError::AccessDenied(DenyReason::InsufficientTier));
        }

        if self.files.get(file_id).await?.is_none() {
            return Err(AppError::NotFound(format!("File not found: {}", file_id)));
        }

        self.logs.list_for_file(file_id, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{harness, harness_with, sample_file};
    use coursevault_core::models::{AccessLevel, FileType, Role};

    fn ctx() -> ClientContext {
        ClientContext {
            ip_address: "10.0.0.1".to_string(),
            user_agent: "test-agent".to_string(),
            referer: None,
        }
    }

    fn student() -> (Uuid, Principal) {
        let id = Uuid::new_v4();
        (id, Principal::authenticated(id, Role::Student))
    }

    #[tokio::test]
    async fn download_quota_counts_per_principal() {
        let h = harness();
        let mut file = sample_file(AccessLevel::Student);
        file.max_downloads = Some(2);
        let file_id = file.id;
        h.files.add(file);

        let (s1_id, s1) = student();
        let (_s2_id, s2) = student();

        // S1: two downloads succeed
        for _ in 0..2 {
            let outcome = h
                .service
                .request_access(file_id, s1, Some(AccessAction::Download), ctx(), None)
                .await
                .unwrap();
            assert!(matches!(outcome, AccessOutcome::Granted(_)));
        }
        assert_eq!(
            h.grants.usage_count(file_id, s1_id, AccessAction::Download),
            Some(2)
        );

        // S1: third attempt hits the quota
        let outcome = h
            .service
            .request_access(file_id, s1, Some(AccessAction::Download), ctx(), None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AccessOutcome::Denied(DenyReason::QuotaExceeded)
        ));

        // S2's counter is independent
        let outcome = h
            .service
            .request_access(file_id, s2, Some(AccessAction::Download), ctx(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::Granted(_)));
    }

    #[tokio::test]
    async fn admin_tier_denies_anonymous_allows_admin() {
        let h = harness();
        let file = sample_file(AccessLevel::Admin);
        let file_id = file.id;
        h.files.add(file);

        let outcome = h
            .service
            .request_access(file_id, Principal::anonymous(), None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AccessOutcome::Denied(DenyReason::InsufficientTier)
        ));

        let admin = Principal::authenticated(Uuid::new_v4(), Role::Admin);
        let outcome = h
            .service
            .request_access(file_id, admin, None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::Granted(_)));
    }

    #[tokio::test]
    async fn every_access_call_writes_exactly_one_log_entry() {
        let h = harness();
        let file = sample_file(AccessLevel::Professor);
        let file_id = file.id;
        h.files.add(file);

        // Allowed call
        let professor = Principal::authenticated(Uuid::new_v4(), Role::Professor);
        let outcome = h
            .service
            .request_access(file_id, professor, None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::Granted(_)));

        // Denied call
        let (_, s) = student();
        let outcome = h
            .service
            .request_access(file_id, s, None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::Denied(_)));

        let entries = h.logs.entries();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert!(!entries[1].success);
        assert_eq!(
            entries[1].error_message.as_deref(),
            Some("insufficient_tier")
        );
    }

    #[tokio::test]
    async fn audit_failure_never_blocks_the_decision() {
        let h = harness();
        let file = sample_file(AccessLevel::Public);
        let file_id = file.id;
        h.files.add(file);
        h.logs.set_fail_inserts(true);

        let outcome = h
            .service
            .request_access(file_id, Principal::anonymous(), None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(outcome, AccessOutcome::Granted(_)));
    }

    #[tokio::test]
    async fn missing_file_is_denied_not_found() {
        let h = harness();
        let (_, s) = student();
        let outcome = h
            .service
            .request_access(Uuid::new_v4(), s, None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AccessOutcome::Denied(DenyReason::NotFound)
        ));
    }

    #[tokio::test]
    async fn inactive_file_is_denied_and_audited() {
        let h = harness();
        let mut file = sample_file(AccessLevel::Student);
        file.is_active = false;
        let file_id = file.id;
        h.files.add(file);

        let (_, s) = student();
        let outcome = h
            .service
            .request_access(file_id, s, None, ctx(), None)
            .await
            .unwrap();
        assert!(matches!(
            outcome,
            AccessOutcome::Denied(DenyReason::FileUnavailable)
        ));
        assert_eq!(h.logs.entries().len(), 1);
    }

    #[tokio::test]
    async fn action_defaults_follow_file_type() {
        let h = harness();
        let video = sample_file(AccessLevel::Student);
        let video_id = video.id;
        h.files.add(video);

        let mut pdf = sample_file(AccessLevel::Student);
        pdf.file_type = FileType::Pdf;
        let pdf_id = pdf.id;
        h.files.add(pdf);

        let (_, s) = student();
        match h
            .service
            .request_access(video_id, s, None, ctx(), None)
            .await
            .unwrap()
        {
            AccessOutcome::Granted(access) => assert_eq!(access.action, AccessAction::Stream),
            other => panic!("Expected grant, got {:?}", other),
        }
        match h
            .service
            .request_access(pdf_id, s, None, ctx(), None)
            .await
            .unwrap()
        {
            AccessOutcome::Granted(access) => assert_eq!(access.action, AccessAction::Download),
            other => panic!("Expected grant, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn signed_url_carries_clamped_ttl() {
        let h = harness();
        let file = sample_file(AccessLevel::Public);
        let file_id = file.id;
        h.files.add(file);

        match h
            .service
            .request_access(file_id, Principal::anonymous(), None, ctx(), None)
            .await
            .unwrap()
        {
            AccessOutcome::Granted(access) => {
                assert_eq!(access.expires_in, 3600);
                assert!(access.signed_url.contains("expires=3600"));
            }
            other => panic!("Expected grant, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn anomaly_is_advisory_by_default_and_enforced_on_request() {
        // Threshold of 3 so the fixture stays small
        let advisory = harness_with(false, 3);
        let file = sample_file(AccessLevel::Student);
        let file_id = file.id;
        advisory.files.add(file);
        let (_, s) = student();

        for _ in 0..4 {
            let outcome = advisory
                .service
                .request_access(file_id, s, None, ctx(), None)
                .await
                .unwrap();
            // Advisory: the burst is flagged in logs but never denied
            assert!(matches!(outcome, AccessOutcome::Granted(_)));
        }

        let enforcing = harness_with(true, 3);
        let file = sample_file(AccessLevel::Student);
        let file_id = file.id;
        enforcing.files.add(file);
        let (_, s) = student();

        let mut denied = None;
        for _ in 0..5 {
            match enforcing
                .service
                .request_access(file_id, s, None, ctx(), None)
                .await
                .unwrap()
            {
                AccessOutcome::Denied(reason) => {
                    denied = Some(reason);
                    break;
                }
                AccessOutcome::Granted(_) => {}
            }
        }
        assert_eq!(denied, Some(DenyReason::SuspiciousActivity));
    }

    #[tokio::test]
    async fn delete_is_owner_or_admin_only_and_idempotent() {
        let h = harness();
        let (owner_id, owner) = student();
        let mut file = sample_file(AccessLevel::Student);
        file.uploaded_by = owner_id;
        let file_id = file.id;
        h.files.add(file);

        // A different student cannot delete
        let (_, other) = student();
        let result = h.service.delete_file(file_id, other, ctx()).await;
        assert!(matches!(result, Err(AppError::AccessDenied(_))));

        // The owner can; repeating succeeds (idempotent)
        h.service.delete_file(file_id, owner, ctx()).await.unwrap();
        h.service.delete_file(file_id, owner, ctx()).await.unwrap();

        // An admin can delete someone else's (already inactive) file
        let admin = Principal::authenticated(Uuid::new_v4(), Role::Admin);
        h.service.delete_file(file_id, admin, ctx()).await.unwrap();
    }

    #[tokio::test]
    async fn finalize_upload_audits_the_upload() {
        let h = harness();
        let data = vec![7u8; 128];
        let owner = Uuid::new_v4();

        let session = h
            .service
            .create_upload_session(
                owner,
                coursevault_core::models::CreateUploadSessionRequest {
                    file_name: "notes.pdf".to_string(),
                    file_size: data.len() as u64,
                    file_type: FileType::Pdf,
                    mime_type: "application/pdf".to_string(),
                    access_level: AccessLevel::Student,
                    course_id: None,
                    chapter_id: None,
                    lesson_id: None,
                },
                "10.0.0.1".to_string(),
            )
            .await
            .unwrap();

        let file = h
            .service
            .finalize_upload(&session.upload_token, &data, owner, ctx())
            .await
            .unwrap();

        let entries = h.logs.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].file_id, file.id);
        assert_eq!(entries[0].user_id, Some(owner));
        assert!(entries[0].success);
        assert!(matches!(entries[0].action, LogAction::Upload));
    }

    #[tokio::test]
    async fn finalize_upload_rejects_a_different_owner() {
        let h = harness();
        let data = vec![7u8; 128];
        let owner = Uuid::new_v4();

        let session = h
            .service
            .create_upload_session(
                owner,
                coursevault_core::models::CreateUploadSessionRequest {
                    file_name: "notes.pdf".to_string(),
                    file_size: data.len() as u64,
                    file_type: FileType::Pdf,
                    mime_type: "application/pdf".to_string(),
                    access_level: AccessLevel::Student,
                    course_id: None,
                    chapter_id: None,
                    lesson_id: None,
                },
                "10.0.0.1".to_string(),
            )
            .await
            .unwrap();

        let result = h
            .service
            .finalize_upload(&session.upload_token, &data, Uuid::new_v4(), ctx())
            .await;
        assert!(matches!(result, Err(AppError::SessionInvalid)));
    }

    #[tokio::test]
    async fn access_log_listing_is_admin_only() {
        let h = harness();
        let file = sample_file(AccessLevel::Student);
        let file_id = file.id;
        h.files.add(file);

        let (_, s) = student();
        h.service
            .request_access(file_id, s, None, ctx(), None)
            .await
            .unwrap();

        let result = h.service.list_access_logs(file_id, s, 50).await;
        assert!(matches!(result, Err(AppError::AccessDenied(_))));

        let admin = Principal::authenticated(Uuid::new_v4(), Role::Admin);
        let entries = h.service.list_access_logs(file_id, admin, 50).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn list_files_returns_active_files_newest_first() {
        let h = harness();
        let (owner_id, _) = student();

        let mut first = sample_file(AccessLevel::Student);
        first.uploaded_by = owner_id;
        first.created_at = Utc::now() - ChronoDuration::hours(2);
        let mut second = sample_file(AccessLevel::Student);
        second.uploaded_by = owner_id;
        let mut deleted = sample_file(AccessLevel::Student);
        deleted.uploaded_by = owner_id;
        deleted.is_active = false;

        let second_id = second.id;
        h.files.add(first);
        h.files.add(second);
        h.files.add(deleted);

        let files = h.service.list_files(owner_id).await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, second_id);
    }
}
