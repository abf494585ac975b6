use async_trait::async_trait;
use coursevault_core::models::UploadSession;
use coursevault_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Trait for upload session repository operations
#[async_trait]
pub trait UploadSessionRepositoryTrait: Send + Sync {
    /// Create a new upload session (status pending)
    async fn create(&self, session: &UploadSession) -> Result<(), AppError>;

    /// Load the authoritative session record for a bearer token
    async fn get_by_token(&self, token: &str) -> Result<Option<UploadSession>, AppError>;

    /// Claim the session for upload: the pending -> uploading transition.
    /// Conditional update, so of N concurrent callers exactly one observes
    /// `pending` and wins; the rest see false.
    async fn claim_for_upload(&self, id: Uuid) -> Result<bool, AppError>;

    /// Mark session as completed, linking the finalized file
    async fn mark_completed(&self, id: Uuid, file_id: Uuid) -> Result<(), AppError>;

    /// Mark session as failed with the captured error
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError>;

    /// Mark session as cancelled (lazy expiry path)
    async fn mark_cancelled(&self, id: Uuid) -> Result<(), AppError>;

    /// Cancel all open sessions past their expiry; returns how many
    async fn cancel_expired(&self) -> Result<u64, AppError>;
}

/// PostgreSQL upload session repository
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: PgPool,
}

impl UploadSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UploadSessionRepositoryTrait for UploadSessionRepository {
    #[tracing::instrument(skip(self, session), fields(
        db.table = "file_upload_sessions",
        db.operation = "insert",
        session_id = %session.id
    ))]
    async fn create(&self, session: &UploadSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO file_upload_sessions (
                id, user_id, file_name, file_size, file_type, mime_type,
                access_level, course_id, chapter_id, lesson_id, upload_token,
                ip_address, status, created_at, expires_at, completed_at,
                file_id, error_message
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(&session.file_name)
        .bind(session.file_size)
        .bind(session.file_type)
        .bind(&session.mime_type)
        .bind(session.access_level)
        .bind(session.course_id)
        .bind(session.chapter_id)
        .bind(session.lesson_id)
        .bind(&session.upload_token)
        .bind(&session.ip_address)
        .bind(session.status)
        .bind(session.created_at)
        .bind(session.expires_at)
        .bind(session.completed_at)
        .bind(session.file_id)
        .bind(&session.error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            r#"
            SELECT id, user_id, file_name, file_size, file_type, mime_type,
                   access_level, course_id, chapter_id, lesson_id,
                   upload_token, ip_address, status, created_at, expires_at,
                   completed_at, file_id, error_message
            FROM file_upload_sessions
            WHERE upload_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "file_upload_sessions",
        db.operation = "claim",
        session_id = %id
    ))]
    async fn claim_for_upload(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE file_upload_sessions
            SET status = 'uploading'
            WHERE id = $1 AND status = 'pending'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "file_upload_sessions",
        db.operation = "update",
        session_id = %id
    ))]
    async fn mark_completed(&self, id: Uuid, file_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE file_upload_sessions
            SET status = 'completed', file_id = $2, completed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(file_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "file_upload_sessions",
        db.operation = "update",
        session_id = %id
    ))]
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE file_upload_sessions
            SET status = 'failed', error_message = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error_message)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "file_upload_sessions",
        db.operation = "update",
        session_id = %id
    ))]
    async fn mark_cancelled(&self, id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE file_upload_sessions
            SET status = 'cancelled'
            WHERE id = $1 AND status IN ('pending', 'uploading')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn cancel_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE file_upload_sessions
            SET status = 'cancelled'
            WHERE expires_at < NOW() AND status IN ('pending', 'uploading')
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
