use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursevault_core::models::{AccessLogEntry, NewAccessLog};
use coursevault_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Trait for audit log repository operations
#[async_trait]
pub trait AccessLogRepositoryTrait: Send + Sync {
    /// Append one audit record. Rows are write-once; there is no update path.
    async fn insert(&self, log: NewAccessLog) -> Result<(), AppError>;

    /// Count log rows for a (file, user) pair since the given instant.
    /// Backs the anomaly detector's trailing-window check.
    async fn count_recent(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>;

    /// Most recent log rows for a file, for forensic review
    async fn list_for_file(
        &self,
        file_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, AppError>;
}

/// PostgreSQL audit log repository
#[derive(Clone)]
pub struct AccessLogRepository {
    pool: PgPool,
}

impl AccessLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessLogRepositoryTrait for AccessLogRepository {
    #[tracing::instrument(skip(self, log), fields(
        db.table = "file_access_logs",
        db.operation = "insert",
        file_id = %log.file_id
    ))]
    async fn insert(&self, log: NewAccessLog) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO file_access_logs (
                id, file_id, user_id, action, ip_address, user_agent, referer,
                success, error_message, response_code, created_at, duration_ms
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(log.file_id)
        .bind(log.user_id)
        .bind(log.action)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(&log.referer)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(log.response_code)
        .bind(log.duration_ms)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn count_recent(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM file_access_logs
            WHERE file_id = $1 AND user_id = $2 AND created_at >= $3
            "#,
        )
        .bind(file_id)
        .bind(user_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn list_for_file(
        &self,
        file_id: Uuid,
        limit: i64,
    ) -> Result<Vec<AccessLogEntry>, AppError> {
        let entries = sqlx::query_as::<_, AccessLogEntry>(
            r#"
            SELECT id, file_id, user_id, action, ip_address, user_agent,
                   referer, success, error_message, response_code, created_at,
                   duration_ms
            FROM file_access_logs
            WHERE file_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(file_id)
        .bind(limit.min(500))
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
