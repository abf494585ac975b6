use async_trait::async_trait;
use chrono::{DateTime, Utc};
use coursevault_core::models::{AccessAction, AccessGrant};
use coursevault_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Trait for access grant repository operations
#[async_trait]
pub trait AccessGrantRepositoryTrait: Send + Sync {
    /// Look up the grant for a (file, user, action) tuple
    async fn get(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
    ) -> Result<Option<AccessGrant>, AppError>;

    /// Record one allowed access: lazily creates the grant on first use and
    /// atomically increments its usage counter. The upsert keys on the
    /// (file, user, action) uniqueness constraint, which serializes
    /// concurrent increments on the same tuple.
    async fn record_usage(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
        granted_by: Uuid,
        default_expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, AppError>;
}

/// PostgreSQL access grant repository
#[derive(Clone)]
pub struct AccessGrantRepository {
    pool: PgPool,
}

impl AccessGrantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessGrantRepositoryTrait for AccessGrantRepository {
    async fn get(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
    ) -> Result<Option<AccessGrant>, AppError> {
        let grant = sqlx::query_as::<_, AccessGrant>(
            r#"
            SELECT id, file_id, user_id, access_type, granted_at, expires_at,
                   granted_by, access_count, last_accessed
            FROM file_access_grants
            WHERE file_id = $1 AND user_id = $2 AND access_type = $3
            "#,
        )
        .bind(file_id)
        .bind(user_id)
        .bind(action)
        .fetch_optional(&self.pool)
        .await?;

        Ok(grant)
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "file_access_grants",
        db.operation = "upsert",
        file_id = %file_id,
        user_id = %user_id
    ))]
    async fn record_usage(
        &self,
        file_id: Uuid,
        user_id: Uuid,
        action: AccessAction,
        granted_by: Uuid,
        default_expires_at: Option<DateTime<Utc>>,
    ) -> Result<AccessGrant, AppError> {
        let grant = sqlx::query_as::<_, AccessGrant>(
            r#"
            INSERT INTO file_access_grants (
                id, file_id, user_id, access_type, granted_at, expires_at,
                granted_by, access_count, last_accessed
            )
            VALUES ($1, $2, $3, $4, NOW(), $5, $6, 1, NOW())
            ON CONFLICT (file_id, user_id, access_type) DO UPDATE
            SET access_count = file_access_grants.access_count + 1,
                last_accessed = NOW()
            RETURNING id, file_id, user_id, access_type, granted_at,
                      expires_at, granted_by, access_count, last_accessed
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(file_id)
        .bind(user_id)
        .bind(action)
        .bind(default_expires_at)
        .bind(granted_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(grant)
    }
}
