use async_trait::async_trait;
use coursevault_core::models::StoredFile;
use coursevault_core::AppError;
use sqlx::PgPool;
use uuid::Uuid;

/// Trait for file repository operations
/// This abstracts the database implementation (PostgreSQL)
#[async_trait]
pub trait FileRepositoryTrait: Send + Sync {
    /// Insert a finalized file record
    async fn create(&self, file: &StoredFile) -> Result<(), AppError>;

    /// Get a file by ID (active or not)
    async fn get(&self, id: Uuid) -> Result<Option<StoredFile>, AppError>;

    /// List a user's active files, newest first
    async fn list_by_uploader(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError>;

    /// Soft delete: flips is_active only. Returns false when no such file
    /// exists; deleting an already-inactive file succeeds.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError>;
}

/// PostgreSQL file repository
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepositoryTrait for FileRepository {
    #[tracing::instrument(skip(self, file), fields(
        db.table = "secure_files",
        db.operation = "insert",
        file_id = %file.id
    ))]
    async fn create(&self, file: &StoredFile) -> Result<(), AppError> {
        // Dynamic SQLx queries to avoid requiring DATABASE_URL/sqlx prepare
        sqlx::query(
            r#"
            INSERT INTO secure_files (
                id, name, original_name, storage_path, file_type, file_size,
                mime_type, access_level, course_id, chapter_id, lesson_id,
                is_encrypted, encryption_key, checksum, uploaded_by,
                created_at, updated_at, is_active, allow_download,
                allow_streaming, max_downloads, expires_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(file.id)
        .bind(&file.name)
        .bind(&file.original_name)
        .bind(&file.storage_path)
        .bind(file.file_type)
        .bind(file.file_size)
        .bind(&file.mime_type)
        .bind(file.access_level)
        .bind(file.course_id)
        .bind(file.chapter_id)
        .bind(file.lesson_id)
        .bind(file.is_encrypted)
        .bind(&file.encryption_key)
        .bind(&file.checksum)
        .bind(file.uploaded_by)
        .bind(file.created_at)
        .bind(file.updated_at)
        .bind(file.is_active)
        .bind(file.allow_download)
        .bind(file.allow_streaming)
        .bind(file.max_downloads)
        .bind(file.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<StoredFile>, AppError> {
        let file = sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT id, name, original_name, storage_path, file_type, file_size,
                   mime_type, access_level, course_id, chapter_id, lesson_id,
                   is_encrypted, encryption_key, checksum, uploaded_by,
                   created_at, updated_at, is_active, allow_download,
                   allow_streaming, max_downloads, expires_at
            FROM secure_files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn list_by_uploader(&self, user_id: Uuid) -> Result<Vec<StoredFile>, AppError> {
        let files = sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT id, name, original_name, storage_path, file_type, file_size,
                   mime_type, access_level, course_id, chapter_id, lesson_id,
                   is_encrypted, encryption_key, checksum, uploaded_by,
                   created_at, updated_at, is_active, allow_download,
                   allow_streaming, max_downloads, expires_at
            FROM secure_files
            WHERE uploaded_by = $1 AND is_active = TRUE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    #[tracing::instrument(skip(self), fields(
        db.table = "secure_files",
        db.operation = "update",
        file_id = %id
    ))]
    async fn soft_delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE secure_files
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
