use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::file::{AccessLevel, FileType};

/// Upload session lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "upload_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Ephemeral, token-bound state machine for one pending upload.
///
/// Created in `pending`; `uploading` once claimed; `completed` with a file
/// reference on finalize, or `failed`/`cancelled` otherwise. Open sessions
/// past their expiry are treated as dead on next touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct UploadSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: FileType,
    pub mime_type: String,
    pub access_level: AccessLevel,
    pub course_id: Option<Uuid>,
    pub chapter_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    /// Signed bearer token; unique and offline-verifiable
    pub upload_token: String,
    pub ip_address: String,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub file_id: Option<Uuid>,
    pub error_message: Option<String>,
}

impl UploadSession {
    /// Check if the upload window has elapsed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Still accepting bytes (pending or uploading)
    pub fn is_open(&self) -> bool {
        matches!(self.status, UploadStatus::Pending | UploadStatus::Uploading)
    }
}

/// Request to open an upload session
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateUploadSessionRequest {
    /// Original filename
    #[validate(length(
        min = 1,
        max = 255,
        message = "File name must be between 1 and 255 characters"
    ))]
    pub file_name: String,
    /// Declared file size in bytes
    #[validate(range(min = 1, message = "File size must be at least 1 byte"))]
    pub file_size: u64,
    /// File type (video, pdf, document, image, audio)
    pub file_type: FileType,
    /// Content type (MIME type)
    #[validate(length(
        min = 1,
        max = 100,
        message = "MIME type must be between 1 and 100 characters"
    ))]
    pub mime_type: String,
    /// Access tier for the finalized file
    #[serde(default = "default_access_level")]
    pub access_level: AccessLevel,
    /// Optional content associations
    #[serde(default)]
    pub course_id: Option<Uuid>,
    #[serde(default)]
    pub chapter_id: Option<Uuid>,
    #[serde(default)]
    pub lesson_id: Option<Uuid>,
}

fn default_access_level() -> AccessLevel {
    AccessLevel::Student
}

/// Response containing the upload token and session information
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateUploadSessionResponse {
    /// Session ID (for status queries)
    pub session_id: Uuid,
    /// Signed bearer token to present when uploading
    pub upload_token: String,
    /// Upload endpoint for this token
    pub upload_url: String,
    /// Token/session expiration time
    pub expires_at: DateTime<Utc>,
}

/// Response after a completed upload
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadCompleteResponse {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub access_level: AccessLevel,
    /// SHA-256 hex digest of the stored bytes
    pub checksum: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_session(status: UploadStatus) -> UploadSession {
        let now = Utc::now();
        UploadSession {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_name: "notes.pdf".to_string(),
            file_size: 1024,
            file_type: FileType::Pdf,
            mime_type: "application/pdf".to_string(),
            access_level: AccessLevel::Student,
            course_id: None,
            chapter_id: None,
            lesson_id: None,
            upload_token: "token".to_string(),
            ip_address: "127.0.0.1".to_string(),
            status,
            created_at: now,
            expires_at: now + Duration::hours(1),
            completed_at: None,
            file_id: None,
            error_message: None,
        }
    }

    #[test]
    fn test_session_open_states() {
        assert!(sample_session(UploadStatus::Pending).is_open());
        assert!(sample_session(UploadStatus::Uploading).is_open());
        assert!(!sample_session(UploadStatus::Processing).is_open());
        assert!(!sample_session(UploadStatus::Completed).is_open());
        assert!(!sample_session(UploadStatus::Failed).is_open());
        assert!(!sample_session(UploadStatus::Cancelled).is_open());
    }

    #[test]
    fn test_session_expiry() {
        let mut session = sample_session(UploadStatus::Pending);
        let now = Utc::now();
        assert!(!session.is_expired(now));
        session.expires_at = now - Duration::seconds(1);
        assert!(session.is_expired(now));
    }

    #[test]
    fn test_create_request_validation() {
        let request = CreateUploadSessionRequest {
            file_name: "notes.pdf".to_string(),
            file_size: 1024,
            file_type: FileType::Pdf,
            mime_type: "application/pdf".to_string(),
            access_level: AccessLevel::Student,
            course_id: None,
            chapter_id: None,
            lesson_id: None,
        };
        assert!(validator::Validate::validate(&request).is_ok());

        let request = CreateUploadSessionRequest {
            file_name: "".to_string(),
            ..request
        };
        assert!(validator::Validate::validate(&request).is_err());
    }

    #[test]
    fn test_access_level_defaults_to_student_in_request() {
        let json = r#"{
            "file_name": "notes.pdf",
            "file_size": 1024,
            "file_type": "pdf",
            "mime_type": "application/pdf"
        }"#;
        let request: CreateUploadSessionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.access_level, AccessLevel::Student);
    }
}
