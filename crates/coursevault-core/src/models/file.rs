use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::access_grant::AccessAction;

/// File type enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Video,
    Pdf,
    Document,
    Image,
    Audio,
}

impl FileType {
    /// Default delivery action when the caller does not specify one:
    /// videos stream, everything else downloads.
    pub fn default_action(&self) -> AccessAction {
        match self {
            FileType::Video => AccessAction::Stream,
            _ => AccessAction::Download,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileType::Video => write!(f, "video"),
            FileType::Pdf => write!(f, "pdf"),
            FileType::Document => write!(f, "document"),
            FileType::Image => write!(f, "image"),
            FileType::Audio => write!(f, "audio"),
        }
    }
}

/// Access tier attached to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "access_level", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Public,
    Student,
    Professor,
    Admin,
}

/// Principal role, resolved once per request by the identity layer and
/// passed into this subsystem as a value — never re-derived here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Anonymous,
    Student,
    Professor,
    Admin,
}

impl Role {
    /// Privilege rank; higher ranks satisfy every tier a lower rank does.
    fn rank(&self) -> u8 {
        match self {
            Role::Anonymous => 0,
            Role::Student => 1,
            Role::Professor => 2,
            Role::Admin => 3,
        }
    }

    /// Whether this role satisfies a file's access tier.
    pub fn satisfies(&self, level: AccessLevel) -> bool {
        let required = match level {
            AccessLevel::Public => 0,
            AccessLevel::Student => 1,
            AccessLevel::Professor => 2,
            AccessLevel::Admin => 3,
        };
        self.rank() >= required
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::str::FromStr for Role {
    type Err = crate::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anonymous" => Ok(Role::Anonymous),
            "student" => Ok(Role::Student),
            "professor" => Ok(Role::Professor),
            "admin" => Ok(Role::Admin),
            other => Err(crate::AppError::InvalidInput(format!(
                "Unknown role: {}",
                other
            ))),
        }
    }
}

/// A stored file with its access-control attributes.
///
/// Identity is immutable once finalized; deletion flips `is_active` only.
/// Grant and log rows keep referencing inactive files (historical records).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct StoredFile {
    pub id: Uuid,
    pub name: String,
    pub original_name: String,
    /// Globally unique object-store key; never the client-supplied filename.
    pub storage_path: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub access_level: AccessLevel,
    // Weak references to content; informational only, not ownership
    pub course_id: Option<Uuid>,
    pub chapter_id: Option<Uuid>,
    pub lesson_id: Option<Uuid>,
    pub is_encrypted: bool,
    pub encryption_key: Option<String>,
    /// SHA-256 hex digest of the stored bytes; immutable once set
    pub checksum: Option<String>,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
    pub allow_download: bool,
    pub allow_streaming: bool,
    /// Per-principal download quota; None = unlimited
    pub max_downloads: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredFile {
    /// Check if the file's hard expiry has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now > expires_at,
            None => false,
        }
    }

    /// Active and not past its hard expiry
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired(now)
    }

    /// File size in MiB, rounded to two decimals
    pub fn file_size_mb(&self) -> f64 {
        (self.file_size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    /// Whether the file carries any content association (course/chapter/lesson)
    pub fn has_content_association(&self) -> bool {
        self.course_id.is_some() || self.chapter_id.is_some() || self.lesson_id.is_some()
    }
}

/// File listing entry: the caller-facing view of a stored file. Storage
/// path and encryption key stay internal.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileSummary {
    pub id: Uuid,
    pub name: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub access_level: AccessLevel,
    pub checksum: Option<String>,
    pub created_at: DateTime<Utc>,
    pub allow_download: bool,
    pub allow_streaming: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<StoredFile> for FileSummary {
    fn from(file: StoredFile) -> Self {
        FileSummary {
            id: file.id,
            name: file.name,
            file_type: file.file_type,
            file_size: file.file_size,
            mime_type: file.mime_type,
            access_level: file.access_level,
            checksum: file.checksum,
            created_at: file.created_at,
            allow_download: file.allow_download,
            allow_streaming: file.allow_streaming,
            expires_at: file.expires_at,
        }
    }
}

/// Response for a granted file access request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileAccessResponse {
    pub file_id: Uuid,
    pub file_name: String,
    pub file_type: FileType,
    pub file_size: i64,
    /// Time-limited capability URL issued by the object store
    pub signed_url: String,
    pub expires_in: u64,
    pub access_type: AccessAction,
}

/// Response for a denied file access request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccessDeniedResponse {
    pub denied: bool,
    pub reason: crate::DenyReason,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_file() -> StoredFile {
        let now = Utc::now();
        StoredFile {
            id: Uuid::new_v4(),
            name: "lecture.mp4".to_string(),
            original_name: "lecture.mp4".to_string(),
            storage_path: "protected/videos/abc.mp4".to_string(),
            file_type: FileType::Video,
            file_size: 10 * 1024 * 1024,
            mime_type: "video/mp4".to_string(),
            access_level: AccessLevel::Student,
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

    #[test]
    fn test_role_satisfies_is_monotone() {
        // public: every role including anonymous
        for role in [Role::Anonymous, Role::Student, Role::Professor, Role::Admin] {
            assert!(role.satisfies(AccessLevel::Public));
        }
        // each tier admits itself and everything above
        assert!(!Role::Anonymous.satisfies(AccessLevel::Student));
        assert!(Role::Student.satisfies(AccessLevel::Student));
        assert!(Role::Professor.satisfies(AccessLevel::Student));
        assert!(Role::Admin.satisfies(AccessLevel::Student));
        assert!(!Role::Student.satisfies(AccessLevel::Professor));
        assert!(Role::Professor.satisfies(AccessLevel::Professor));
        assert!(Role::Admin.satisfies(AccessLevel::Professor));
        assert!(!Role::Professor.satisfies(AccessLevel::Admin));
        assert!(Role::Admin.satisfies(AccessLevel::Admin));
    }

    #[test]
    fn test_default_action_by_file_type() {
        assert_eq!(FileType::Video.default_action(), AccessAction::Stream);
        assert_eq!(FileType::Pdf.default_action(), AccessAction::Download);
        assert_eq!(FileType::Image.default_action(), AccessAction::Download);
        assert_eq!(FileType::Audio.default_action(), AccessAction::Download);
        assert_eq!(FileType::Document.default_action(), AccessAction::Download);
    }

    #[test]
    fn test_file_expiry() {
        let now = Utc::now();
        let mut file = sample_file();
        assert!(!file.is_expired(now));
        assert!(file.is_available(now));

        file.expires_at = Some(now - Duration::seconds(1));
        assert!(file.is_expired(now));
        assert!(!file.is_available(now));

        file.expires_at = None;
        file.is_active = false;
        assert!(!file.is_available(now));
    }

    #[test]
    fn test_file_size_mb() {
        let file = sample_file();
        assert_eq!(file.file_size_mb(), 10.0);
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Professor".parse::<Role>().unwrap(), Role::Professor);
        assert!("superuser".parse::<Role>().is_err());
    }
}
