//! Domain models

pub mod access_grant;
pub mod access_log;
pub mod file;
pub mod principal;
pub mod upload_session;

pub use access_grant::{AccessAction, AccessGrant};
pub use access_log::{AccessLogEntry, LogAction, NewAccessLog};
pub use file::{
    AccessDeniedResponse, AccessLevel, FileAccessResponse, FileSummary, FileType, Role, StoredFile,
};
pub use principal::{ClientContext, Principal};
pub use upload_session::{
    CreateUploadSessionRequest, CreateUploadSessionResponse, UploadCompleteResponse,
    UploadSession, UploadStatus,
};
