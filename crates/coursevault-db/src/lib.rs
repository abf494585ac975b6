//! Database repositories for the data access layer
//!
//! Each repository pairs a trait (so the service layer can run against
//! in-memory mocks in tests) with a PostgreSQL implementation using
//! dynamic sqlx queries.

pub mod db;

pub use db::access_logs::{AccessLogRepository, AccessLogRepositoryTrait};
pub use db::files::{FileRepository, FileRepositoryTrait};
pub use db::grants::{AccessGrantRepository, AccessGrantRepositoryTrait};
pub use db::upload_sessions::{UploadSessionRepository, UploadSessionRepositoryTrait};
