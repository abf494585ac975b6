//! Repository implementations, one module per entity.

pub mod access_logs;
pub mod files;
pub mod grants;
pub mod upload_sessions;
