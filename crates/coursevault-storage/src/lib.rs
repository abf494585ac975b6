//! Object storage abstraction for Coursevault
//!
//! The `Storage` trait is the gateway every other component uses to reach
//! the blob store. Files are written under collision-resistant keys of the
//! form `protected/{file_type}s/{uuid}.{ext}` (see [`keys`]); delivery goes
//! through presigned GET URLs so the application server never proxies file
//! bytes.
//!
//! Backends: S3/MinIO (`storage-s3` feature) and local filesystem
//! (`storage-local`, for development).

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::generate_storage_path;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
