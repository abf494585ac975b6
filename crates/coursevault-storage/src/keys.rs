//! Shared key generation for storage backends.
//!
//! Key format: `protected/{file_type}s/{uuid}.{ext}`. The UUID makes the key
//! collision-resistant; the client-supplied filename never reaches the store.

use coursevault_core::models::FileType;
use uuid::Uuid;

/// Generate a fresh storage path for an uploaded file.
///
/// The extension is taken from the original filename (lowercased); files
/// without an extension get `bin`. All backends must use this format for
/// consistency.
pub fn generate_storage_path(file_type: FileType, original_name: &str) -> String {
    let extension = original_name
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && *ext != original_name)
        .map(|ext| ext.to_lowercase())
        .unwrap_or_else(|| "bin".to_string());

    format!("protected/{}s/{}.{}", file_type, Uuid::new_v4(), extension)
}
