//! Storage abstraction trait
//!
//! All storage backends used by the workflows implement this trait. It is
//! intentionally narrow: the upload flow needs a create-only put, and the
//! publication flow needs an existence check plus a signed GET URL.

use std::time::Duration;

use async_trait::async_trait;
use postflow_core::{AppError, SignedUrl};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage abstraction trait
///
/// Objects are addressed by their key within the backend's bucket. Keys must
/// not contain `..` or a leading `/`.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The bucket this backend is bound to.
    fn bucket(&self) -> &str;

    /// Whether an object exists.
    async fn exists(&self, object: &str) -> StorageResult<bool>;

    /// Upload an object, failing with `AlreadyExists` if the key is taken.
    /// Uploaded objects stay private; access goes through signed URLs.
    async fn put_new(&self, object: &str, data: Vec<u8>) -> StorageResult<()>;

    /// Issue a signed GET URL for a private object, valid for `expires_in`.
    async fn signed_get_url(&self, object: &str, expires_in: Duration) -> StorageResult<SignedUrl>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_to_app_error() {
        let err: AppError = StorageError::AlreadyExists("videos/my_reel.mp4".to_string()).into();
        match err {
            AppError::Storage(msg) => assert!(msg.contains("videos/my_reel.mp4")),
            other => panic!("expected Storage error, got {:?}", other),
        }
    }
}
