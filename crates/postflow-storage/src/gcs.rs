use std::path::Path as FsPath;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use http::Method;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutMode, PutOptions, PutPayload, Result as ObjectResult};

use postflow_core::SignedUrl;

use crate::traits::{Storage, StorageError, StorageResult};

/// Google Cloud Storage implementation
///
/// Authenticates with a service-account JSON key; the same key signs the
/// V4 signed URLs issued by `signed_get_url`.
#[derive(Debug)]
pub struct GcsStorage {
    store: GoogleCloudStorage,
    bucket: String,
}

impl GcsStorage {
    /// Create a new GcsStorage instance bound to `bucket`.
    ///
    /// # Arguments
    /// * `bucket` - GCS bucket name
    /// * `service_account_path` - Path to the service-account JSON key
    pub fn new(bucket: String, service_account_path: &FsPath) -> StorageResult<Self> {
        let store = GoogleCloudStorageBuilder::from_env()
            .with_bucket_name(bucket.clone())
            .with_service_account_path(service_account_path.to_string_lossy().to_string())
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(GcsStorage { store, bucket })
    }

    fn validate_key(object: &str) -> StorageResult<()> {
        if object.is_empty() || object.contains("..") || object.starts_with('/') {
            return Err(StorageError::BackendError(format!(
                "Invalid object key: {:?}",
                object
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for GcsStorage {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn exists(&self, object: &str) -> StorageResult<bool> {
        Self::validate_key(object)?;
        let location = Path::from(object.to_string());

        let result: ObjectResult<_> = self.store.head(&location).await;
        match result {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(other) => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %object,
                    "GCS head request failed"
                );
                Err(StorageError::BackendError(other.to_string()))
            }
        }
    }

    async fn put_new(&self, object: &str, data: Vec<u8>) -> StorageResult<()> {
        Self::validate_key(object)?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);
        let location = Path::from(object.to_string());

        let start = std::time::Instant::now();

        // PutMode::Create is the overwrite guard: the request fails if an
        // object with this key already exists.
        let options = PutOptions {
            mode: PutMode::Create,
            ..Default::default()
        };
        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(bytes), options)
            .await;

        result.map_err(|e| match e {
            ObjectStoreError::AlreadyExists { .. } => {
                StorageError::AlreadyExists(object.to_string())
            }
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %object,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS upload failed"
                );
                StorageError::UploadFailed(other.to_string())
            }
        })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %object,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS upload successful"
        );

        Ok(())
    }

    async fn signed_get_url(
        &self,
        object: &str,
        expires_in: Duration,
    ) -> StorageResult<SignedUrl> {
        Self::validate_key(object)?;
        let location = Path::from(object.to_string());

        let issued_at = Utc::now();
        let url_result: ObjectResult<_> = self
            .store
            .signed_url(Method::GET, &location, expires_in)
            .await;

        let url = url_result
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .to_string();

        tracing::debug!(
            bucket = %self.bucket,
            key = %object,
            expires_in_secs = expires_in.as_secs(),
            "Issued signed GET URL"
        );

        Ok(SignedUrl::new(url, issued_at, expires_in))
    }
}
