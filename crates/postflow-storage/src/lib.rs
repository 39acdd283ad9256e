//! Postflow Storage Library
//!
//! Blob storage abstraction and the Google Cloud Storage backend. The
//! `Storage` trait covers exactly what the workflows need: existence
//! checks, create-only uploads (never overwrite), and signed GET URLs.
//! Bucket provisioning goes through the GCS JSON API (`bucket` module)
//! because the object-store layer has no bucket administration surface.

pub mod bucket;
pub mod gcs;
pub mod traits;

// Re-export commonly used types
pub use bucket::{ensure_bucket, BucketState};
pub use gcs::GcsStorage;
pub use traits::{Storage, StorageError, StorageResult};
