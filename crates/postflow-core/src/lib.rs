//! Postflow Core Library
//!
//! This crate provides the domain models, error taxonomy, and configuration
//! loading shared by all Postflow components. Everything here is
//! request-scoped and transient: nothing in this workspace persists state
//! between runs.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{AppConfig, Credentials, InstagramPostConfig, SlideshowConfig};
pub use error::{AppError, AppResult};
pub use models::{Container, ContainerStatus, MediaReference, PublishedMedia, SignedUrl};
