//! Transient domain models for the publication workflows.
//!
//! None of these are persisted: a `MediaReference` points at an object that
//! already exists in the bucket, a `SignedUrl` lives for one run, and a
//! `Container` is a provider-side handle that is consumed exactly once.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a private video object in blob storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaReference {
    pub bucket: String,
    pub object: String,
}

impl MediaReference {
    pub fn new(bucket: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            object: object.into(),
        }
    }
}

impl Display for MediaReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "gs://{}/{}", self.bucket, self.object)
    }
}

/// A time-boxed capability granting GET access to a private object.
///
/// Treated as a bearer credential: `Debug` redacts the URL, and callers log
/// it at most once at debug level.
#[derive(Clone)]
pub struct SignedUrl {
    url: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SignedUrl {
    pub fn new(url: String, issued_at: DateTime<Utc>, validity: Duration) -> Self {
        let expires_at = issued_at
            + chrono::Duration::from_std(validity).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            url,
            issued_at,
            expires_at,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for SignedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedUrl")
            .field("url", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Processing status of a media container, as reported by the Graph API.
///
/// Only `Finished` and `Error` are terminal. Values this build does not know
/// about deserialize to `Other` and are treated as still in progress, so a
/// new provider state degrades to a poll timeout rather than a parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerStatus {
    InProgress,
    Finished,
    Error,
    #[serde(other)]
    Other,
}

impl ContainerStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContainerStatus::Finished | ContainerStatus::Error)
    }
}

impl Display for ContainerStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ContainerStatus::InProgress => write!(f, "IN_PROGRESS"),
            ContainerStatus::Finished => write!(f, "FINISHED"),
            ContainerStatus::Error => write!(f, "ERROR"),
            ContainerStatus::Other => write!(f, "OTHER"),
        }
    }
}

/// Server-side handle for an in-progress upload awaiting processing.
#[derive(Debug, Clone)]
pub struct Container {
    pub id: String,
    pub status: ContainerStatus,
}

/// The terminal artifact of a successful publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMedia {
    pub media_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_url_expiry_is_issuance_plus_window() {
        let issued = Utc::now();
        let url = SignedUrl::new(
            "https://storage.example/v.mp4?sig=abc".to_string(),
            issued,
            Duration::from_secs(15 * 60),
        );
        assert_eq!(url.expires_at() - issued, chrono::Duration::minutes(15));
        assert!(!url.is_expired(issued));
        assert!(url.is_expired(issued + chrono::Duration::minutes(15)));
        assert!(url.is_expired(issued + chrono::Duration::minutes(16)));
    }

    #[test]
    fn signed_url_debug_redacts_url() {
        let url = SignedUrl::new(
            "https://storage.example/v.mp4?sig=secret".to_string(),
            Utc::now(),
            Duration::from_secs(60),
        );
        let debug = format!("{:?}", url);
        assert!(!debug.contains("sig=secret"));
    }

    #[test]
    fn container_status_parses_provider_values() {
        let s: ContainerStatus = serde_json::from_str("\"IN_PROGRESS\"").unwrap();
        assert_eq!(s, ContainerStatus::InProgress);
        assert!(!s.is_terminal());

        let s: ContainerStatus = serde_json::from_str("\"FINISHED\"").unwrap();
        assert!(s.is_terminal());

        let s: ContainerStatus = serde_json::from_str("\"ERROR\"").unwrap();
        assert!(s.is_terminal());
    }

    #[test]
    fn unknown_status_is_non_terminal() {
        let s: ContainerStatus = serde_json::from_str("\"EXPIRED\"").unwrap();
        assert_eq!(s, ContainerStatus::Other);
        assert!(!s.is_terminal());
    }

    #[test]
    fn media_reference_displays_as_gs_path() {
        let r = MediaReference::new("my-bucket", "videos/my_reel.mp4");
        assert_eq!(r.to_string(), "gs://my-bucket/videos/my_reel.mp4");
    }
}
