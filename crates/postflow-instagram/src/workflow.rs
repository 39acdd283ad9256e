//! Reel publication workflow.
//!
//! Five steps, strictly sequential, no branching back:
//! signed URL → reachability probe → container creation → processing poll →
//! publish. Every failure aborts the run; there is no partial-success state
//! and no resumption. Killing the process mid-poll leaves an orphaned
//! container on the provider side with no local record.

use std::time::Duration;

use chrono::Utc;
use tokio::time::sleep;

use postflow_core::{
    AppError, AppResult, ContainerStatus, InstagramPostConfig, MediaReference, PublishedMedia,
    SignedUrl,
};
use postflow_storage::Storage;

use crate::graph::GraphClient;

/// Tunables for the workflow. Defaults come from the business config.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub signed_url_expiry: Duration,
    pub poll_interval: Duration,
    pub max_poll_attempts: u32,
}

impl From<&InstagramPostConfig> for PublishOptions {
    fn from(cfg: &InstagramPostConfig) -> Self {
        Self {
            signed_url_expiry: Duration::from_secs(cfg.signed_url_expiry_minutes * 60),
            poll_interval: Duration::from_secs(cfg.poll_interval_seconds),
            max_poll_attempts: cfg.max_poll_attempts,
        }
    }
}

pub struct ReelPublisher<'a> {
    storage: &'a dyn Storage,
    graph: &'a GraphClient,
    http_client: reqwest::Client,
    options: PublishOptions,
}

impl<'a> ReelPublisher<'a> {
    pub fn new(
        storage: &'a dyn Storage,
        graph: &'a GraphClient,
        options: PublishOptions,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            storage,
            graph,
            http_client,
            options,
        })
    }

    /// Run the full workflow and return the public media id.
    pub async fn publish(
        &self,
        ig_id: &str,
        media: &MediaReference,
        caption: &str,
    ) -> AppResult<PublishedMedia> {
        if media.bucket != self.storage.bucket() {
            return Err(AppError::Config(format!(
                "Media reference targets bucket {} but storage is bound to {}",
                media.bucket,
                self.storage.bucket()
            )));
        }

        // The object must exist before URL issuance.
        if !self.storage.exists(&media.object).await? {
            return Err(AppError::Storage(format!("Object not found: {}", media)));
        }

        tracing::info!(media = %media, "Issuing signed URL");
        let signed_url = self
            .storage
            .signed_get_url(&media.object, self.options.signed_url_expiry)
            .await?;
        tracing::debug!(expires_at = %signed_url.expires_at(), "Signed URL issued");

        self.verify_reachable(&signed_url).await?;

        if signed_url.is_expired(Utc::now()) {
            return Err(AppError::Storage(
                "Signed URL expired before container creation".to_string(),
            ));
        }

        tracing::info!(ig_id = %ig_id, "Creating Reel media container");
        let container = self
            .graph
            .create_reel_container(ig_id, signed_url.url(), caption)
            .await?;

        self.wait_until_finished(&container.id).await?;

        tracing::info!(container_id = %container.id, "Publishing media container");
        let published = self.graph.publish(ig_id, &container.id).await?;
        tracing::info!(media_id = %published.media_id, "Reel published");

        Ok(published)
    }

    /// Probe the signed URL before handing it to the provider, so an
    /// unreachable asset never costs a container-creation call.
    async fn verify_reachable(&self, signed_url: &SignedUrl) -> AppResult<()> {
        tracing::info!("Verifying signed URL reachability");
        let response = self.http_client.head(signed_url.url()).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider {
                status: status.as_u16(),
                body: format!("Signed URL is not reachable: {}", body),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        tracing::info!(status = status.as_u16(), content_type = %content_type, "Signed URL reachable");
        Ok(())
    }

    /// Poll container status until a terminal state, with a bounded number
    /// of attempts. Ticks are strictly sequential; a terminal state is
    /// never re-polled.
    async fn wait_until_finished(&self, container_id: &str) -> AppResult<()> {
        for attempt in 1..=self.options.max_poll_attempts {
            let report = self.graph.container_status(container_id).await?;
            tracing::info!(
                container_id = %container_id,
                attempt,
                status = %report.status,
                "Container status"
            );

            match report.status {
                ContainerStatus::Finished => return Ok(()),
                ContainerStatus::Error => {
                    return Err(AppError::Processing(format!(
                        "Container {} processing failed: {}",
                        container_id, report.raw
                    )));
                }
                _ => {
                    if attempt < self.options.max_poll_attempts {
                        sleep(self.options.poll_interval).await;
                    }
                }
            }
        }

        Err(AppError::Timeout {
            operation: "container processing".to_string(),
            attempts: self.options.max_poll_attempts,
            waited_secs: self.options.max_poll_attempts as u64
                * self.options.poll_interval.as_secs(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use postflow_storage::{StorageError, StorageResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Storage stub whose signed URLs point at a mock server.
    struct StubStorage {
        bucket: String,
        signed_url: String,
        object_exists: bool,
        validity: Duration,
    }

    impl StubStorage {
        fn new(signed_url: String) -> Self {
            Self {
                bucket: "b".to_string(),
                signed_url,
                object_exists: true,
                validity: Duration::from_secs(900),
            }
        }
    }

    #[async_trait]
    impl Storage for StubStorage {
        fn bucket(&self) -> &str {
            &self.bucket
        }

        async fn exists(&self, _object: &str) -> StorageResult<bool> {
            Ok(self.object_exists)
        }

        async fn put_new(&self, object: &str, _data: Vec<u8>) -> StorageResult<()> {
            Err(StorageError::BackendError(format!(
                "unexpected put_new({})",
                object
            )))
        }

        async fn signed_get_url(
            &self,
            _object: &str,
            _expires_in: Duration,
        ) -> StorageResult<SignedUrl> {
            Ok(SignedUrl::new(
                self.signed_url.clone(),
                Utc::now(),
                self.validity,
            ))
        }
    }

    fn fast_options() -> PublishOptions {
        PublishOptions {
            signed_url_expiry: Duration::from_secs(900),
            poll_interval: Duration::from_millis(0),
            max_poll_attempts: 10,
        }
    }

    #[tokio::test]
    async fn publishes_after_two_pending_ticks() {
        let mut server = mockito::Server::new_async().await;

        let head = server
            .mock("HEAD", "/v.mp4")
            .with_status(200)
            .with_header("content-type", "video/mp4")
            .create_async()
            .await;
        let create = server
            .mock("POST", "/123/media")
            .with_status(200)
            .with_body(r#"{"id":"cont-1"}"#)
            .expect(1)
            .create_async()
            .await;

        let tick = AtomicUsize::new(0);
        let status = server
            .mock("GET", "/cont-1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body_from_request(move |_| {
                let n = tick.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    br#"{"status_code":"IN_PROGRESS"}"#.to_vec()
                } else {
                    br#"{"status_code":"FINISHED"}"#.to_vec()
                }
            })
            .expect(3)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/123/media_publish")
            .with_status(200)
            .with_body(r#"{"id":"media-9"}"#)
            .expect(1)
            .create_async()
            .await;

        let storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let published = publisher.publish("123", &media, "hello").await.unwrap();

        assert_eq!(published.media_id, "media-9");
        head.assert_async().await;
        create.assert_async().await;
        status.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn error_status_aborts_without_publishing() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("HEAD", "/v.mp4")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("POST", "/123/media")
            .with_status(200)
            .with_body(r#"{"id":"cont-1"}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/cont-1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status_code":"ERROR","error_message":"unsupported codec"}"#)
            .expect(1)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/123/media_publish")
            .expect(0)
            .create_async()
            .await;

        let storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();

        match err {
            AppError::Processing(detail) => assert!(detail.contains("unsupported codec")),
            other => panic!("expected Processing error, got {:?}", other),
        }
        status.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_url_skips_container_creation() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("HEAD", "/v.mp4")
            .with_status(404)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/123/media")
            .expect(0)
            .create_async()
            .await;

        let storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();

        match err {
            AppError::Provider { status, .. } => assert_eq!(status, 404),
            other => panic!("expected Provider error, got {:?}", other),
        }
        create.assert_async().await;
    }

    #[tokio::test]
    async fn perpetual_in_progress_times_out() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("HEAD", "/v.mp4")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("POST", "/123/media")
            .with_status(200)
            .with_body(r#"{"id":"cont-1"}"#)
            .create_async()
            .await;
        let status = server
            .mock("GET", "/cont-1")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status_code":"IN_PROGRESS"}"#)
            .expect(3)
            .create_async()
            .await;
        let publish = server
            .mock("POST", "/123/media_publish")
            .expect(0)
            .create_async()
            .await;

        let storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let options = PublishOptions {
            max_poll_attempts: 3,
            ..fast_options()
        };
        let publisher = ReelPublisher::new(&storage, &graph, options).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();

        match err {
            AppError::Timeout { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected Timeout error, got {:?}", other),
        }
        status.assert_async().await;
        publish.assert_async().await;
    }

    #[tokio::test]
    async fn missing_object_fails_before_any_network_call() {
        let mut server = mockito::Server::new_async().await;
        let head = server
            .mock("HEAD", "/v.mp4")
            .expect(0)
            .create_async()
            .await;

        let mut storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        storage.object_exists = false;
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();

        match err {
            AppError::Storage(msg) => assert!(msg.contains("gs://b/v.mp4")),
            other => panic!("expected Storage error, got {:?}", other),
        }
        head.assert_async().await;
    }

    #[tokio::test]
    async fn bucket_mismatch_is_config_error() {
        let server = mockito::Server::new_async().await;
        let storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("other-bucket", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn expired_signed_url_never_reaches_container_creation() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("HEAD", "/v.mp4")
            .with_status(200)
            .create_async()
            .await;
        let create = server
            .mock("POST", "/123/media")
            .expect(0)
            .create_async()
            .await;

        let mut storage = StubStorage::new(format!("{}/v.mp4", server.url()));
        storage.validity = Duration::from_secs(0);
        let graph = GraphClient::with_base_url("tok", server.url()).unwrap();
        let publisher = ReelPublisher::new(&storage, &graph, fast_options()).unwrap();

        let media = MediaReference::new("b", "v.mp4");
        let err = publisher.publish("123", &media, "hello").await.unwrap_err();

        match err {
            AppError::Storage(msg) => assert!(msg.contains("expired")),
            other => panic!("expected Storage error, got {:?}", other),
        }
        create.assert_async().await;
    }
}
