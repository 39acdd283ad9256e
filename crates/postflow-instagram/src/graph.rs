//! Thin client for the three Instagram Graph API operations the workflow
//! consumes: create a Reel container, fetch container status, publish.
//!
//! Authentication is a long-lived Page access token supplied by the
//! operator's credential file; this client does not refresh or validate
//! token lifetime. Non-success responses are surfaced verbatim so the
//! operator sees the provider's own error detail.

use std::time::Duration;

use serde::Deserialize;

use postflow_core::{AppError, AppResult, Container, ContainerStatus, PublishedMedia};

const GRAPH_API_VERSION: &str = "v19.0";
const GRAPH_API_BASE: &str = "https://graph.facebook.com";
const HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status_code: ContainerStatus,
}

/// A container status observation plus the raw response body, kept so the
/// ERROR terminal state can surface the provider's detail.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: ContainerStatus,
    pub raw: String,
}

pub struct GraphClient {
    http_client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl GraphClient {
    pub fn new(access_token: impl Into<String>) -> AppResult<Self> {
        let base_url = format!("{}/{}", GRAPH_API_BASE, GRAPH_API_VERSION);
        Self::with_base_url(access_token, base_url)
    }

    /// Build a client against a caller-chosen base URL (tests point this at
    /// a local mock server).
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Ask the Graph API to start ingesting the remote video as a Reel.
    pub async fn create_reel_container(
        &self,
        ig_id: &str,
        video_url: &str,
        caption: &str,
    ) -> AppResult<Container> {
        let url = format!("{}/{}/media", self.base_url, ig_id);

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("media_type", "REELS"),
                ("video_url", video_url),
                ("caption", caption),
                ("share_to_feed", "true"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let body: IdResponse = Self::parse_success(response).await?;
        tracing::info!(container_id = %body.id, "Created Reel media container");

        Ok(Container {
            id: body.id,
            status: ContainerStatus::InProgress,
        })
    }

    /// Fetch the processing status of a container.
    pub async fn container_status(&self, container_id: &str) -> AppResult<StatusReport> {
        let url = format!("{}/{}", self.base_url, container_id);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("fields", "status_code"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Provider {
                status: status.as_u16(),
                body: raw,
            });
        }

        let parsed: StatusResponse = serde_json::from_str(&raw).map_err(|e| {
            AppError::Provider {
                status: status.as_u16(),
                body: format!("Unparseable status response ({}): {}", e, raw),
            }
        })?;

        Ok(StatusReport {
            status: parsed.status_code,
            raw,
        })
    }

    /// Commit a FINISHED container as a live post.
    pub async fn publish(&self, ig_id: &str, container_id: &str) -> AppResult<PublishedMedia> {
        let url = format!("{}/{}/media_publish", self.base_url, ig_id);

        let response = self
            .http_client
            .post(&url)
            .form(&[
                ("creation_id", container_id),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;

        let body: IdResponse = Self::parse_success(response).await?;
        tracing::info!(media_id = %body.id, "Published media container");

        Ok(PublishedMedia { media_id: body.id })
    }

    async fn parse_success<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(AppError::Provider {
                status: status.as_u16(),
                body: raw,
            });
        }
        serde_json::from_str(&raw).map_err(|e| AppError::Provider {
            status: status.as_u16(),
            body: format!("Unparseable response ({}): {}", e, raw),
        })
    }
}

impl std::fmt::Debug for GraphClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphClient")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_container_posts_reel_form() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/123/media")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("media_type".into(), "REELS".into()),
                mockito::Matcher::UrlEncoded("caption".into(), "hello".into()),
                mockito::Matcher::UrlEncoded("share_to_feed".into(), "true".into()),
                mockito::Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"17890000000000001"}"#)
            .create_async()
            .await;

        let client = GraphClient::with_base_url("tok", server.url()).unwrap();
        let container = client
            .create_reel_container("123", "https://signed.example/v.mp4", "hello")
            .await
            .unwrap();

        assert_eq!(container.id, "17890000000000001");
        assert_eq!(container.status, ContainerStatus::InProgress);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn create_container_rejection_is_provider_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/123/media")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid video_url"}}"#)
            .create_async()
            .await;

        let client = GraphClient::with_base_url("tok", server.url()).unwrap();
        let err = client
            .create_reel_container("123", "https://signed.example/v.mp4", "hello")
            .await
            .unwrap_err();

        match err {
            AppError::Provider { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("Invalid video_url"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn container_status_parses_status_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/17890000000000001")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("fields".into(), "status_code".into()),
                mockito::Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"status_code":"FINISHED","id":"17890000000000001"}"#)
            .create_async()
            .await;

        let client = GraphClient::with_base_url("tok", server.url()).unwrap();
        let report = client.container_status("17890000000000001").await.unwrap();
        assert_eq!(report.status, ContainerStatus::Finished);
        assert!(report.raw.contains("FINISHED"));
    }

    #[tokio::test]
    async fn publish_returns_media_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/123/media_publish")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("creation_id".into(), "cont-1".into()),
                mockito::Matcher::UrlEncoded("access_token".into(), "tok".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"id":"18000000000000002"}"#)
            .create_async()
            .await;

        let client = GraphClient::with_base_url("tok", server.url()).unwrap();
        let media = client.publish("123", "cont-1").await.unwrap();
        assert_eq!(media.media_id, "18000000000000002");
        mock.assert_async().await;
    }

    #[test]
    fn debug_redacts_access_token() {
        let client = GraphClient::with_base_url("secret-token", "https://example.test").unwrap();
        assert!(!format!("{:?}", client).contains("secret-token"));
    }
}
