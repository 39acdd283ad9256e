//! Bucket provisioning via the GCS JSON API.
//!
//! The object-store layer has no bucket administration surface, so the
//! upload flow checks for its bucket here and creates it (private, uniform
//! access) when missing.

use serde_json::json;

use postflow_core::{AppError, AppResult};

const GCS_API_BASE: &str = "https://storage.googleapis.com/storage/v1";

/// Outcome of `ensure_bucket`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketState {
    AlreadyExists,
    Created,
}

/// Make sure `bucket` exists, creating it in `location` if it does not.
///
/// `token` is a service-account bearer token with storage admin scope.
/// Newly created buckets are private by default; nothing here changes ACLs.
pub async fn ensure_bucket(
    client: &reqwest::Client,
    token: &str,
    project_id: &str,
    bucket: &str,
    location: &str,
) -> AppResult<BucketState> {
    ensure_bucket_at(client, GCS_API_BASE, token, project_id, bucket, location).await
}

/// Same as [`ensure_bucket`] against a caller-chosen API base URL.
pub async fn ensure_bucket_at(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    project_id: &str,
    bucket: &str,
    location: &str,
) -> AppResult<BucketState> {
    let get_url = format!("{}/b/{}", base_url, bucket);
    let response = client.get(&get_url).bearer_auth(token).send().await?;

    match response.status().as_u16() {
        200 => {
            tracing::info!(bucket = %bucket, "Bucket already exists");
            return Ok(BucketState::AlreadyExists);
        }
        404 => {}
        401 | 403 => {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Credential rejected while checking bucket {}: {}",
                bucket, body
            )));
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider { status, body });
        }
    }

    tracing::info!(bucket = %bucket, location = %location, "Bucket not found, creating it");

    let create_url = format!("{}/b?project={}", base_url, project_id);
    let response = client
        .post(&create_url)
        .bearer_auth(token)
        .json(&json!({ "name": bucket, "location": location }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Provider {
            status: status.as_u16(),
            body,
        });
    }

    tracing::info!(bucket = %bucket, location = %location, "Bucket created");
    Ok(BucketState::Created)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn existing_bucket_skips_creation() {
        let mut server = mockito::Server::new_async().await;
        let get = server
            .mock("GET", "/b/my-private-bucket")
            .with_status(200)
            .with_body(r#"{"name":"my-private-bucket"}"#)
            .create_async()
            .await;
        let post = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let state = ensure_bucket_at(
            &client,
            &server.url(),
            "tok",
            "masonry-media",
            "my-private-bucket",
            "us-central1",
        )
        .await
        .unwrap();

        assert_eq!(state, BucketState::AlreadyExists);
        get.assert_async().await;
        post.assert_async().await;
    }

    #[tokio::test]
    async fn missing_bucket_is_created() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/b/new-bucket")
            .with_status(404)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/b?project=masonry-media")
            .match_body(mockito::Matcher::PartialJson(json!({
                "name": "new-bucket",
                "location": "europe-west1",
            })))
            .with_status(200)
            .with_body(r#"{"name":"new-bucket"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let state = ensure_bucket_at(
            &client,
            &server.url(),
            "tok",
            "masonry-media",
            "new-bucket",
            "europe-west1",
        )
        .await
        .unwrap();

        assert_eq!(state, BucketState::Created);
        post.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_credential_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/b/my-private-bucket")
            .with_status(403)
            .with_body(r#"{"error":"forbidden"}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = ensure_bucket_at(
            &client,
            &server.url(),
            "bad-tok",
            "masonry-media",
            "my-private-bucket",
            "us-central1",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn creation_failure_surfaces_provider_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/b/taken-name")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("POST", "/b?project=masonry-media")
            .with_status(409)
            .with_body(r#"{"error":{"message":"You already own this bucket"}}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = ensure_bucket_at(
            &client,
            &server.url(),
            "tok",
            "masonry-media",
            "taken-name",
            "us-central1",
        )
        .await
        .unwrap_err();

        match err {
            AppError::Provider { status, body } => {
                assert_eq!(status, 409);
                assert!(body.contains("already own"));
            }
            other => panic!("expected Provider error, got {:?}", other),
        }
    }
}
