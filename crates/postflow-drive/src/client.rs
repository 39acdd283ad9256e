//! Thin Drive v3 REST client.
//!
//! Covers exactly the calls the mirror operations need: query files and
//! folders, create a folder, stream a download, multipart-upload a file.
//! The bearer token is fetched once per run by the caller (service-account
//! JWT grant) and handed in; this client does not refresh it.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

use postflow_core::{AppError, AppResult};

const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";
const DRIVE_UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";
const HTTP_TIMEOUT_SECS: u64 = 300;
const MULTIPART_BOUNDARY: &str = "postflow_related_boundary";

pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// A file or folder as returned by the Drive files API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub created_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

/// Escape a value interpolated into a Drive query string.
fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Guess a content type from the file extension; Drive stores it as the
/// file's mime type. Unknown extensions fall back to octet-stream.
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mp3") => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

pub struct DriveClient {
    http_client: reqwest::Client,
    base_url: String,
    upload_base_url: String,
    token: String,
}

impl DriveClient {
    pub fn new(token: impl Into<String>) -> AppResult<Self> {
        Self::with_base_urls(token, DRIVE_API_BASE, DRIVE_UPLOAD_BASE)
    }

    /// Build a client against caller-chosen base URLs (tests point these at
    /// a local mock server).
    pub fn with_base_urls(
        token: impl Into<String>,
        base_url: impl Into<String>,
        upload_base_url: impl Into<String>,
    ) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_base_url: upload_base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    async fn list(
        &self,
        query: &str,
        order_by: Option<&str>,
        page_size: Option<u32>,
        fields: &str,
    ) -> AppResult<Vec<DriveFile>> {
        let url = format!("{}/files", self.base_url);
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("fields", format!("files({})", fields)),
        ];
        if let Some(order_by) = order_by {
            params.push(("orderBy", order_by.to_string()));
        }
        if let Some(page_size) = page_size {
            params.push(("pageSize", page_size.to_string()));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&params)
            .send()
            .await?;

        let list: FileList = Self::parse_success(response).await?;
        Ok(list.files)
    }

    /// The single most recently created subfolder under `root_id`, if any.
    pub async fn latest_subfolder(&self, root_id: &str) -> AppResult<Option<DriveFile>> {
        let query = format!(
            "'{}' in parents and mimeType='{}' and trashed=false",
            escape_query_value(root_id),
            FOLDER_MIME_TYPE
        );
        let mut folders = self
            .list(
                &query,
                Some("createdTime desc"),
                Some(1),
                "id,name,createdTime",
            )
            .await?;
        Ok(if folders.is_empty() {
            None
        } else {
            Some(folders.remove(0))
        })
    }

    /// All non-trashed children of a folder.
    pub async fn list_children(&self, folder_id: &str) -> AppResult<Vec<DriveFile>> {
        let query = format!(
            "'{}' in parents and trashed=false",
            escape_query_value(folder_id)
        );
        self.list(&query, None, None, "id,name").await
    }

    /// A non-trashed subfolder of `parent_id` named `name`, if one exists.
    pub async fn find_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> AppResult<Option<DriveFile>> {
        let query = format!(
            "'{}' in parents and name='{}' and mimeType='{}' and trashed=false",
            escape_query_value(parent_id),
            escape_query_value(name),
            FOLDER_MIME_TYPE
        );
        let mut folders = self.list(&query, None, None, "id,name").await?;
        Ok(if folders.is_empty() {
            None
        } else {
            Some(folders.remove(0))
        })
    }

    pub async fn create_folder(&self, name: &str, parent_id: &str) -> AppResult<DriveFile> {
        let url = format!("{}/files", self.base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("fields", "id,name")])
            .json(&serde_json::json!({
                "name": name,
                "mimeType": FOLDER_MIME_TYPE,
                "parents": [parent_id],
            }))
            .send()
            .await?;

        let folder: DriveFile = Self::parse_success(response).await?;
        tracing::info!(folder_id = %folder.id, name = %name, "Created Drive folder");
        Ok(folder)
    }

    pub async fn find_or_create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> AppResult<DriveFile> {
        if let Some(existing) = self.find_folder(name, parent_id).await? {
            return Ok(existing);
        }
        self.create_folder(name, parent_id).await
    }

    /// Stream a file's content to `dest`. Returns the byte count written.
    pub async fn download_to(&self, file_id: &str, dest: &Path) -> AppResult<u64> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
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

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::Network(e.to_string()))?;
            written += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(file_id = %file_id, dest = %dest.display(), size_bytes = written, "Downloaded Drive file");
        Ok(written)
    }

    /// Upload a local file into `folder_id` (multipart/related: metadata
    /// JSON part + media part).
    pub async fn upload_file(&self, folder_id: &str, path: &Path) -> AppResult<DriveFile> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                AppError::Config(format!("Invalid upload file name: {}", path.display()))
            })?
            .to_string();
        let data = tokio::fs::read(path).await?;

        let metadata = serde_json::json!({ "name": name, "parents": [folder_id] });
        let body = build_related_body(&metadata, content_type_for(path), &data);

        let url = format!("{}/files", self.upload_base_url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .query(&[("uploadType", "multipart"), ("fields", "id,name")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={}", MULTIPART_BOUNDARY),
            )
            .body(body)
            .send()
            .await?;

        let uploaded: DriveFile = Self::parse_success(response).await?;
        tracing::info!(file_id = %uploaded.id, name = %uploaded.name, "Uploaded file to Drive");
        Ok(uploaded)
    }

    async fn parse_success<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let raw = response.text().await?;
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(AppError::Auth(format!(
                "Drive rejected credential (HTTP {}): {}",
                status.as_u16(),
                raw
            )));
        }
        if !status.is_success() {
            return Err(AppError::Provider {
                status: status.as_u16(),
                body: raw,
            });
        }
        serde_json::from_str(&raw).map_err(|e| AppError::Provider {
            status: status.as_u16(),
            body: format!("Unparseable Drive response ({}): {}", e, raw),
        })
    }
}

fn build_related_body(
    metadata: &serde_json::Value,
    content_type: &str,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Type: application/json; charset=UTF-8\r\n\r\n{meta}\r\n--{b}\r\nContent-Type: {ct}\r\n\r\n",
            b = MULTIPART_BOUNDARY,
            meta = metadata,
            ct = content_type
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
