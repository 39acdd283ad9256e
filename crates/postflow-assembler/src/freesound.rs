//! Freesound API client: text search filtered to CC0 music, random track
//! selection, and preview download.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use rand::seq::{IndexedRandom, SliceRandom};
use regex::Regex;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;

const FREESOUND_API_BASE: &str = "https://freesound.org/apiv2";
const HTTP_TIMEOUT_SECS: u64 = 120;
const SEARCH_FIELDS: &str = "id,name,previews,duration";

/// Queries for background music suitable for showcasing masonry work.
pub const MUSIC_QUERIES: [&str; 6] = [
    "corporate",
    "inspirational",
    "uplifting",
    "cinematic",
    "motivational",
    "powerful",
];

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("valid filename regex"));

/// Strip characters that would break a filesystem path.
fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "").to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Previews {
    #[serde(rename = "preview-hq-mp3")]
    pub preview_hq_mp3: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoundEntry {
    pub id: u64,
    pub name: String,
    pub previews: Previews,
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SoundEntry>,
}

pub struct FreesoundClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl FreesoundClient {
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_base_url(token, FREESOUND_API_BASE)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client for Freesound")?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Search for CC0 music tracks matching `query` within a duration range
    /// in seconds.
    pub async fn search_music(
        &self,
        query: &str,
        duration_range: (u32, u32),
    ) -> Result<Vec<SoundEntry>> {
        let url = format!("{}/search/text/", self.base_url);
        let filter = format!(
            "duration:[{} TO {}] tag:music license:\"Creative Commons 0\"",
            duration_range.0, duration_range.1
        );

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Token {}", self.token))
            .query(&[
                ("query", query),
                ("filter", filter.as_str()),
                ("fields", SEARCH_FIELDS),
            ])
            .send()
            .await
            .context("Failed to reach Freesound")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Freesound search failed: {} - {}", status, body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Freesound search response")?;
        Ok(parsed.results)
    }

    /// Download a track's HQ MP3 preview into `dir`, returning the path.
    pub async fn download_preview(&self, sound: &SoundEntry, dir: &Path) -> Result<PathBuf> {
        let dest = dir.join(format!("{}.mp3", sanitize_filename(&sound.name)));

        let response = self
            .http_client
            .get(&sound.previews.preview_hq_mp3)
            .send()
            .await
            .context("Failed to download music preview")?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Music preview download failed: {}", status));
        }

        let mut file = tokio::fs::File::create(&dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        tracing::info!(
            track = %sound.name,
            duration_secs = sound.duration,
            path = %dest.display(),
            "Downloaded music preview"
        );
        Ok(dest)
    }

    /// Try the queries in random order and return a random matching track
    /// downloaded into `dir`. `None` when no query yields a usable track;
    /// the slideshow is then rendered silent.
    pub async fn fetch_random_track(
        &self,
        queries: &[&str],
        duration_range: (u32, u32),
        dir: &Path,
    ) -> Result<Option<(PathBuf, SoundEntry)>> {
        let mut shuffled: Vec<&str> = queries.to_vec();
        shuffled.shuffle(&mut rand::rng());

        for query in shuffled {
            let results = match self.search_music(query, duration_range).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "Freesound search failed, trying next query");
                    continue;
                }
            };
            let Some(selected) = results.choose(&mut rand::rng()).cloned() else {
                tracing::info!(query = %query, "No results for query");
                continue;
            };
            match self.download_preview(&selected, dir).await {
                Ok(path) => return Ok(Some((path, selected))),
                Err(e) => {
                    tracing::warn!(track = %selected.name, error = %e, "Preview download failed, trying next query");
                }
            }
        }
        Ok(None)
    }
}

impl std::fmt::Debug for FreesoundClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreesoundClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}
