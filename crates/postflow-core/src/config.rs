//! Configuration module
//!
//! Two YAML files drive every workflow: the business settings file
//! (`business_config.yaml`) and the credentials file (`credentials.yml`).
//! Both are loaded exactly once at startup into explicit structs and passed
//! down as parameters; no component reads configuration from ambient state.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, AppResult};

const DEFAULT_SIGNED_URL_EXPIRY_MINUTES: u64 = 15;
const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;
const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 120;
const DEFAULT_BUCKET_LOCATION: &str = "us-central1";
const DEFAULT_SLIDESHOW_FPS: u32 = 24;
const DEFAULT_SECONDS_PER_IMAGE: f64 = 2.0;
const DEFAULT_MUSIC_VOLUME: f64 = 0.5;

/// Business settings (`business_config.yaml`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Drive folder id under which media folders are mirrored.
    pub google_drive_folder_id: Option<String>,
    /// Local root that receives mirrored Drive folders.
    pub local_media_root: Option<PathBuf>,
    /// Local folder pushed up to Drive.
    pub local_media_folder: Option<PathBuf>,
    /// Location used when a missing GCS bucket has to be created.
    #[serde(default = "default_bucket_location")]
    pub bucket_location: String,
    /// Local video file uploaded to GCS ahead of publication.
    pub instagram_local_media_path: Option<PathBuf>,
    pub instagram_post: Option<InstagramPostConfig>,
    pub slideshow: Option<SlideshowConfig>,
}

/// Settings for the Reel publication workflow.
#[derive(Debug, Clone, Deserialize)]
pub struct InstagramPostConfig {
    pub gcs_bucket_name: String,
    pub gcs_object_name: String,
    pub caption: String,
    #[serde(default = "default_signed_url_expiry_minutes")]
    pub signed_url_expiry_minutes: u64,
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

/// Settings for slideshow assembly.
#[derive(Debug, Clone, Deserialize)]
pub struct SlideshowConfig {
    pub images_dir: PathBuf,
    pub output_path: PathBuf,
    #[serde(default = "default_slideshow_fps")]
    pub fps: u32,
    #[serde(default = "default_seconds_per_image")]
    pub seconds_per_image: f64,
    #[serde(default = "default_music_volume")]
    pub music_volume: f64,
}

/// Operator credentials (`credentials.yml`). Never logged.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    /// Instagram Business account id.
    pub instagram_id: Option<String>,
    /// Long-lived Page access token.
    pub page_access_token: Option<String>,
    /// Path to the Google service-account JSON key.
    pub service_account_file: Option<PathBuf>,
    /// Freesound API token.
    pub freesound: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("instagram_id", &self.instagram_id)
            .field("page_access_token", &self.page_access_token.as_ref().map(|_| "<redacted>"))
            .field("service_account_file", &self.service_account_file)
            .field("freesound", &self.freesound.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn default_bucket_location() -> String {
    DEFAULT_BUCKET_LOCATION.to_string()
}

fn default_signed_url_expiry_minutes() -> u64 {
    DEFAULT_SIGNED_URL_EXPIRY_MINUTES
}

fn default_poll_interval_seconds() -> u64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}

fn default_max_poll_attempts() -> u32 {
    DEFAULT_MAX_POLL_ATTEMPTS
}

fn default_slideshow_fps() -> u32 {
    DEFAULT_SLIDESHOW_FPS
}

fn default_seconds_per_image() -> f64 {
    DEFAULT_SECONDS_PER_IMAGE
}

fn default_music_volume() -> f64 {
    DEFAULT_MUSIC_VOLUME
}

fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> AppResult<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read {} at {}: {}", what, path.display(), e))
    })?;
    serde_yaml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("Invalid {} ({}): {}", what, path.display(), e)))
}

impl AppConfig {
    pub fn load(path: &Path) -> AppResult<Self> {
        load_yaml(path, "business config")
    }

    /// The `instagram_post` section, required by the GCS upload and
    /// publication workflows.
    pub fn instagram_post(&self) -> AppResult<&InstagramPostConfig> {
        self.instagram_post.as_ref().ok_or_else(|| {
            AppError::Config("business config is missing the 'instagram_post' section".to_string())
        })
    }

    pub fn slideshow(&self) -> AppResult<&SlideshowConfig> {
        self.slideshow.as_ref().ok_or_else(|| {
            AppError::Config("business config is missing the 'slideshow' section".to_string())
        })
    }
}

impl Credentials {
    pub fn load(path: &Path) -> AppResult<Self> {
        load_yaml(path, "credentials")
    }

    pub fn instagram_id(&self) -> AppResult<&str> {
        self.instagram_id
            .as_deref()
            .ok_or_else(|| AppError::Config("credentials are missing 'instagram_id'".to_string()))
    }

    pub fn page_access_token(&self) -> AppResult<&str> {
        self.page_access_token.as_deref().ok_or_else(|| {
            AppError::Config("credentials are missing 'page_access_token'".to_string())
        })
    }

    pub fn service_account_file(&self) -> AppResult<&Path> {
        self.service_account_file.as_deref().ok_or_else(|| {
            AppError::Config("credentials are missing 'service_account_file'".to_string())
        })
    }

    pub fn freesound_token(&self) -> AppResult<&str> {
        self.freesound
            .as_deref()
            .ok_or_else(|| AppError::Config("credentials are missing 'freesound'".to_string()))
    }
}
