//! Postflow CLI — media automation between the local filesystem, Google
//! Drive, Google Cloud Storage, and the Instagram Graph API.
//!
//! Every subcommand is an independent, strictly sequential run driven by
//! two YAML files: business settings and credentials. Any fatal condition
//! prints its diagnostic and exits non-zero.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use postflow_assembler::{FreesoundClient, SlideshowBuilder, SlideshowOptions, MUSIC_QUERIES};
use postflow_auth::{scopes, ServiceAccountAuth};
use postflow_core::{AppConfig, Credentials, MediaReference};
use postflow_drive::DriveClient;
use postflow_instagram::{GraphClient, PublishOptions, ReelPublisher};
use postflow_storage::{ensure_bucket, GcsStorage, Storage};

/// Freesound duration filter in seconds.
const MUSIC_DURATION_RANGE: (u32, u32) = (30, 300);

#[derive(Parser)]
#[command(name = "postflow", about = "Media automation for social publishing")]
struct Cli {
    /// Path to the business settings file
    #[arg(long, short = 'c', default_value = "business_config.yaml", global = true)]
    config: PathBuf,

    /// Path to the credentials file
    #[arg(long, default_value = "credentials.yml", global = true)]
    credentials: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the newest Drive subfolder into local_media_root
    DrivePull,
    /// Push local_media_folder up to a same-named Drive folder
    DrivePush,
    /// Upload the configured local video to the private GCS bucket
    GcsUpload,
    /// Render a slideshow video with background music
    Assemble {
        /// Path to the ffmpeg binary
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg_path: String,
    },
    /// Publish the configured GCS video as an Instagram Reel
    Publish,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize result")?;
    println!("{}", out);
    Ok(())
}

fn service_account_auth(creds: &Credentials) -> anyhow::Result<ServiceAccountAuth> {
    let key_path = creds.service_account_file()?;
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;
    Ok(ServiceAccountAuth::from_key_file(key_path, http_client)?)
}

async fn drive_client(creds: &Credentials, scope: &str) -> anyhow::Result<DriveClient> {
    let auth = service_account_auth(creds)?;
    let token = auth.fetch_token(scope).await?;
    Ok(DriveClient::new(token.access_token)?)
}

async fn drive_pull(cfg: &AppConfig, creds: &Credentials) -> anyhow::Result<()> {
    let root_id = cfg
        .google_drive_folder_id
        .as_deref()
        .context("business config is missing 'google_drive_folder_id'")?;
    let local_root = cfg
        .local_media_root
        .as_deref()
        .context("business config is missing 'local_media_root'")?;

    let client = drive_client(creds, scopes::DRIVE_READONLY).await?;
    let report = postflow_drive::pull_latest(&client, root_id, local_root).await?;
    print_json(&serde_json::json!({
        "folder": report.folder_name,
        "local_dir": report.local_dir,
        "downloaded": report.downloaded,
        "skipped": report.skipped,
    }))
}

async fn drive_push(cfg: &AppConfig, creds: &Credentials) -> anyhow::Result<()> {
    let root_id = cfg
        .google_drive_folder_id
        .as_deref()
        .context("business config is missing 'google_drive_folder_id'")?;
    let local_folder = cfg
        .local_media_folder
        .as_deref()
        .context("business config is missing 'local_media_folder'")?;

    let client = drive_client(creds, scopes::DRIVE).await?;
    let report = postflow_drive::push_folder(&client, root_id, local_folder).await?;
    print_json(&serde_json::json!({
        "folder_id": report.folder_id,
        "uploaded": report.uploaded,
        "skipped": report.skipped,
    }))
}

async fn gcs_upload(cfg: &AppConfig, creds: &Credentials) -> anyhow::Result<()> {
    let post = cfg.instagram_post()?;
    let local_file = cfg
        .instagram_local_media_path
        .as_deref()
        .context("business config is missing 'instagram_local_media_path'")?;
    if !local_file.is_file() {
        anyhow::bail!("Local file to upload not found: {}", local_file.display());
    }

    let auth = service_account_auth(creds)?;
    let project_id = auth
        .key()
        .project_id
        .clone()
        .context("Service account key is missing 'project_id'")?;
    let token = auth.fetch_token(scopes::DEVSTORAGE_READ_WRITE).await?;
    let http_client = reqwest::Client::new();
    let state = ensure_bucket(
        &http_client,
        &token.access_token,
        &project_id,
        &post.gcs_bucket_name,
        &cfg.bucket_location,
    )
    .await?;
    tracing::info!(bucket = %post.gcs_bucket_name, ?state, "Bucket ready");

    let storage = GcsStorage::new(post.gcs_bucket_name.clone(), creds.service_account_file()?)?;
    let data = tokio::fs::read(local_file)
        .await
        .with_context(|| format!("Failed to read {}", local_file.display()))?;
    storage.put_new(&post.gcs_object_name, data).await.context(
        "Upload failed. If the object already exists, rename it or delete the existing object",
    )?;

    print_json(&serde_json::json!({
        "bucket": post.gcs_bucket_name,
        "object": post.gcs_object_name,
        "gcs_path": format!("gs://{}/{}", post.gcs_bucket_name, post.gcs_object_name),
    }))
}

async fn assemble(
    cfg: &AppConfig,
    creds: &Credentials,
    ffmpeg_path: &str,
) -> anyhow::Result<()> {
    let slideshow = cfg.slideshow()?;
    let images = postflow_assembler::collect_images(&slideshow.images_dir)?;
    if images.is_empty() {
        anyhow::bail!("No images found in {}", slideshow.images_dir.display());
    }

    // Scratch dir for the music preview; dropped (and deleted) after render.
    let scratch = tempfile::tempdir().context("Failed to create temp directory")?;
    let freesound = FreesoundClient::new(creds.freesound_token()?)?;
    let track = freesound
        .fetch_random_track(&MUSIC_QUERIES, MUSIC_DURATION_RANGE, scratch.path())
        .await?;
    if track.is_none() {
        tracing::warn!("Could not find suitable music. Video will have no audio");
    }

    let builder = SlideshowBuilder::new(ffmpeg_path);
    let options = SlideshowOptions::from(slideshow);
    builder
        .render(
            &images,
            track.as_ref().map(|(path, _)| path.as_path()),
            &slideshow.output_path,
            &options,
        )
        .await?;

    print_json(&serde_json::json!({
        "output": slideshow.output_path,
        "images": images.len(),
        "music": track.as_ref().map(|(_, entry)| entry.name.clone()),
    }))
}

async fn publish(cfg: &AppConfig, creds: &Credentials) -> anyhow::Result<()> {
    let post = cfg.instagram_post()?;
    let ig_id = creds.instagram_id()?;
    let token = creds.page_access_token()?;

    let storage = GcsStorage::new(post.gcs_bucket_name.clone(), creds.service_account_file()?)?;
    let graph = GraphClient::new(token)?;
    let publisher = ReelPublisher::new(&storage, &graph, PublishOptions::from(post))?;

    let media = MediaReference::new(post.gcs_bucket_name.clone(), post.gcs_object_name.clone());
    let published = publisher.publish(ig_id, &media, &post.caption).await?;

    print_json(&serde_json::json!({ "media_id": published.media_id }))
}

fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    Ok(AppConfig::load(path)?)
}

fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    Ok(Credentials::load(path)?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let cfg = load_config(&cli.config)?;
    let creds = load_credentials(&cli.credentials)?;

    match cli.command {
        Commands::DrivePull => drive_pull(&cfg, &creds).await,
        Commands::DrivePush => drive_push(&cfg, &creds).await,
        Commands::GcsUpload => gcs_upload(&cfg, &creds).await,
        Commands::Assemble { ffmpeg_path } => assemble(&cfg, &creds, &ffmpeg_path).await,
        Commands::Publish => publish(&cfg, &creds).await,
    }
}
