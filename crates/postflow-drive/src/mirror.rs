//! Mirror operations between Drive and the local filesystem.
//!
//! Both directions skip files that already exist on the receiving side,
//! matched by name only. Nothing else is resumable: an interrupted run is
//! simply re-run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use postflow_core::{AppError, AppResult};

use crate::client::DriveClient;

/// Outcome of a Drive → local pull.
#[derive(Debug)]
pub struct PullReport {
    pub folder_name: String,
    pub local_dir: PathBuf,
    pub downloaded: Vec<String>,
    pub skipped: usize,
}

/// Outcome of a local → Drive push.
#[derive(Debug)]
pub struct PushReport {
    pub folder_id: String,
    pub uploaded: Vec<String>,
    pub skipped: usize,
}

/// Download the most recently created subfolder under `root_id` into
/// `<local_root>/<folder_name>`, skipping files already present locally.
pub async fn pull_latest(
    client: &DriveClient,
    root_id: &str,
    local_root: &Path,
) -> AppResult<PullReport> {
    let latest = client
        .latest_subfolder(root_id)
        .await?
        .ok_or_else(|| {
            AppError::Storage(format!("No subfolders found under Drive root {}", root_id))
        })?;
    tracing::info!(
        folder = %latest.name,
        created = %latest.created_time.as_deref().unwrap_or("unknown"),
        "Latest Drive folder"
    );

    let local_dir = local_root.join(&latest.name);
    tokio::fs::create_dir_all(&local_dir).await?;

    let existing = local_file_names(&local_dir)?;
    let remote_files = client.list_children(&latest.id).await?;

    let mut downloaded = Vec::new();
    let mut skipped = 0usize;
    for file in remote_files {
        if existing.contains(&file.name) {
            skipped += 1;
            continue;
        }
        let dest = local_dir.join(&file.name);
        client.download_to(&file.id, &dest).await?;
        tracing::info!(name = %file.name, "Downloaded");
        downloaded.push(file.name);
    }

    tracing::info!(
        folder = %latest.name,
        downloaded = downloaded.len(),
        skipped,
        "Drive pull complete"
    );
    Ok(PullReport {
        folder_name: latest.name,
        local_dir,
        downloaded,
        skipped,
    })
}

/// Push every file in `local_folder` into a same-named Drive folder under
/// `root_id`, creating the folder if needed and skipping files Drive
/// already has.
pub async fn push_folder(
    client: &DriveClient,
    root_id: &str,
    local_folder: &Path,
) -> AppResult<PushReport> {
    if !local_folder.is_dir() {
        return Err(AppError::Config(format!(
            "{} not found or not a directory",
            local_folder.display()
        )));
    }
    let folder_name = local_folder
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            AppError::Config(format!("Invalid local folder name: {}", local_folder.display()))
        })?;

    let drive_folder = client.find_or_create_folder(folder_name, root_id).await?;
    let existing: HashSet<String> = client
        .list_children(&drive_folder.id)
        .await?
        .into_iter()
        .map(|f| f.name)
        .collect();

    let mut uploaded = Vec::new();
    let mut skipped = 0usize;
    let mut entries: Vec<PathBuf> = std::fs::read_dir(local_folder)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    entries.sort();

    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if existing.contains(&name) {
            skipped += 1;
            continue;
        }
        client.upload_file(&drive_folder.id, &path).await?;
        tracing::info!(name = %name, "Uploaded");
        uploaded.push(name);
    }

    tracing::info!(
        folder = %folder_name,
        uploaded = uploaded.len(),
        skipped,
        "Drive push complete"
    );
    Ok(PushReport {
        folder_id: drive_folder.id,
        uploaded,
        skipped,
    })
}

fn local_file_names(dir: &Path) -> AppResult<HashSet<String>> {
    let mut names = HashSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
    }
    Ok(names)
}
