//! Google Drive v3 client and the two mirror operations built on it:
//! pull the newest Drive subfolder to disk, and push a local folder up to
//! Drive. Both skip files that already exist on the receiving side; that is
//! the only resumable state across runs.

pub mod client;
pub mod mirror;

pub use client::{DriveClient, DriveFile};
pub use mirror::{pull_latest, push_folder, PullReport, PushReport};
