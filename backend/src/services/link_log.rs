use crate::error::SyncError;
use crate::models::{ListingKind, VideoLink};
use log::{info, warn};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only, line-delimited record of the links kept for one listing kind of one channel:
/// `<root>/<channel>/<kind>.txt`.
#[derive(Debug, Clone)]
pub struct LinkLog {
    path: PathBuf,
}

impl LinkLog {
    pub fn new(root: &Path, channel: &str, kind: ListingKind) -> Self {
        LinkLog {
            path: root.join(channel).join(kind.log_file_name()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Empties the log (creating it and its directory if needed) before a fresh scan.
    pub async fn reset(&self) -> Result<(), SyncError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&self.path, b"").await?;
        Ok(())
    }

    pub async fn append(&self, link: &VideoLink) -> Result<(), SyncError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{}\n", link.raw_url).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Reads the logged links back in order. A missing log reads as empty;
    /// lines without a video id are skipped.
    pub async fn read_all(&self) -> Result<Vec<VideoLink>, SyncError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut links = Vec::new();
        for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
            match VideoLink::parse(line) {
                Ok(link) => links.push(link),
                Err(e) => warn!("Skipping unreadable line in {}: {e}", self.path.display()),
            }
        }
        info!("Read {} links from {}", links.len(), self.path.display());
        Ok(links)
    }
}
