use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::config::settings::AppConfig;
use crate::modules::encryption::model::VideoName;

/// Filesystem layout for originals and encrypted HLS output.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    pub original_dir: PathBuf,
    pub encrypted_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            root: config.upload_dir.clone(),
            original_dir: config.original_dir(),
            encrypted_dir: config.encrypted_dir(),
        }
    }

    pub async fn ensure_layout(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.original_dir).await?;
        fs::create_dir_all(&self.encrypted_dir).await?;
        info!(
            "Upload layout ready: {} / {}",
            self.original_dir.display(),
            self.encrypted_dir.display()
        );
        Ok(())
    }

    pub fn original_path(&self, name: &VideoName) -> PathBuf {
        self.original_dir.join(name.file_name())
    }

    pub fn playlist_path(&self, name: &VideoName) -> PathBuf {
        self.encrypted_dir.join(name.playlist_name())
    }

    pub fn segment_template(&self, name: &VideoName) -> PathBuf {
        self.encrypted_dir.join(name.segment_pattern())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
