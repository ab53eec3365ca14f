use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::storage::local::LocalStorage;
use crate::infrastructure::transcoder::{FfmpegTranscoder, Transcoder};
use crate::modules::encryption::registry::JobRegistry;
use crate::modules::progress::hub::ProgressHub;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub storage: LocalStorage,
    pub progress: ProgressHub,
    pub jobs: JobRegistry,
    pub transcoder: Arc<dyn Transcoder>,
}

impl AppState {
    pub fn new(config: AppConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let storage = LocalStorage::new(&config);
        let progress = ProgressHub::new(config.progress_queue_capacity, config.progress_queue_order);

        Self {
            config,
            storage,
            progress,
            jobs: JobRegistry::new(),
            transcoder,
        }
    }

    /// State backed by the configured ffmpeg binary.
    pub fn with_ffmpeg(config: AppConfig) -> Self {
        let transcoder = FfmpegTranscoder::new(config.ffmpeg_bin.clone(), config.transcode_timeout);
        Self::new(config, Arc::new(transcoder))
    }
}
