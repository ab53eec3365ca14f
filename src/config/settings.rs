use std::path::PathBuf;
use std::time::Duration;

use crate::config::env::{self, EnvKey};
use crate::modules::progress::queue::QueueOrder;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub template_dir: PathBuf,
    pub ffmpeg_bin: String,
    pub key_info_file: PathBuf,
    pub key_file: PathBuf,
    pub segment_seconds: u32,
    pub progress_poll: Duration,
    pub progress_queue_capacity: usize,
    pub progress_queue_order: QueueOrder,
    /// `None` disables the transcode watchdog.
    pub transcode_timeout: Option<Duration>,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            upload_dir: PathBuf::from("uploads"),
            template_dir: PathBuf::from("templates"),
            ffmpeg_bin: "ffmpeg".to_string(),
            key_info_file: PathBuf::from("enc.keyinfo"),
            key_file: PathBuf::from("enc.key"),
            segment_seconds: 9,
            progress_poll: Duration::from_millis(100),
            progress_queue_capacity: 1024,
            progress_queue_order: QueueOrder::Fifo,
            transcode_timeout: None,
            max_upload_bytes: 2usize << 30,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        let defaults = Self::default();

        let timeout_secs: u64 = env::get_parsed(EnvKey::TranscodeTimeoutSecs, 0);
        let poll_ms: u64 = env::get_parsed(EnvKey::ProgressPollMs, 100);

        Self {
            server_host: env::get_or(EnvKey::ServerHost, &defaults.server_host),
            server_port: env::get_parsed(EnvKey::ServerPort, defaults.server_port),
            upload_dir: env::get_or(EnvKey::UploadDir, "uploads").into(),
            template_dir: env::get_or(EnvKey::TemplateDir, "templates").into(),
            ffmpeg_bin: env::get_or(EnvKey::FfmpegBin, &defaults.ffmpeg_bin),
            key_info_file: env::get_or(EnvKey::KeyInfoFile, "enc.keyinfo").into(),
            key_file: env::get_or(EnvKey::KeyFile, "enc.key").into(),
            segment_seconds: env::get_parsed(EnvKey::SegmentSeconds, defaults.segment_seconds),
            // Anything faster than 1ms would turn the feed into a busy loop.
            progress_poll: Duration::from_millis(poll_ms.max(1)),
            progress_queue_capacity: env::get_parsed(
                EnvKey::ProgressQueueCapacity,
                defaults.progress_queue_capacity,
            )
            .max(1),
            progress_queue_order: env::get_parsed(
                EnvKey::ProgressQueueOrder,
                defaults.progress_queue_order,
            ),
            transcode_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            max_upload_bytes: env::get_parsed(EnvKey::MaxUploadBytes, defaults.max_upload_bytes),
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn original_dir(&self) -> PathBuf {
        self.upload_dir.join("original")
    }

    pub fn encrypted_dir(&self) -> PathBuf {
        self.upload_dir.join("encrypted")
    }
}
