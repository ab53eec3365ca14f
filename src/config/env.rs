use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerHost,
    ServerPort,
    UploadDir,
    TemplateDir,
    FfmpegBin,
    KeyInfoFile,
    KeyFile,
    SegmentSeconds,
    ProgressPollMs,
    ProgressQueueCapacity,
    ProgressQueueOrder,
    TranscodeTimeoutSecs,
    MaxUploadBytes,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerHost => "APP_HOST",
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::UploadDir => "UPLOAD_DIR",
            EnvKey::TemplateDir => "TEMPLATE_DIR",
            EnvKey::FfmpegBin => "FFMPEG_BIN",
            EnvKey::KeyInfoFile => "HLS_KEY_INFO_FILE",
            EnvKey::KeyFile => "HLS_KEY_FILE",
            EnvKey::SegmentSeconds => "HLS_SEGMENT_SECONDS",
            EnvKey::ProgressPollMs => "PROGRESS_POLL_MS",
            EnvKey::ProgressQueueCapacity => "PROGRESS_QUEUE_CAPACITY",
            EnvKey::ProgressQueueOrder => "PROGRESS_QUEUE_ORDER",
            EnvKey::TranscodeTimeoutSecs => "TRANSCODE_TIMEOUT_SECS",
            EnvKey::MaxUploadBytes => "MAX_UPLOAD_BYTES",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
