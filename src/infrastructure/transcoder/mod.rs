use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::modules::encryption::model::EncryptionJob;

pub mod ffmpeg;

pub use ffmpeg::FfmpegTranscoder;

/// Lifecycle notifications a transcoder reports while it runs.
///
/// Completion and failure are not events: they are the result of
/// [`Transcoder::transcode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeEvent {
    Started { command: String },
    Progress { timemark: String },
}

pub type EventSink = Arc<dyn Fn(TranscodeEvent) + Send + Sync>;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("transcoder binary not found: {0}")]
    BinaryNotFound(String),

    #[error("failed to start transcoder: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("transcoder exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("transcoder timed out after {0} seconds")]
    Timeout(u64),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Runs one job to completion, reporting lifecycle events to `events`.
    async fn transcode(&self, job: &EncryptionJob, events: EventSink) -> Result<(), TranscodeError>;
}
