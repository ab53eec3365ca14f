use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use futures_util::Stream;
use tracing::{error, info};

use super::error::EncryptError;
use super::model::{EncryptionJob, JobId, JobState, VideoName};
use crate::common::upload::{self, UploadError};
use crate::infrastructure::transcoder::{EventSink, TranscodeEvent};
use crate::state::AppState;

pub const FINISHED_MESSAGE: &str = "Finished processing video";

pub struct EncryptionService;

impl EncryptionService {
    /// Validates the declared name and records a new idle job.
    pub fn prepare(state: &AppState, job_id: JobId, declared_name: &str) -> Result<VideoName, EncryptError> {
        let name = VideoName::parse(declared_name)?;
        state.jobs.register(job_id, name.file_name())?;
        // Subscribers that connected before the upload already own the feed.
        state.progress.job_feed(job_id);
        Ok(name)
    }

    /// Stores the original upload, then drives the transcoder to produce the
    /// encrypted playlist. Resolves with the playlist path.
    ///
    /// The original is written before any transcoding starts and is kept
    /// whatever the outcome. Failures are recorded on the job but never
    /// published to the progress feed.
    pub async fn encrypt<S>(
        state: &AppState,
        job_id: JobId,
        name: &VideoName,
        chunks: S,
    ) -> Result<PathBuf, EncryptError>
    where
        S: Stream<Item = Result<Bytes, UploadError>> + Unpin + Send,
    {
        state.jobs.transition(job_id, JobState::Running);

        let result = Self::run(state, job_id, name, chunks).await;

        match &result {
            Ok(_) => {
                state.jobs.transition(
                    job_id,
                    JobState::Completed {
                        playlist: name.playlist_name(),
                    },
                );
            }
            Err(e) => {
                error!("Job {} failed: {}", job_id, e);
                state.jobs.transition(job_id, JobState::Failed { error: e.to_string() });
            }
        }
        state.progress.finish(job_id);

        result
    }

    async fn run<S>(state: &AppState, job_id: JobId, name: &VideoName, chunks: S) -> Result<PathBuf, EncryptError>
    where
        S: Stream<Item = Result<Bytes, UploadError>> + Unpin + Send,
    {
        let original = state.storage.original_path(name);
        upload::write_stream(chunks, &original).await?;

        let job = EncryptionJob {
            id: job_id,
            input: original,
            playlist: state.storage.playlist_path(name),
            segment_template: state.storage.segment_template(name),
            key_info: state.config.key_info_file.clone(),
            segment_seconds: state.config.segment_seconds,
        };

        let hub = state.progress.clone();
        let sink: EventSink = Arc::new(move |event| {
            let message = progress_message(&event);
            info!("{}", message);
            hub.publish(job_id, message);
        });

        state.transcoder.transcode(&job, sink).await?;

        info!("{}", FINISHED_MESSAGE);
        state.progress.publish(job_id, FINISHED_MESSAGE);

        Ok(job.playlist)
    }
}

pub fn progress_message(event: &TranscodeEvent) -> String {
    match event {
        TranscodeEvent::Started { command } => format!("Started ffmpeg with command: {}", command),
        TranscodeEvent::Progress { timemark } => format!("Processing: {}", timemark),
    }
}
