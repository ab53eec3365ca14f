//! ffmpeg-backed AES-128 HLS encryption.

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::{EventSink, TranscodeError, TranscodeEvent, Transcoder};
use crate::modules::encryption::model::EncryptionJob;

/// Number of non-progress stderr lines kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

pub struct FfmpegTranscoder {
    bin: String,
    timeout: Option<Duration>,
}

impl FfmpegTranscoder {
    pub fn new(bin: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            bin: bin.into(),
            timeout,
        }
    }

    /// Arguments for a split-by-time, key-info encrypted VOD playlist.
    pub fn build_args(job: &EncryptionJob) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-v".to_string(),
            "error".to_string(),
            // Progress key/value blocks on stderr
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
            "-i".to_string(),
            job.input.to_string_lossy().to_string(),
            "-hls_flags".to_string(),
            "split_by_time".to_string(),
            "-hls_time".to_string(),
            job.segment_seconds.to_string(),
            "-hls_key_info_file".to_string(),
            job.key_info.to_string_lossy().to_string(),
            "-hls_playlist_type".to_string(),
            "vod".to_string(),
            "-hls_segment_filename".to_string(),
            job.segment_template.to_string_lossy().to_string(),
            job.playlist.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, job: &EncryptionJob, events: EventSink) -> Result<(), TranscodeError> {
        which::which(&self.bin).map_err(|_| TranscodeError::BinaryNotFound(self.bin.clone()))?;

        let args = Self::build_args(job);
        let command_line = format!("{} {}", self.bin, args.join(" "));
        debug!("Running: {}", command_line);

        let mut child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(TranscodeError::Spawn)?;

        events(TranscodeEvent::Started {
            command: command_line,
        });

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::Spawn(std::io::Error::other("stderr not captured")))?;
        let mut reader = BufReader::new(stderr).lines();

        let progress_events = events.clone();
        let reader_handle = tokio::spawn(async move {
            let mut out_time = None;
            let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                match parse_progress_line(&line, &mut out_time) {
                    ProgressLine::Tick(timemark) => {
                        progress_events(TranscodeEvent::Progress { timemark });
                    }
                    ProgressLine::Field => {}
                    ProgressLine::Other => {
                        if tail.len() == STDERR_TAIL_LINES {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };

        let status = match waited {
            Some(status) => status?,
            None => {
                let limit = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
                warn!("ffmpeg timed out after {}s for job {}, killing process", limit, job.id);
                let _ = child.kill().await;
                reader_handle.abort();
                return Err(TranscodeError::Timeout(limit));
            }
        };

        let stderr_tail = reader_handle.await.unwrap_or_default();

        if status.success() {
            info!("ffmpeg finished job {}", job.id);
            Ok(())
        } else {
            error!("ffmpeg failed job {} with {}: {}", job.id, status, stderr_tail);
            Err(TranscodeError::Failed {
                status: status.to_string(),
                stderr: stderr_tail,
            })
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ProgressLine {
    /// End of a progress block, carrying the formatted timemark.
    Tick(String),
    /// Any other `key=value` line of a progress block.
    Field,
    /// Not part of the progress output (warnings, errors).
    Other,
}

/// Classifies one stderr line of `-progress pipe:2` output.
fn parse_progress_line(line: &str, out_time: &mut Option<String>) -> ProgressLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressLine::Other;
    };
    if key.is_empty() || key.contains(char::is_whitespace) {
        return ProgressLine::Other;
    }

    match key {
        "out_time" => {
            if value != "N/A" && !value.starts_with('-') {
                *out_time = Some(format_timemark(value));
            }
            ProgressLine::Field
        }
        // "continue" or "end"
        "progress" => match out_time.clone() {
            Some(timemark) => ProgressLine::Tick(timemark),
            None => ProgressLine::Field,
        },
        _ => ProgressLine::Field,
    }
}

/// `00:01:02.345678` -> `00:01:02.34`
fn format_timemark(out_time: &str) -> String {
    match out_time.split_once('.') {
        Some((clock, fraction)) => {
            let centis: String = fraction.chars().take(2).collect();
            format!("{}.{:0<2}", clock, centis)
        }
        None => format!("{}.00", out_time),
    }
}
