use std::path::PathBuf;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::error::EncryptError;

pub type JobId = Uuid;

/// Declared upload name split into the pieces the output layout needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoName {
    file_name: String,
    base: String,
}

impl VideoName {
    /// Keeps only the final path component and splits it at the first `.`.
    pub fn parse(declared: &str) -> Result<Self, EncryptError> {
        let file_name = declared
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();

        if file_name.is_empty() || file_name == "." || file_name == ".." {
            return Err(EncryptError::InvalidFileName(declared.to_string()));
        }

        let base = file_name.split('.').next().unwrap_or_default().to_string();
        if base.is_empty() {
            return Err(EncryptError::InvalidFileName(declared.to_string()));
        }

        Ok(Self { file_name, base })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `clip.mp4` -> `clip.m3u8`
    pub fn playlist_name(&self) -> String {
        format!("{}.m3u8", self.base)
    }

    /// ffmpeg segment pattern, e.g. `clip.mp4__segment%03d.ts`
    pub fn segment_pattern(&self) -> String {
        format!("{}__segment%03d.ts", self.file_name)
    }
}

/// Everything the transcoder needs for one run.
#[derive(Debug, Clone)]
pub struct EncryptionJob {
    pub id: JobId,
    pub input: PathBuf,
    pub playlist: PathBuf,
    pub segment_template: PathBuf,
    pub key_info: PathBuf,
    pub segment_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Completed { playlist: String },
    Failed { error: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    /// `idle -> running -> {completed | failed}`; nothing leaves a terminal state.
    pub fn can_transition_to(&self, next: &JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Idle, JobState::Running)
                | (JobState::Running, JobState::Completed { .. })
                | (JobState::Running, JobState::Failed { .. })
        )
    }
}
