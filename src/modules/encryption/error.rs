use thiserror::Error;

use crate::common::upload::UploadError;
use crate::infrastructure::transcoder::TranscodeError;

/// Reasons a single upload fails to produce an encrypted playlist.
///
/// All of these are reported to the client as text; none of them stops the
/// server.
#[derive(Debug, Error)]
pub enum EncryptError {
    #[error("invalid file name {0:?}")]
    InvalidFileName(String),

    #[error("job {0} already exists")]
    DuplicateJob(uuid::Uuid),

    #[error("failed to store original upload: {0}")]
    Persist(#[from] UploadError),

    #[error(transparent)]
    Transcode(#[from] TranscodeError),

    #[error("failed to render result page: {0}")]
    Template(#[from] std::io::Error),
}
