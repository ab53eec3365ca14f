use std::path::{Path, PathBuf};

use axum::{
    body::Bytes,
    extract::multipart::{Field, MultipartError},
    http::StatusCode,
};
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload stream interrupted: {0}")]
    Stream(String),

    #[error("upload exceeds the body limit: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl UploadError {
    /// Status for errors caused by the request body itself. `None` for
    /// failures on our side of the connection.
    pub fn client_status(&self) -> Option<StatusCode> {
        match self {
            UploadError::Stream(_) => Some(StatusCode::BAD_REQUEST),
            UploadError::TooLarge(_) => Some(StatusCode::PAYLOAD_TOO_LARGE),
            UploadError::Io(_) => None,
        }
    }
}

impl From<MultipartError> for UploadError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::TooLarge(e.body_text())
        } else {
            UploadError::Stream(e.body_text())
        }
    }
}

/// Writes an incoming upload to disk chunk by chunk.
pub struct FileUploader {
    path: PathBuf,
    file: File,
    written: u64,
}

impl FileUploader {
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let file = File::create(&path).await?;

        Ok(Self {
            path,
            file,
            written: 0,
        })
    }

    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), UploadError> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len() as u64;
        Ok(())
    }

    pub async fn finish(mut self) -> Result<u64, UploadError> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.written)
    }

    /// Removes the partially written file.
    pub async fn abort(self) -> Result<(), UploadError> {
        drop(self.file);
        fs::remove_file(&self.path).await?;
        Ok(())
    }
}

/// Adapts a multipart field into the chunk stream `write_stream` consumes.
pub fn field_chunks<'a>(field: Field<'a>) -> impl Stream<Item = Result<Bytes, UploadError>> + Send + 'a {
    field.map(|chunk| chunk.map_err(UploadError::from))
}

/// Writes `chunks` to `path`, returning the number of bytes stored. A stream
/// or write error removes the partial file.
pub async fn write_stream<S>(mut chunks: S, path: impl AsRef<Path>) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, UploadError>> + Unpin,
{
    let mut uploader = FileUploader::new(path.as_ref()).await?;

    while let Some(chunk) = chunks.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                error!("Stream error: {}", e);
                if let Err(abort_err) = uploader.abort().await {
                    warn!("Failed to remove partial upload: {}", abort_err);
                }
                return Err(e);
            }
        };

        if let Err(e) = uploader.write_chunk(&chunk).await {
            error!("Write error: {}", e);
            if let Err(abort_err) = uploader.abort().await {
                warn!("Failed to remove partial upload: {}", abort_err);
            }
            return Err(e);
        }
    }

    let written = uploader.finish().await?;
    info!("Stored {} bytes at {}", written, path.as_ref().display());
    Ok(written)
}
