//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    #[error("Media error: {0}")]
    Media(#[from] ytp_media::MediaError),
}

impl WorkerError {
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Renders are never retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            WorkerError::Media(e) => e.is_retryable(),
            WorkerError::InvalidRequest(_) => false,
        }
    }

    /// Check if the render was cancelled by the user.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkerError::Media(ytp_media::MediaError::Cancelled))
    }

    /// Check if the failure happened before FFmpeg was started.
    pub fn is_user_error(&self) -> bool {
        match self {
            WorkerError::InvalidRequest(_) => true,
            WorkerError::Media(e) => e.is_assembly_error(),
        }
    }
}
