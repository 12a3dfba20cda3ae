//! Error types for graph assembly and rendering.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while assembling or rendering a filter graph.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    #[error("Effect '{effect}' references '{token}' but no input is available for it")]
    UnresolvedPlaceholder { effect: String, token: String },

    #[error("Malformed filter fragment in effect '{effect}': {reason}")]
    MalformedFragment { effect: String, reason: String },

    #[error("Engine executable not found: {program}")]
    EngineNotFound { program: String },

    #[error("Engine exited with code {exit_code:?}: {}", last_line(.stderr))]
    EngineInvocationFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Engine timed out after {0} seconds")]
    EngineTimeout(u64),

    #[error("Render cancelled")]
    Cancelled,

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid output path: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn last_line(stderr: &str) -> &str {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("no diagnostic output")
}

impl MediaError {
    pub fn unknown_effect(name: impl Into<String>) -> Self {
        Self::UnknownEffect(name.into())
    }

    pub fn unresolved(effect: impl Into<String>, token: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder {
            effect: effect.into(),
            token: token.into(),
        }
    }

    pub fn malformed(effect: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFragment {
            effect: effect.into(),
            reason: reason.into(),
        }
    }

    pub fn engine_failed(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::EngineInvocationFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Renders are expensive and overwrite their destination, so nothing is retried.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Errors raised before the engine was started.
    pub fn is_assembly_error(&self) -> bool {
        matches!(
            self,
            MediaError::UnknownEffect(_)
                | MediaError::UnresolvedPlaceholder { .. }
                | MediaError::MalformedFragment { .. }
        )
    }
}
