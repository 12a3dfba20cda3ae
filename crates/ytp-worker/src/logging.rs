//! Structured render logging.
//!
//! Every render gets an id so that lines from the assembler, the engine
//! runner and the front end can be correlated.

use tracing::{error, info, warn, Span};
use uuid::Uuid;

/// Render logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    render_id: String,
    operation: String,
}

impl RenderLogger {
    /// Create a logger with a fresh render id.
    pub fn new(operation: &str) -> Self {
        Self::from_string(&Uuid::new_v4().to_string(), operation)
    }

    /// Create a logger for an existing render id.
    pub fn from_string(render_id: &str, operation: &str) -> Self {
        Self {
            render_id: render_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render started: {}", message
        );
    }

    pub fn log_progress(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render warning: {}", message
        );
    }

    pub fn log_error(&self, message: &str) {
        error!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render error: {}", message
        );
    }

    pub fn log_completion(&self, message: &str) {
        info!(
            render_id = %self.render_id,
            operation = %self.operation,
            "Render completed: {}", message
        );
    }

    pub fn render_id(&self) -> &str {
        &self.render_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Span carrying the render id; entered for the duration of a render.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render",
            render_id = %self.render_id,
            operation = %self.operation
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_logger_has_unique_ids() {
        let a = RenderLogger::new("render");
        let b = RenderLogger::new("render");
        assert_ne!(a.render_id(), b.render_id());
        assert_eq!(a.operation(), "render");
        assert!(Uuid::parse_str(a.render_id()).is_ok());
    }

    #[test]
    fn test_logger_from_string() {
        let logger = RenderLogger::from_string("render-123", "preview");
        assert_eq!(logger.render_id(), "render-123");
        assert_eq!(logger.operation(), "preview");
    }
}
