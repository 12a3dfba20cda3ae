//! Render worker for the YTP generator.
//!
//! This crate provides:
//! - Configuration from environment variables
//! - Render job processing with cancellation and timeouts
//! - Structured render logging

pub mod config;
pub mod error;
pub mod logging;
pub mod render_job;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use logging::RenderLogger;
pub use render_job::{process_render_job, process_render_job_with, RenderJob, RenderJobResult};
