//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use ytp_media::command::{DEFAULT_ENGINE, DEFAULT_LOG_LEVEL};
use ytp_models::encoding::DEFAULT_PREVIEW_SECS;
use ytp_models::AssetDirectories;

/// Default render timeout in seconds.
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 3600;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// FFmpeg executable (name on PATH or explicit path)
    pub ffmpeg_bin: PathBuf,
    /// Directory for renders without an explicit destination
    pub output_dir: PathBuf,
    /// Length of preview renders
    pub preview_secs: u32,
    /// Render timeout; `None` waits indefinitely
    pub render_timeout: Option<Duration>,
    /// FFmpeg `-loglevel`
    pub ffmpeg_log_level: String,
    /// Asset directory per category
    pub assets: AssetDirectories,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_bin: PathBuf::from(DEFAULT_ENGINE),
            output_dir: PathBuf::from("."),
            preview_secs: DEFAULT_PREVIEW_SECS,
            render_timeout: Some(Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS)),
            ffmpeg_log_level: DEFAULT_LOG_LEVEL.to_string(),
            assets: AssetDirectories::new(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    ///
    /// `YTP_RENDER_TIMEOUT=0` disables the timeout.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            ffmpeg_bin: var("YTP_FFMPEG_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_bin),
            output_dir: var("YTP_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            preview_secs: var("YTP_PREVIEW_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.preview_secs),
            render_timeout: match var("YTP_RENDER_TIMEOUT").and_then(|s| s.parse::<u64>().ok()) {
                Some(0) => None,
                Some(secs) => Some(Duration::from_secs(secs)),
                None => defaults.render_timeout,
            },
            ffmpeg_log_level: var("YTP_LOG_LEVEL").unwrap_or(defaults.ffmpeg_log_level),
            assets: AssetDirectories::from_lookup(&lookup),
        }
    }
}
