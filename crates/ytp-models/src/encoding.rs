//! Video encoding configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// Default audio codec
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default encoding preset for final renders
pub const DEFAULT_PRESET: &str = "fast";
/// Default CRF for final renders
pub const DEFAULT_CRF: u8 = 20;
/// Default audio bitrate for final renders
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";

/// Preview encoding preset
pub const PREVIEW_PRESET: &str = "veryfast";
/// Preview CRF (lower quality, faster)
pub const PREVIEW_CRF: u8 = 28;
/// Default preview length in seconds
pub const DEFAULT_PREVIEW_SECS: u32 = 8;

/// Video encoding configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingConfig {
    /// Video codec (e.g., "libx264")
    #[serde(default = "default_video_codec")]
    pub codec: String,

    /// Encoding preset (e.g., "veryfast", "fast", "medium")
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Constant Rate Factor (quality, 0-51, lower is better)
    #[serde(default = "default_crf")]
    pub crf: u8,

    /// Audio codec
    #[serde(default = "default_audio_codec")]
    pub audio_codec: String,

    /// Audio bitrate; `None` leaves the encoder default
    #[serde(default = "default_audio_bitrate")]
    pub audio_bitrate: Option<String>,

    /// Additional FFmpeg output arguments
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_video_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_preset() -> String {
    DEFAULT_PRESET.to_string()
}
fn default_crf() -> u8 {
    DEFAULT_CRF
}
fn default_audio_codec() -> String {
    DEFAULT_AUDIO_CODEC.to_string()
}
fn default_audio_bitrate() -> Option<String> {
    Some(DEFAULT_AUDIO_BITRATE.to_string())
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: DEFAULT_PRESET.to_string(),
            crf: DEFAULT_CRF,
            audio_codec: DEFAULT_AUDIO_CODEC.to_string(),
            audio_bitrate: Some(DEFAULT_AUDIO_BITRATE.to_string()),
            extra_args: Vec::new(),
        }
    }
}

impl EncodingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast, low quality settings used for previews.
    pub fn for_preview() -> Self {
        Self {
            preset: PREVIEW_PRESET.to_string(),
            crf: PREVIEW_CRF,
            audio_bitrate: None,
            ..Default::default()
        }
    }

    /// Returns a new config with updated CRF.
    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    /// Convert to FFmpeg output arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
            "-crf".to_string(),
            self.crf.to_string(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
        ];

        if let Some(bitrate) = &self.audio_bitrate {
            args.extend_from_slice(&["-b:a".to_string(), bitrate.clone()]);
        }

        args.extend(self.extra_args.clone());

        args
    }
}

/// What kind of render is being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RenderProfile {
    /// Full-length render at final quality
    #[default]
    Final,
    /// Short, fast render of the first `duration_secs` seconds
    Preview { duration_secs: u32 },
}

impl RenderProfile {
    pub fn preview() -> Self {
        RenderProfile::Preview {
            duration_secs: DEFAULT_PREVIEW_SECS,
        }
    }

    pub fn is_preview(&self) -> bool {
        matches!(self, RenderProfile::Preview { .. })
    }

    /// Encoding settings for this profile.
    pub fn encoding(&self) -> EncodingConfig {
        match self {
            RenderProfile::Final => EncodingConfig::default(),
            RenderProfile::Preview { .. } => EncodingConfig::for_preview(),
        }
    }

    /// Arguments placed before the source input (`-ss`/`-t` for previews).
    pub fn source_input_args(&self) -> Vec<String> {
        match self {
            RenderProfile::Final => Vec::new(),
            RenderProfile::Preview { duration_secs } => vec![
                "-ss".to_string(),
                "0".to_string(),
                "-t".to_string(),
                duration_secs.to_string(),
            ],
        }
    }

    /// Previews stop at the shortest stream so looping overlays can't extend them.
    pub fn stops_at_shortest(&self) -> bool {
        self.is_preview()
    }
}
