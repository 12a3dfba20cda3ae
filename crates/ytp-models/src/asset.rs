//! Asset categories and asset directory configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Image file extensions (lowercase, without dot).
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
/// Audio file extensions (lowercase, without dot).
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "m4a", "ogg"];
/// Video file extensions (lowercase, without dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm", "avi"];

/// Glitch overlays may be stills or short clips.
const ERROR_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "bmp", "mp4", "mov", "mkv", "webm", "avi",
];

/// Environment variable prefix for asset directories (`YTP_ASSETS_IMAGES`, ...).
pub const ASSET_ENV_PREFIX: &str = "YTP_ASSETS_";

/// Category of auxiliary asset an effect can draw from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    /// Still images injected into the video
    Image,
    /// Meme images
    Meme,
    /// Short meme sound bites
    MemeSound,
    /// Ambient/background sounds
    Sound,
    /// Short clips overlaid on top of the video
    OverlayVideo,
    /// Advert clips
    Advert,
    /// Error/glitch overlays
    Error,
}

impl AssetCategory {
    /// All categories in configuration order.
    pub const ALL: &'static [AssetCategory] = &[
        AssetCategory::Image,
        AssetCategory::Meme,
        AssetCategory::MemeSound,
        AssetCategory::Sound,
        AssetCategory::OverlayVideo,
        AssetCategory::Advert,
        AssetCategory::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetCategory::Image => "image",
            AssetCategory::Meme => "meme",
            AssetCategory::MemeSound => "meme_sound",
            AssetCategory::Sound => "sound",
            AssetCategory::OverlayVideo => "overlay_video",
            AssetCategory::Advert => "advert",
            AssetCategory::Error => "error",
        }
    }

    /// Allowed file extensions for this category.
    pub fn allowed_extensions(&self) -> &'static [&'static str] {
        match self {
            AssetCategory::Image | AssetCategory::Meme => IMAGE_EXTENSIONS,
            AssetCategory::MemeSound | AssetCategory::Sound => AUDIO_EXTENSIONS,
            AssetCategory::OverlayVideo | AssetCategory::Advert => VIDEO_EXTENSIONS,
            AssetCategory::Error => ERROR_EXTENSIONS,
        }
    }

    /// Environment variable holding this category's directory.
    pub fn env_var(&self) -> String {
        format!("{}{}", ASSET_ENV_PREFIX, self.as_str().to_uppercase())
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = AssetCategoryParseError;

    /// Accepts the canonical names plus the plural folder names used by
    /// older configuration files (`images`, `overlays_videos`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "image" | "images" => Ok(AssetCategory::Image),
            "meme" | "memes" => Ok(AssetCategory::Meme),
            "meme_sound" | "meme_sounds" => Ok(AssetCategory::MemeSound),
            "sound" | "sounds" => Ok(AssetCategory::Sound),
            "overlay_video" | "overlay_videos" | "overlays_videos" => {
                Ok(AssetCategory::OverlayVideo)
            }
            "advert" | "adverts" => Ok(AssetCategory::Advert),
            "error" | "errors" => Ok(AssetCategory::Error),
            _ => Err(AssetCategoryParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown asset category: {0}")]
pub struct AssetCategoryParseError(String);

/// Directory configured for each asset category.
///
/// Categories without an entry behave as an empty inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetDirectories {
    dirs: BTreeMap<AssetCategory, PathBuf>,
}

impl AssetDirectories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory for a category (builder style).
    pub fn with(mut self, category: AssetCategory, dir: impl Into<PathBuf>) -> Self {
        self.set(category, dir);
        self
    }

    pub fn set(&mut self, category: AssetCategory, dir: impl Into<PathBuf>) {
        self.dirs.insert(category, dir.into());
    }

    pub fn get(&self, category: AssetCategory) -> Option<&Path> {
        self.dirs.get(&category).map(PathBuf::as_path)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetCategory, &Path)> {
        self.dirs.iter().map(|(c, p)| (*c, p.as_path()))
    }

    /// Entries from `other` replace entries in `self`.
    pub fn merge(&mut self, other: AssetDirectories) {
        self.dirs.extend(other.dirs);
    }

    /// Load directories from `YTP_ASSETS_<CATEGORY>` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load directories through an arbitrary key lookup.
    ///
    /// Blank values are ignored.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut dirs = Self::new();
        for category in AssetCategory::ALL {
            if let Some(value) = lookup(&category.env_var()) {
                let value = value.trim();
                if !value.is_empty() {
                    dirs.set(*category, value);
                }
            }
        }
        dirs
    }

    /// Parse a JSON object mapping category names to directories.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
