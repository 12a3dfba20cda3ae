//! Shared data models for the YTP generator.
//!
//! This crate provides Serde-serializable types for:
//! - Asset categories and the directories they are scanned from
//! - Effect selections (name, level, probability)
//! - Encoding configuration and render profiles

pub mod asset;
pub mod effect;
pub mod encoding;

// Re-export common types
pub use asset::{AssetCategory, AssetDirectories, AssetCategoryParseError};
pub use effect::{EffectSelection, EffectSelectionParseError};
pub use encoding::{EncodingConfig, RenderProfile};
