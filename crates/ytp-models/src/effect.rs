//! Effect selection as requested by the front end.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One enabled effect, in the order the caller wants it applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EffectSelection {
    /// Catalog name of the effect (e.g. "memes")
    pub name: String,

    /// Intensity; `None` uses the effect's default level
    #[serde(default)]
    pub level: Option<f64>,

    /// Chance (0.0 to 1.0) that the effect is applied on this render
    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

impl EffectSelection {
    /// Select an effect at its default level, always applied.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: None,
            probability: 1.0,
        }
    }

    pub fn with_level(mut self, level: f64) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the application probability (clamped to 0.0..=1.0).
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl fmt::Display for EffectSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(level) = self.level {
            write!(f, ":{}", level)?;
        }
        if self.probability < 1.0 {
            if self.level.is_none() {
                write!(f, ":")?;
            }
            write!(f, ":{}", self.probability)?;
        }
        Ok(())
    }
}

impl FromStr for EffectSelection {
    type Err = EffectSelectionParseError;

    /// Parse `name`, `name:level` or `name:level:probability`.
    /// An empty level (`name::0.5`) keeps the default level.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(EffectSelectionParseError::MissingName(s.to_string()));
        }

        let mut selection = EffectSelection::new(name.to_lowercase());

        if let Some(level) = parts.next().map(str::trim).filter(|l| !l.is_empty()) {
            let level: f64 = level
                .parse()
                .map_err(|_| EffectSelectionParseError::InvalidNumber(level.to_string()))?;
            selection = selection.with_level(level);
        }

        if let Some(prob) = parts.next().map(str::trim).filter(|p| !p.is_empty()) {
            let prob: f64 = prob
                .parse()
                .map_err(|_| EffectSelectionParseError::InvalidNumber(prob.to_string()))?;
            selection = selection.with_probability(prob);
        }

        if parts.next().is_some() {
            return Err(EffectSelectionParseError::TooManyParts(s.to_string()));
        }

        Ok(selection)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EffectSelectionParseError {
    #[error("Effect selection has no name: {0:?}")]
    MissingName(String),

    #[error("Invalid number in effect selection: {0}")]
    InvalidNumber(String),

    #[error("Expected name[:level[:probability]], got: {0}")]
    TooManyParts(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_name_only() {
        let sel: EffectSelection = "Memes".parse().unwrap();
        assert_eq!(sel.name, "memes");
        assert_eq!(sel.level, None);
        assert!((sel.probability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_level_and_probability() {
        let sel: EffectSelection = "speed:2.5:0.25".parse().unwrap();
        assert_eq!(sel.name, "speed");
        assert_eq!(sel.level, Some(2.5));
        assert!((sel.probability - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_skipped_level() {
        let sel: EffectSelection = "earrape::0.5".parse().unwrap();
        assert_eq!(sel.level, None);
        assert!((sel.probability - 0.5).abs() < f64::EPSILON);
        assert_eq!(sel.to_string(), "earrape::0.5");
    }

    #[test]
    fn test_probability_is_clamped() {
        let sel: EffectSelection = "mirror:1:7".parse().unwrap();
        assert!((sel.probability - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            ":2".parse::<EffectSelection>(),
            Err(EffectSelectionParseError::MissingName(_))
        ));
        assert!(matches!(
            "speed:fast".parse::<EffectSelection>(),
            Err(EffectSelectionParseError::InvalidNumber(_))
        ));
        assert!(matches!(
            "speed:1:1:1".parse::<EffectSelection>(),
            Err(EffectSelectionParseError::TooManyParts(_))
        ));
    }

    #[test]
    fn test_deserialize_defaults() {
        let sel: EffectSelection = serde_json::from_str(r#"{"name": "invert"}"#).unwrap();
        assert_eq!(sel, EffectSelection::new("invert"));
    }
}
