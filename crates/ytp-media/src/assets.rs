//! Asset discovery and sampling.
//!
//! The inventory is scanned once per render from the configured
//! [`AssetDirectories`]; effects then draw random files from it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::{debug, warn};

use ytp_models::{AssetCategory, AssetDirectories};

/// List files directly inside `dir` whose extension is in `extensions`.
///
/// Only the top level is scanned. Results are sorted. A missing or
/// unreadable directory yields an empty list.
pub fn list_assets(dir: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "Asset directory not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| has_extension(path, extensions))
        .collect();

    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions.iter().any(|allowed| *allowed == ext)
        })
        .unwrap_or(false)
}

/// Snapshot of available asset files per category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetInventory {
    assets: BTreeMap<AssetCategory, Vec<PathBuf>>,
}

impl AssetInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every configured directory.
    ///
    /// Categories without a directory, or whose directory holds no
    /// matching files, end up empty.
    pub fn scan(dirs: &AssetDirectories) -> Self {
        let mut inventory = Self::new();
        for category in AssetCategory::ALL {
            let files = match dirs.get(*category) {
                Some(dir) => {
                    if !dir.is_dir() {
                        warn!(
                            category = %category,
                            dir = %dir.display(),
                            "Configured asset directory does not exist"
                        );
                    }
                    list_assets(dir, category.allowed_extensions())
                }
                None => Vec::new(),
            };
            debug!(category = %category, count = files.len(), "Scanned assets");
            inventory.insert(*category, files);
        }
        inventory
    }

    /// Replace the files known for a category.
    pub fn insert(&mut self, category: AssetCategory, files: Vec<PathBuf>) {
        self.assets.insert(category, files);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, category: AssetCategory, files: Vec<PathBuf>) -> Self {
        self.insert(category, files);
        self
    }

    /// Files available for a category (empty if none).
    pub fn get(&self, category: AssetCategory) -> &[PathBuf] {
        self.assets
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn count(&self, category: AssetCategory) -> usize {
        self.get(category).len()
    }

    pub fn total(&self) -> usize {
        self.assets.values().map(Vec::len).sum()
    }
}

/// Sample up to `count` distinct files of `category` without replacement.
///
/// When fewer than `count` files exist, all of them are returned. An empty
/// result is a valid outcome; callers decide whether a short list is fatal.
pub fn resolve<R: Rng + ?Sized>(
    category: AssetCategory,
    count: usize,
    inventory: &AssetInventory,
    rng: &mut R,
) -> Vec<PathBuf> {
    let available = inventory.get(category);
    if available.len() < count {
        debug!(
            category = %category,
            requested = count,
            available = available.len(),
            "Asset shortage"
        );
    }
    available.choose_multiple(rng, count).cloned().collect()
}
