//! Filter graph assembly.
//!
//! The assembler walks the selected effects in order, binds each one and
//! concatenates the resulting chains into a single `-filter_complex`
//! program. Effects do not chain into each other: each reads the source
//! streams, and the last effect to produce a video (or audio) pad provides
//! the mapped output. Superseded pads are drained into null sinks.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use rand::Rng;
use tracing::{debug, info, warn};
use ytp_models::EffectSelection;

use crate::assets::AssetInventory;
use crate::binder::{bind, BoundInputs, ResolvedSlots};
use crate::catalog::EffectCatalog;
use crate::error::{MediaError, MediaResult};

/// Separator between chains in a filter graph program.
pub const FRAGMENT_SEPARATOR: &str = ";";

/// Labels of the pads mapped to the output file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputLabels {
    pub video: Option<String>,
    pub audio: Option<String>,
}

/// A complete `-filter_complex` program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterGraphProgram {
    pub chains: Vec<String>,
    pub outputs: OutputLabels,
}

impl FilterGraphProgram {
    /// Input indices referenced as `[N:v]` or `[N:a]`.
    pub fn referenced_indices(&self) -> BTreeSet<usize> {
        let mut indices = BTreeSet::new();
        for chain in &self.chains {
            for (start, _) in chain.match_indices('[') {
                let rest = &chain[start + 1..];
                let Some(end) = rest.find(']') else { continue };
                if let Some((index, kind)) = rest[..end].split_once(':') {
                    if matches!(kind, "v" | "a") {
                        if let Ok(index) = index.parse::<usize>() {
                            indices.insert(index);
                        }
                    }
                }
            }
        }
        indices
    }
}

impl fmt::Display for FilterGraphProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chains.join(FRAGMENT_SEPARATOR))
    }
}

/// Result of assembling a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledGraph {
    pub inputs: BoundInputs,
    /// `None` when no effect contributed; the source is passed through.
    pub program: Option<FilterGraphProgram>,
    /// Effects that contributed chains, in order
    pub applied: Vec<String>,
    /// Effects skipped by their probability roll
    pub skipped: Vec<String>,
}

impl AssembledGraph {
    pub fn is_passthrough(&self) -> bool {
        self.program.is_none()
    }

    /// `-map` argument for the video stream.
    pub fn video_map(&self) -> String {
        self.output_map(|o| o.video.as_deref(), "0:v?")
    }

    /// `-map` argument for the audio stream.
    pub fn audio_map(&self) -> String {
        self.output_map(|o| o.audio.as_deref(), "0:a?")
    }

    fn output_map(&self, pick: impl Fn(&OutputLabels) -> Option<&str>, fallback: &str) -> String {
        self.program
            .as_ref()
            .and_then(|p| pick(&p.outputs))
            .map(|label| format!("[{}]", label))
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Builds filter graphs from effect selections.
pub struct GraphAssembler<'a> {
    catalog: &'a EffectCatalog,
}

impl<'a> GraphAssembler<'a> {
    pub fn new(catalog: &'a EffectCatalog) -> Self {
        Self { catalog }
    }

    /// Assemble the graph for `selections`, applied in the given order.
    ///
    /// Every effect is looked up and validated before any asset is drawn. A
    /// required asset that cannot be supplied aborts the whole render, as does
    /// a pad label already defined by an earlier effect.
    pub fn assemble<R: Rng + ?Sized>(
        &self,
        source: &Path,
        overlay: Option<&Path>,
        selections: &[EffectSelection],
        inventory: &AssetInventory,
        rng: &mut R,
    ) -> MediaResult<AssembledGraph> {
        let selections = dedupe(selections);
        let specs = self.catalog.lookup_all(&selections)?;
        specs.iter().try_for_each(|spec| spec.validate())?;

        let mut inputs = BoundInputs::new(source, overlay.map(Path::to_path_buf));
        let mut chains: Vec<String> = Vec::new();
        let mut drains: Vec<String> = Vec::new();
        let mut outputs = OutputLabels::default();
        let mut defined: HashSet<String> = HashSet::new();
        let mut applied = Vec::new();
        let mut skipped = Vec::new();

        for (selection, spec) in selections.iter().zip(specs) {
            let probability = effective_probability(selection.probability);
            if probability < 1.0 && !rng.random_bool(probability) {
                debug!(effect = %spec.name, probability = probability, "Effect skipped by roll");
                skipped.push(spec.name.clone());
                continue;
            }

            let level = spec.clamp_level(selection.level);
            let resolved = ResolvedSlots::resolve(spec, inventory, rng);
            let bound = bind(spec, level, &resolved, &mut inputs)?;

            if let Some(label) = bound.labels.iter().find(|l| defined.contains(*l)) {
                return Err(MediaError::malformed(
                    &spec.name,
                    format!("label [{}] is already defined by an earlier effect", label),
                ));
            }
            defined.extend(bound.labels.iter().cloned());

            if let Some(label) = bound.video_label {
                if let Some(old) = outputs.video.replace(label) {
                    drains.push(format!("[{}]nullsink", old));
                }
            }
            if let Some(label) = bound.audio_label {
                if let Some(old) = outputs.audio.replace(label) {
                    drains.push(format!("[{}]anullsink", old));
                }
            }

            chains.extend(bound.chains);
            applied.push(spec.name.clone());
        }

        if chains.is_empty() {
            info!(skipped = skipped.len(), "No effects applied, passing source through");
            return Ok(AssembledGraph {
                inputs: BoundInputs::new(source, None),
                program: None,
                applied,
                skipped,
            });
        }

        chains.extend(drains);
        let mut program = FilterGraphProgram { chains, outputs };

        if let Some(index) = inputs.overlay_index() {
            if !program.referenced_indices().contains(&index) {
                debug!("Overlay unused by any effect, draining it");
                program.chains.push(format!("[{}:v]nullsink", index));
            }
        }

        info!(
            applied = ?applied,
            inputs = inputs.len(),
            chains = program.chains.len(),
            "Assembled filter graph"
        );

        Ok(AssembledGraph {
            inputs,
            program: Some(program),
            applied,
            skipped,
        })
    }
}

/// Assemble with the built-in catalog.
pub fn assemble<R: Rng + ?Sized>(
    source: &Path,
    overlay: Option<&Path>,
    selections: &[EffectSelection],
    inventory: &AssetInventory,
    rng: &mut R,
) -> MediaResult<AssembledGraph> {
    GraphAssembler::new(EffectCatalog::builtin()).assemble(source, overlay, selections, inventory, rng)
}

fn dedupe(selections: &[EffectSelection]) -> Vec<EffectSelection> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(selections.len());
    for selection in selections {
        let key = selection.name.trim().to_lowercase();
        if seen.insert(key) {
            unique.push(selection.clone());
        } else {
            warn!(effect = %selection.name, "Duplicate effect selection ignored");
        }
    }
    unique
}

fn effective_probability(p: f64) -> f64 {
    if p.is_nan() {
        1.0
    } else {
        p.clamp(0.0, 1.0)
    }
}
