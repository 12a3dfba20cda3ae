//! Placeholder binding.
//!
//! Binding turns one effect's symbolic chains into concrete filter text:
//! every `{slot:kind}` reference becomes `[index:kind]`, where `index` is the
//! position of the file in the render's input list. Asset files are appended
//! to that list in the order their slots are first referenced. Indices are
//! never reused or renumbered.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::debug;
use ytp_models::AssetCategory;

use crate::assets::{resolve, AssetInventory};
use crate::catalog::{AssetSlot, EffectSpec};
use crate::error::{MediaError, MediaResult};
use crate::template::{FragmentTemplate, Segment, Slot};

/// Where a bound input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOrigin {
    Source,
    Overlay,
    Asset(AssetCategory),
}

/// A file passed to the engine with `-i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInput {
    pub index: usize,
    pub path: PathBuf,
    pub origin: InputOrigin,
}

/// The ordered input list of a render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInputs {
    inputs: Vec<BoundInput>,
}

impl BoundInputs {
    /// Source at index 0, overlay (if any) at index 1.
    pub fn new(source: impl Into<PathBuf>, overlay: Option<PathBuf>) -> Self {
        let mut inputs = vec![BoundInput {
            index: 0,
            path: source.into(),
            origin: InputOrigin::Source,
        }];
        if let Some(path) = overlay {
            inputs.push(BoundInput {
                index: 1,
                path,
                origin: InputOrigin::Overlay,
            });
        }
        Self { inputs }
    }

    /// Append an asset and return its index.
    pub fn push_asset(&mut self, path: impl Into<PathBuf>, category: AssetCategory) -> usize {
        let index = self.inputs.len();
        self.inputs.push(BoundInput {
            index,
            path: path.into(),
            origin: InputOrigin::Asset(category),
        });
        index
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundInput> {
        self.inputs.iter()
    }

    pub fn as_slice(&self) -> &[BoundInput] {
        &self.inputs
    }

    pub fn paths(&self) -> Vec<&Path> {
        self.inputs.iter().map(|i| i.path.as_path()).collect()
    }

    pub fn source(&self) -> &Path {
        &self.inputs[0].path
    }

    pub fn overlay_index(&self) -> Option<usize> {
        self.inputs
            .iter()
            .find(|i| i.origin == InputOrigin::Overlay)
            .map(|i| i.index)
    }
}

/// Files drawn for each asset slot of one effect.
///
/// A slot is `None` when the inventory ran short.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSlots {
    slots: Vec<(AssetSlot, Option<PathBuf>)>,
}

impl ResolvedSlots {
    /// Draw files for every requirement of `spec`.
    pub fn resolve<R: Rng + ?Sized>(spec: &EffectSpec, inventory: &AssetInventory, rng: &mut R) -> Self {
        let mut slots = Vec::new();
        let all = spec.asset_slots();
        let mut next = 0;

        for req in &spec.inputs {
            let mut drawn = resolve(req.category, req.count, inventory, rng).into_iter();
            for _ in 0..req.count {
                slots.push((all[next], drawn.next()));
                next += 1;
            }
        }

        Self { slots }
    }

    /// Fill the effect's slots in order from `paths`; leftover slots stay empty.
    pub fn from_paths(spec: &EffectSpec, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut paths = paths.into_iter();
        let slots = spec
            .asset_slots()
            .into_iter()
            .map(|slot| (slot, paths.next()))
            .collect();
        Self { slots }
    }

    pub fn slot(&self, number: usize) -> Option<&AssetSlot> {
        self.entry(number).map(|(slot, _)| slot)
    }

    pub fn path(&self, number: usize) -> Option<&Path> {
        self.entry(number).and_then(|(_, path)| path.as_deref())
    }

    /// Number of slots that received a file.
    pub fn filled(&self) -> usize {
        self.slots.iter().filter(|(_, p)| p.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn entry(&self, number: usize) -> Option<&(AssetSlot, Option<PathBuf>)> {
        number.checked_sub(1).and_then(|i| self.slots.get(i))
    }
}

/// Slot to input index mapping for one effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderBinding {
    indices: BTreeMap<Slot, usize>,
}

impl PlaceholderBinding {
    pub fn get(&self, slot: Slot) -> Option<usize> {
        self.indices.get(&slot).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, usize)> + '_ {
        self.indices.iter().map(|(s, i)| (*s, *i))
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// An effect rewritten against concrete input indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEffect {
    pub effect: String,
    pub binding: PlaceholderBinding,
    /// Rendered filter chains, in catalog order
    pub chains: Vec<String>,
    /// Scoped video output label, without brackets
    pub video_label: Option<String>,
    /// Scoped audio output label, without brackets
    pub audio_label: Option<String>,
    /// Every scoped label the chains use, in first-occurrence order
    pub labels: Vec<String>,
}

impl BoundEffect {
    /// All chains joined into one fragment.
    pub fn fragment(&self) -> String {
        self.chains.join(crate::graph::FRAGMENT_SEPARATOR)
    }
}

/// Label as emitted in the graph: `<effect>_<label>`.
pub fn scoped_label(effect: &str, label: &str) -> String {
    format!("{}_{}", effect, label)
}

enum Availability {
    Ready,
    /// An optional asset or the overlay is missing; try the next alternative.
    Soft(String),
}

/// Bind `spec` at `level` to the drawn assets, extending `inputs`.
///
/// `inputs` is only modified on success.
pub fn bind(
    spec: &EffectSpec,
    level: f64,
    resolved: &ResolvedSlots,
    inputs: &mut BoundInputs,
) -> MediaResult<BoundEffect> {
    let params = (spec.params)(level);
    let has_overlay = inputs.overlay_index().is_some();

    // Pick one template per chain before touching the input list.
    let mut chosen = Vec::with_capacity(spec.chains.len());
    for chain in &spec.chains {
        let mut last_soft = None;
        let mut picked = None;

        for text in &chain.alternatives {
            let template = FragmentTemplate::parse(text)
                .map_err(|e| MediaError::malformed(&spec.name, e.to_string()))?;
            match check_template(spec, &template, resolved, has_overlay)? {
                Availability::Ready => {
                    picked = Some(template);
                    break;
                }
                Availability::Soft(token) => last_soft = Some(token),
            }
        }

        match picked {
            Some(template) => chosen.push(template),
            None => {
                let token = last_soft.unwrap_or_else(|| "chain".to_string());
                return Err(MediaError::unresolved(&spec.name, token));
            }
        }
    }

    // Assign indices in first-occurrence order.
    let mut binding = PlaceholderBinding::default();
    let mut pending: Vec<(PathBuf, AssetCategory)> = Vec::new();
    for template in &chosen {
        for slot in template.slots() {
            if binding.indices.contains_key(&slot) {
                continue;
            }
            let index = match slot {
                Slot::Source => 0,
                Slot::Overlay => inputs
                    .overlay_index()
                    .ok_or_else(|| MediaError::unresolved(&spec.name, slot.token()))?,
                Slot::Asset(n) => {
                    let (asset, path) = resolved
                        .slot(n)
                        .zip(resolved.path(n))
                        .ok_or_else(|| MediaError::unresolved(&spec.name, slot.token()))?;
                    pending.push((path.to_path_buf(), asset.category));
                    inputs.len() + pending.len() - 1
                }
            };
            binding.indices.insert(slot, index);
        }
    }

    let mut chains = Vec::with_capacity(chosen.len());
    let mut labels: Vec<String> = Vec::new();
    for template in &chosen {
        let mut out = String::new();
        for segment in template.segments() {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Stream { slot, kind } => {
                    let index = binding
                        .get(*slot)
                        .ok_or_else(|| MediaError::internal(format!("{} left unbound", slot)))?;
                    out.push_str(&format!("[{}:{}]", index, kind.specifier()));
                }
                Segment::Param(name) => {
                    let value = lookup_param(&params, name)
                        .ok_or_else(|| MediaError::malformed(&spec.name, format!("unknown parameter '{}'", name)))?;
                    out.push_str(value);
                }
                Segment::Label(name) => {
                    out.push_str(&format!("[{}]", scoped_label(&spec.name, name)));
                    if !labels.contains(name) {
                        labels.push(name.clone());
                    }
                }
            }
        }
        chains.push(out);
    }

    for (path, category) in pending {
        inputs.push_asset(path, category);
    }

    let output = |declared: &Option<String>| {
        declared
            .as_ref()
            .filter(|label| labels.contains(label))
            .map(|label| scoped_label(&spec.name, label))
    };
    let video_label = output(&spec.video_output);
    let audio_label = output(&spec.audio_output);

    debug!(
        effect = %spec.name,
        level = level,
        bound = binding.len(),
        inputs = inputs.len(),
        "Bound effect placeholders"
    );

    Ok(BoundEffect {
        effect: spec.name.clone(),
        binding,
        chains,
        video_label,
        audio_label,
        labels: labels.iter().map(|l| scoped_label(&spec.name, l)).collect(),
    })
}

fn check_template(
    spec: &EffectSpec,
    template: &FragmentTemplate,
    resolved: &ResolvedSlots,
    has_overlay: bool,
) -> MediaResult<Availability> {
    let mut soft = None;

    for slot in template.slots() {
        match slot {
            Slot::Source => {}
            Slot::Overlay => {
                if !has_overlay {
                    soft.get_or_insert_with(|| slot.token());
                }
            }
            Slot::Asset(n) => {
                let asset = resolved.slot(n).ok_or_else(|| {
                    MediaError::malformed(
                        &spec.name,
                        format!("{} exceeds the {} declared asset slots", slot, resolved.len()),
                    )
                })?;
                if resolved.path(n).is_none() {
                    if asset.optional {
                        soft.get_or_insert_with(|| slot.token());
                    } else {
                        return Err(MediaError::unresolved(&spec.name, slot.token()));
                    }
                }
            }
        }
    }

    Ok(match soft {
        Some(token) => Availability::Soft(token),
        None => Availability::Ready,
    })
}

fn lookup_param<'a>(params: &'a [(&'static str, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.as_str())
}
