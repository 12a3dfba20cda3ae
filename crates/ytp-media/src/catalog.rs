//! Effect catalog.
//!
//! Every effect is a plain record: the assets it draws, the filter chains it
//! contributes (written against symbolic inputs, see [`crate::template`]) and
//! the output pads it produces. The binder and assembler only read these
//! fields, so adding an effect means adding a record here.

use std::sync::OnceLock;

use tracing::warn;
use ytp_models::{AssetCategory, EffectSelection};

use crate::error::{MediaError, MediaResult};
use crate::template::{is_identifier, FragmentTemplate, Segment, Slot};

/// Computes named template parameters from an effect level.
pub type ParamFn = fn(f64) -> Vec<(&'static str, String)>;

/// Assets an effect draws from one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputRequirement {
    pub category: AssetCategory,
    pub count: usize,
    /// Optional assets may come up short; chains then use their fallbacks.
    pub optional: bool,
}

/// One asset slot after expanding requirements by count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetSlot {
    /// 1-based slot number (`{assetN:..}` in templates)
    pub number: usize,
    pub category: AssetCategory,
    pub optional: bool,
}

/// A filter chain with fallback alternatives.
///
/// The first alternative whose inputs are all available is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    pub alternatives: Vec<String>,
}

impl ChainSpec {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            alternatives: vec![template.into()],
        }
    }

    pub fn or(mut self, fallback: impl Into<String>) -> Self {
        self.alternatives.push(fallback.into());
        self
    }
}

/// Definition of a single effect.
#[derive(Debug, Clone)]
pub struct EffectSpec {
    pub name: String,
    pub display_name: String,
    pub inputs: Vec<InputRequirement>,
    pub chains: Vec<ChainSpec>,
    /// Effect-local label of the video pad this effect outputs
    pub video_output: Option<String>,
    /// Effect-local label of the audio pad this effect outputs
    pub audio_output: Option<String>,
    pub default_level: f64,
    pub max_level: f64,
    pub params: ParamFn,
}

fn no_params(_level: f64) -> Vec<(&'static str, String)> {
    Vec::new()
}

impl EffectSpec {
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            inputs: Vec::new(),
            chains: Vec::new(),
            video_output: None,
            audio_output: None,
            default_level: 1.0,
            max_level: 1.0,
            params: no_params,
        }
    }

    /// Require `count` assets of `category`.
    pub fn input(mut self, category: AssetCategory, count: usize) -> Self {
        self.inputs.push(InputRequirement {
            category,
            count,
            optional: false,
        });
        self
    }

    /// Draw up to `count` assets of `category` if available.
    pub fn optional_input(mut self, category: AssetCategory, count: usize) -> Self {
        self.inputs.push(InputRequirement {
            category,
            count,
            optional: true,
        });
        self
    }

    pub fn chain(mut self, chain: impl Into<ChainSpec>) -> Self {
        self.chains.push(chain.into());
        self
    }

    pub fn video_output(mut self, label: impl Into<String>) -> Self {
        self.video_output = Some(label.into());
        self
    }

    pub fn audio_output(mut self, label: impl Into<String>) -> Self {
        self.audio_output = Some(label.into());
        self
    }

    pub fn levels(mut self, default_level: f64, max_level: f64) -> Self {
        self.default_level = default_level;
        self.max_level = max_level;
        self
    }

    pub fn params(mut self, params: ParamFn) -> Self {
        self.params = params;
        self
    }

    /// Asset slots in requirement order, expanded by count.
    pub fn asset_slots(&self) -> Vec<AssetSlot> {
        let mut slots = Vec::new();
        for req in &self.inputs {
            for _ in 0..req.count {
                slots.push(AssetSlot {
                    number: slots.len() + 1,
                    category: req.category,
                    optional: req.optional,
                });
            }
        }
        slots
    }

    /// Requested level, or the default, clamped to `0..=max_level`.
    pub fn clamp_level(&self, requested: Option<f64>) -> f64 {
        let level = requested
            .filter(|l| l.is_finite())
            .unwrap_or(self.default_level);
        level.clamp(0.0, self.max_level.max(0.0))
    }

    pub fn produces_video(&self) -> bool {
        self.video_output.is_some()
    }

    pub fn produces_audio(&self) -> bool {
        self.audio_output.is_some()
    }

    /// Check the name, templates, slot numbers, parameters and declared outputs.
    pub fn validate(&self) -> MediaResult<()> {
        let slot_count = self.asset_slots().len();
        let params = (self.params)(self.default_level);
        let mut labels: Vec<String> = Vec::new();

        // The name prefixes every pad label the effect emits.
        if !is_identifier(&self.name) {
            return Err(MediaError::malformed(
                &self.name,
                "effect name must contain only ASCII letters, digits and '_'",
            ));
        }

        if self.chains.is_empty() {
            return Err(MediaError::malformed(&self.name, "effect has no filter chains"));
        }

        for chain in &self.chains {
            if chain.alternatives.is_empty() {
                return Err(MediaError::malformed(&self.name, "chain has no templates"));
            }
            for text in &chain.alternatives {
                let template = FragmentTemplate::parse(text)
                    .map_err(|e| MediaError::malformed(&self.name, e.to_string()))?;
                for segment in template.segments() {
                    match segment {
                        Segment::Stream { slot: Slot::Asset(n), .. } if *n > slot_count => {
                            return Err(MediaError::malformed(
                                &self.name,
                                format!("asset{} exceeds the {} declared asset slots", n, slot_count),
                            ));
                        }
                        Segment::Param(name) if !params.iter().any(|(k, _)| k == name) => {
                            return Err(MediaError::malformed(
                                &self.name,
                                format!("unknown parameter '{}'", name),
                            ));
                        }
                        _ => {}
                    }
                }
                labels.extend(template.labels().into_iter().map(str::to_string));
            }
        }

        for output in [&self.video_output, &self.audio_output].into_iter().flatten() {
            if !labels.contains(output) {
                return Err(MediaError::malformed(
                    &self.name,
                    format!("declared output [{}] is never produced", output),
                ));
            }
        }

        Ok(())
    }
}

impl From<&str> for ChainSpec {
    fn from(template: &str) -> Self {
        ChainSpec::new(template)
    }
}

/// Registry of effects, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct EffectCatalog {
    effects: Vec<EffectSpec>,
}

impl EffectCatalog {
    /// Empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide catalog of built-in effects.
    pub fn builtin() -> &'static EffectCatalog {
        static BUILTIN: OnceLock<EffectCatalog> = OnceLock::new();
        BUILTIN.get_or_init(EffectCatalog::with_builtins)
    }

    /// Fresh catalog holding the built-in effects.
    pub fn with_builtins() -> Self {
        Self::with_effects(builtin_effects())
    }

    /// Catalog holding exactly `effects`; later duplicates replace earlier ones.
    pub fn with_effects(effects: impl IntoIterator<Item = EffectSpec>) -> Self {
        let mut catalog = Self::new();
        for spec in effects {
            catalog.register(spec);
        }
        catalog
    }

    /// Add an effect, replacing any effect with the same name.
    pub fn register(&mut self, spec: EffectSpec) {
        if let Some(existing) = self.effects.iter_mut().find(|e| e.name == spec.name) {
            warn!(effect = %spec.name, "Replacing registered effect");
            *existing = spec;
        } else {
            self.effects.push(spec);
        }
    }

    pub fn lookup(&self, name: &str) -> MediaResult<&EffectSpec> {
        let wanted = name.trim();
        self.effects
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| MediaError::unknown_effect(wanted))
    }

    /// Look up every selection, failing on the first unknown name.
    pub fn lookup_all(&self, selections: &[EffectSelection]) -> MediaResult<Vec<&EffectSpec>> {
        selections.iter().map(|s| self.lookup(&s.name)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectSpec> {
        self.effects.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.effects.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn validate(&self) -> MediaResult<()> {
        self.effects.iter().try_for_each(EffectSpec::validate)
    }
}

// =============================================================================
// Built-in effects
// =============================================================================

/// Format a number for filter arguments: at most 3 decimals, no trailing zeros.
pub(crate) fn fmt_num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Split a tempo factor into `atempo` stages within the filter's 0.5..2.0 range.
fn atempo_chain(factor: f64) -> String {
    let mut stages = Vec::new();
    let mut t = factor;
    if t < 0.5 {
        while t < 0.5 {
            stages.push(0.5);
            t /= 0.5;
        }
    } else {
        while t > 2.0 {
            stages.push(2.0);
            t /= 2.0;
        }
    }
    stages.push(t);
    stages
        .into_iter()
        .map(|s| format!("atempo={}", fmt_num(s)))
        .collect::<Vec<_>>()
        .join(",")
}

fn random_sound_params(level: f64) -> Vec<(&'static str, String)> {
    vec![("volume", fmt_num(level.max(0.1)))]
}

fn speed_params(level: f64) -> Vec<(&'static str, String)> {
    let factor = level.clamp(0.125, 4.0);
    vec![
        ("pts", fmt_num(1.0 / factor)),
        ("atempo", atempo_chain(factor)),
    ]
}

fn chorus_params(level: f64) -> Vec<(&'static str, String)> {
    let delay = (20.0 + level * 60.0) as u32;
    let decay = (0.2 + level * 0.2).clamp(0.1, 0.9);
    vec![
        ("delays", format!("{}|{}", delay, delay * 2)),
        ("decays", format!("{}|{}", fmt_num(decay), fmt_num(decay * 0.6))),
    ]
}

fn vibrato_params(level: f64) -> Vec<(&'static str, String)> {
    let pitch = level.clamp(0.5, 2.0);
    vec![
        ("pitch", fmt_num(pitch)),
        ("tempo", fmt_num((1.0 / pitch).clamp(0.5, 2.0))),
    ]
}

fn stutter_params(level: f64) -> Vec<(&'static str, String)> {
    let loops = ((level * 3.0) as u32).max(2);
    vec![("loops", loops.to_string())]
}

fn earrape_params(level: f64) -> Vec<(&'static str, String)> {
    vec![("gain", fmt_num(level.clamp(2.0, 30.0)))]
}

fn dance_squid_params(level: f64) -> Vec<(&'static str, String)> {
    vec![("zoom", fmt_num(1.0 + 0.05 * level))]
}

fn sus_params(level: f64) -> Vec<(&'static str, String)> {
    let pitch = 1.0 + 0.1 * level;
    vec![
        ("pitch", fmt_num(pitch)),
        ("tempo", fmt_num((1.0 / pitch).clamp(0.5, 2.0))),
    ]
}

fn explosion_params(level: f64) -> Vec<(&'static str, String)> {
    vec![("period", fmt_num((6.0 / level.max(0.1)).max(0.8)))]
}

fn sentence_mix_params(level: f64) -> Vec<(&'static str, String)> {
    let keep = (1.5 - 0.2 * level).max(0.3);
    vec![("period", "2".to_string()), ("keep", fmt_num(keep))]
}

/// The built-in effect table, in menu order.
pub fn builtin_effects() -> Vec<EffectSpec> {
    use AssetCategory::*;

    vec![
        EffectSpec::new("random_sound", "Add Random Sound (legacy)")
            .chain("{source:a}volume={param:volume}[aout]")
            .audio_output("aout")
            .levels(1.0, 5.0)
            .params(random_sound_params),
        EffectSpec::new("sounds", "Add Sound from Assets")
            .input(Sound, 2)
            .chain("{source:a}{asset1:a}{asset2:a}amix=inputs=3:duration=first:dropout_transition=2[aout]")
            .audio_output("aout")
            .levels(1.0, 5.0),
        EffectSpec::new("reverse", "Reverse Clip (video & audio)")
            .chain("{source:v}reverse,setpts=PTS-STARTPTS[vout]")
            .chain("{source:a}areverse,asetpts=PTS-STARTPTS[aout]")
            .video_output("vout")
            .audio_output("aout"),
        EffectSpec::new("speed", "Speed Up / Slow Down")
            .chain("{source:v}setpts={param:pts}*PTS[vout]")
            .chain("{source:a}{param:atempo}[aout]")
            .video_output("vout")
            .audio_output("aout")
            .levels(1.0, 4.0)
            .params(speed_params),
        EffectSpec::new("chorus", "Chorus Effect (aecho)")
            .chain("{source:a}aecho=0.8:0.9:{param:delays}:{param:decays}[aout]")
            .audio_output("aout")
            .levels(0.6, 2.0)
            .params(chorus_params),
        EffectSpec::new("vibrato", "Vibrato / Pitch Bend (asetrate+atempo)")
            .chain("{source:a}asetrate=44100*{param:pitch},aresample=44100,atempo={param:tempo}[aout]")
            .audio_output("aout")
            .levels(1.0, 2.0)
            .params(vibrato_params),
        EffectSpec::new("stutter", "Stutter Loop")
            .chain("{source:v}trim=0:0.15,setpts=PTS-STARTPTS,loop=loop={param:loops}:size=4:start=0[vout]")
            .chain("{source:a}atrim=0:0.15,asetpts=PTS-STARTPTS,aloop=loop={param:loops}:size=6615[aout]")
            .video_output("vout")
            .audio_output("aout")
            .levels(0.5, 3.0)
            .params(stutter_params),
        EffectSpec::new("earrape", "Earrape Mode (gain)")
            .chain("{source:v}eq=contrast=1.1:saturation=1.4[vout]")
            .chain("{source:a}volume={param:gain}[aout]")
            .video_output("vout")
            .audio_output("aout")
            .levels(6.0, 30.0)
            .params(earrape_params),
        EffectSpec::new("autotune", "Auto-Tune Chaos")
            .chain("{source:a}anull[aout]")
            .audio_output("aout"),
        EffectSpec::new("dance_squid", "Dance & Squidward Mode")
            .chain("{source:v}scale=iw*{param:zoom}:ih*{param:zoom},transpose=1,transpose=2,format=yuv420p[vout]")
            .video_output("vout")
            .levels(1.0, 3.0)
            .params(dance_squid_params),
        EffectSpec::new("invert", "Invert Colors")
            .chain("{source:v}negate[vout]")
            .video_output("vout"),
        EffectSpec::new("rainbow", "Rainbow Overlay (user PNG/GIF)")
            .optional_input(Image, 1)
            .chain(
                ChainSpec::new("{source:v}{overlay:v}overlay=10:10:shortest=1[vout]")
                    .or("{source:v}{asset1:v}overlay=10:10:shortest=1[vout]")
                    .or("{source:v}null[vout]"),
            )
            .video_output("vout"),
        EffectSpec::new("mirror", "Mirror Mode")
            .chain("{source:v}hflip[vout]")
            .video_output("vout"),
        EffectSpec::new("sus", "Sus Effect (random pitch/tempo)")
            .chain("{source:a}asetrate=44100*{param:pitch},aresample=44100,atempo={param:tempo}[aout]")
            .audio_output("aout")
            .levels(1.0, 3.0)
            .params(sus_params),
        EffectSpec::new("explosion_spam", "Explosion Spam (repetitive overlays)")
            .optional_input(Image, 1)
            .chain(
                ChainSpec::new("{source:v}{asset1:v}overlay=enable='lt(mod(t,{param:period}),0.6)':x=10:y=10[vout]")
                    .or("{source:v}{overlay:v}overlay=enable='lt(mod(t,{param:period}),0.6)':x=10:y=10[vout]")
                    .or("{source:v}null[vout]"),
            )
            .video_output("vout")
            .levels(2.0, 10.0)
            .params(explosion_params),
        EffectSpec::new("frame_shuffle", "Frame Shuffle")
            .chain("{source:v}tblend=all_mode=addition,framestep=1[vout]")
            .video_output("vout"),
        EffectSpec::new("meme_injection", "Meme Injection (overlay image/audio)")
            .optional_input(Meme, 1)
            .optional_input(MemeSound, 1)
            .chain(
                ChainSpec::new("{source:v}{asset1:v}overlay=W-w-10:H-h-10[vout]")
                    .or("{source:v}{overlay:v}overlay=W-w-10:H-h-10[vout]")
                    .or("{source:v}null[vout]"),
            )
            .chain(
                ChainSpec::new("{source:a}{asset2:a}amix=inputs=2:duration=first[aout]")
                    .or("{source:a}anull[aout]"),
            )
            .video_output("vout")
            .audio_output("aout")
            .levels(1.0, 3.0),
        EffectSpec::new("meme_sounds", "Meme Sounds (assets)")
            .input(MemeSound, 1)
            .chain("{source:a}{asset1:a}amix=inputs=2:duration=first[aout]")
            .audio_output("aout")
            .levels(1.0, 3.0),
        EffectSpec::new("memes", "Memes (images + sounds)")
            .input(Meme, 1)
            .optional_input(MemeSound, 1)
            .chain("{source:v}{asset1:v}overlay=10:10:shortest=1[vout]")
            .chain(
                ChainSpec::new("{source:a}{asset2:a}amix=inputs=2:duration=first[aout]")
                    .or("{source:a}anull[aout]"),
            )
            .video_output("vout")
            .audio_output("aout")
            .levels(1.0, 3.0),
        EffectSpec::new("sentence_mix", "Sentence Mixing / Random Cuts")
            .chain("{source:v}select='lt(mod(t,{param:period}),{param:keep})',setpts=N/FRAME_RATE/TB[vout]")
            .chain("{source:a}aselect='lt(mod(t,{param:period}),{param:keep})',asetpts=N/SR/TB[aout]")
            .video_output("vout")
            .audio_output("aout")
            .levels(1.0, 5.0)
            .params(sentence_mix_params),
        EffectSpec::new("adverts", "Adverts (overlay ad video)")
            .input(Advert, 1)
            .chain("{source:v}{asset1:v}overlay=enable='between(t,0,3)':x=W-w-10:y=10[vout]")
            .video_output("vout")
            .levels(1.0, 3.0),
        EffectSpec::new("errors", "Error / Glitch Overlays")
            .input(Error, 1)
            .chain("{source:v}{asset1:v}overlay=enable='gt(mod(t,0.8),0.4)':x=0:y=0[vout]")
            .video_output("vout")
            .levels(1.0, 3.0),
        EffectSpec::new("images", "Image Montage / Injection")
            .input(Image, 1)
            .chain("{source:v}{asset1:v}overlay=enable='between(t,1,4)':x=main_w/4:y=main_h/4[vout]")
            .video_output("vout")
            .levels(1.0, 5.0),
        EffectSpec::new("overlay_videos", "Overlay Short Videos")
            .input(OverlayVideo, 1)
            .chain("{source:v}{asset1:v}overlay=10:10:shortest=1[vout]")
            .video_output("vout")
            .levels(1.0, 5.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = EffectCatalog::builtin();
        assert_eq!(catalog.len(), 24);
        catalog.validate().unwrap();
    }

    #[test]
    fn test_lookup_known_and_unknown() {
        let catalog = EffectCatalog::builtin();
        assert_eq!(catalog.lookup("memes").unwrap().name, "memes");
        assert_eq!(catalog.lookup(" Mirror ").unwrap().name, "mirror");
        match catalog.lookup("vaporwave") {
            Err(MediaError::UnknownEffect(name)) => assert_eq!(name, "vaporwave"),
            other => panic!("expected UnknownEffect, got {:?}", other.map(|e| &e.name)),
        }
    }

    #[test]
    fn test_lookup_all_fails_on_first_unknown() {
        let catalog = EffectCatalog::builtin();
        let selections = vec![
            EffectSelection::new("memes"),
            EffectSelection::new("nope"),
            EffectSelection::new("also_nope"),
        ];
        let err = catalog.lookup_all(&selections).unwrap_err();
        assert!(matches!(err, MediaError::UnknownEffect(ref n) if n == "nope"));
    }

    #[test]
    fn test_register_extends_and_replaces() {
        let mut catalog = EffectCatalog::with_builtins();
        let before = catalog.len();

        catalog.register(
            EffectSpec::new("grayscale", "Grayscale")
                .chain("{source:v}hue=s=0[vout]")
                .video_output("vout"),
        );
        assert_eq!(catalog.len(), before + 1);

        catalog.register(
            EffectSpec::new("mirror", "Vertical Mirror")
                .chain("{source:v}vflip[vout]")
                .video_output("vout"),
        );
        assert_eq!(catalog.len(), before + 1);
        assert_eq!(catalog.lookup("mirror").unwrap().display_name, "Vertical Mirror");
        catalog.validate().unwrap();
    }

    #[test]
    fn test_asset_slots_expand_counts() {
        let spec = EffectCatalog::builtin().lookup("memes").unwrap();
        let slots = spec.asset_slots();
        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].category, AssetCategory::Meme);
        assert!(!slots[0].optional);
        assert_eq!(slots[1].number, 2);
        assert_eq!(slots[1].category, AssetCategory::MemeSound);
        assert!(slots[1].optional);

        let sounds = EffectCatalog::builtin().lookup("sounds").unwrap();
        assert_eq!(sounds.asset_slots().len(), 2);
        assert!(sounds.asset_slots().iter().all(|s| s.category == AssetCategory::Sound));
    }

    #[test]
    fn test_validate_rejects_bad_specs() {
        let out_of_range = EffectSpec::new("bad", "Bad")
            .input(AssetCategory::Image, 1)
            .chain("{source:v}{asset2:v}overlay[vout]")
            .video_output("vout");
        assert!(matches!(out_of_range.validate(), Err(MediaError::MalformedFragment { .. })));

        let missing_output = EffectSpec::new("bad", "Bad")
            .chain("{source:v}null[v]")
            .video_output("vout");
        assert!(missing_output.validate().is_err());

        let unknown_param = EffectSpec::new("bad", "Bad")
            .chain("{source:a}volume={param:gain}[aout]")
            .audio_output("aout");
        assert!(unknown_param.validate().is_err());

        let unparsable = EffectSpec::new("bad", "Bad").chain("{source:v}null[vout");
        assert!(unparsable.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_names_unfit_for_labels() {
        for name in ["my glow", "glow]", "glow;x", "glow:v", ""] {
            let spec = EffectSpec::new(name, "Glow")
                .chain("{source:v}negate[vout]")
                .video_output("vout");
            assert!(
                matches!(spec.validate(), Err(MediaError::MalformedFragment { .. })),
                "name {:?} accepted",
                name
            );
        }

        let spec = EffectSpec::new("glow_2", "Glow")
            .chain("{source:v}negate[vout]")
            .video_output("vout");
        spec.validate().unwrap();
    }

    #[test]
    fn test_clamp_level() {
        let speed = EffectCatalog::builtin().lookup("speed").unwrap();
        assert_eq!(speed.clamp_level(None), 1.0);
        assert_eq!(speed.clamp_level(Some(9.0)), 4.0);
        assert_eq!(speed.clamp_level(Some(-1.0)), 0.0);
        assert_eq!(speed.clamp_level(Some(f64::NAN)), 1.0);
    }

    #[test]
    fn test_atempo_chain_stays_in_range() {
        assert_eq!(atempo_chain(1.0), "atempo=1");
        assert_eq!(atempo_chain(4.0), "atempo=2,atempo=2");
        assert_eq!(atempo_chain(3.0), "atempo=2,atempo=1.5");
        assert_eq!(atempo_chain(0.25), "atempo=0.5,atempo=0.5");
    }

    #[test]
    fn test_param_functions() {
        assert_eq!(speed_params(2.0), vec![("pts", "0.5".to_string()), ("atempo", "atempo=2".to_string())]);
        assert_eq!(earrape_params(100.0), vec![("gain", "30".to_string())]);
        assert_eq!(stutter_params(0.1), vec![("loops", "2".to_string())]);
        assert_eq!(
            chorus_params(1.0),
            vec![("delays", "80|160".to_string()), ("decays", "0.4|0.24".to_string())]
        );
    }

    #[test]
    fn test_fmt_num() {
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(0.5), "0.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.333");
        assert_eq!(fmt_num(0.0), "0");
    }
}
