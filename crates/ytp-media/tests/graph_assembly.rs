//! Graph assembly properties over the built-in catalog.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use ytp_media::{AssetInventory, EffectCatalog, GraphAssembler, InputOrigin, MediaError};
use ytp_models::{AssetCategory, EffectSelection};

fn paths(prefix: &str, ext: &str, n: usize) -> Vec<PathBuf> {
    (0..n).map(|i| PathBuf::from(format!("/assets/{prefix}/{i}.{ext}"))).collect()
}

fn full_inventory() -> AssetInventory {
    AssetInventory::new()
        .with(AssetCategory::Image, paths("images", "png", 5))
        .with(AssetCategory::Meme, paths("memes", "png", 5))
        .with(AssetCategory::MemeSound, paths("meme_sounds", "mp3", 5))
        .with(AssetCategory::Sound, paths("sounds", "wav", 5))
        .with(AssetCategory::OverlayVideo, paths("overlays", "mp4", 5))
        .with(AssetCategory::Advert, paths("adverts", "mp4", 5))
        .with(AssetCategory::Error, paths("errors", "png", 5))
}

fn select(names: &[&str]) -> Vec<EffectSelection> {
    names.iter().map(|n| EffectSelection::new(*n)).collect()
}

fn permutations(items: &[&'static str]) -> Vec<Vec<&'static str>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head);
            out.push(tail);
        }
    }
    out
}

#[test]
fn test_referenced_indices_cover_all_inputs_for_every_order() {
    let catalog = EffectCatalog::builtin();
    let inventory = full_inventory();
    let effects = ["memes", "sounds", "rainbow", "adverts", "chorus"];

    for overlay in [None, Some(Path::new("/v/overlay.gif"))] {
        for order in permutations(&effects) {
            let graph = GraphAssembler::new(catalog)
                .assemble(
                    Path::new("/v/source.mp4"),
                    overlay,
                    &select(&order),
                    &inventory,
                    &mut StdRng::seed_from_u64(5),
                )
                .unwrap();

            let program = graph.program.as_ref().unwrap();
            let expected: BTreeSet<usize> = (0..graph.inputs.len()).collect();
            assert_eq!(program.referenced_indices(), expected, "order {:?}", order);

            for (i, input) in graph.inputs.iter().enumerate() {
                assert_eq!(input.index, i);
            }
        }
    }
}

#[test]
fn test_unreferenced_overlay_is_still_covered() {
    let graph = GraphAssembler::new(EffectCatalog::builtin())
        .assemble(
            Path::new("/v/source.mp4"),
            Some(Path::new("/v/overlay.gif")),
            &select(&["sounds", "invert"]),
            &full_inventory(),
            &mut StdRng::seed_from_u64(5),
        )
        .unwrap();

    let program = graph.program.unwrap();
    assert_eq!(program.referenced_indices(), BTreeSet::from([0, 1, 2, 3]));
    assert!(program.chains.iter().any(|c| c == "[1:v]nullsink"));
}

#[test]
fn test_binding_is_stable_for_same_seed() {
    let inventory = full_inventory();
    let selections = select(&["images", "memes", "sounds", "errors"]);
    let run = |seed| {
        GraphAssembler::new(EffectCatalog::builtin())
            .assemble(
                Path::new("/v/source.mp4"),
                None,
                &selections,
                &inventory,
                &mut StdRng::seed_from_u64(seed),
            )
            .unwrap()
    };

    let a = run(99);
    let b = run(99);
    assert_eq!(a, b);
    assert_eq!(a.program.unwrap().to_string(), b.program.unwrap().to_string());
}

#[test]
fn test_inputs_follow_effect_order() {
    let graph = GraphAssembler::new(EffectCatalog::builtin())
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["adverts", "images", "sounds"]),
            &full_inventory(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

    let origins: Vec<InputOrigin> = graph.inputs.iter().map(|i| i.origin).collect();
    assert_eq!(
        origins,
        vec![
            InputOrigin::Source,
            InputOrigin::Asset(AssetCategory::Advert),
            InputOrigin::Asset(AssetCategory::Image),
            InputOrigin::Asset(AssetCategory::Sound),
            InputOrigin::Asset(AssetCategory::Sound),
        ]
    );
}

#[test]
fn test_shortage_of_required_asset_is_fatal() {
    let inventory = AssetInventory::new().with(AssetCategory::Sound, paths("sounds", "wav", 1));

    let picked = ytp_media::resolve(AssetCategory::Sound, 2, &inventory, &mut StdRng::seed_from_u64(1));
    assert_eq!(picked.len(), 1);

    let err = GraphAssembler::new(EffectCatalog::builtin())
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["sounds"]),
            &inventory,
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
    match err {
        MediaError::UnresolvedPlaceholder { effect, token } => {
            assert_eq!(effect, "sounds");
            assert_eq!(token, "asset2");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_last_writer_wins_independently() {
    let graph = GraphAssembler::new(EffectCatalog::builtin())
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["sounds", "images", "chorus", "overlay_videos"]),
            &full_inventory(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();

    let program = graph.program.as_ref().unwrap();
    assert_eq!(program.outputs.video.as_deref(), Some("overlay_videos_vout"));
    assert_eq!(program.outputs.audio.as_deref(), Some("chorus_aout"));
    assert!(program.chains.iter().any(|c| c == "[images_vout]nullsink"));
    assert!(program.chains.iter().any(|c| c == "[sounds_aout]anullsink"));
    assert_eq!(graph.video_map(), "[overlay_videos_vout]");
    assert_eq!(graph.audio_map(), "[chorus_aout]");
}

#[test]
fn test_no_effects_passes_source_through() {
    let graph = GraphAssembler::new(EffectCatalog::builtin())
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &[],
            &full_inventory(),
            &mut StdRng::seed_from_u64(3),
        )
        .unwrap();

    assert!(graph.is_passthrough());
    assert_eq!(graph.inputs.paths(), vec![Path::new("/v/source.mp4")]);
}

#[test]
fn test_memes_scenario_with_and_without_meme_sound() {
    let catalog = EffectCatalog::builtin();
    let meme = PathBuf::from("/assets/memes/doge.png");
    let sound = PathBuf::from("/assets/meme_sounds/bruh.mp3");

    let with_sound = AssetInventory::new()
        .with(AssetCategory::Meme, vec![meme.clone()])
        .with(AssetCategory::MemeSound, vec![sound.clone()]);
    let graph = GraphAssembler::new(catalog)
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["memes"]),
            &with_sound,
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap();
    assert_eq!(graph.inputs.paths(), vec![Path::new("/v/source.mp4"), meme.as_path(), sound.as_path()]);
    assert_eq!(
        graph.program.unwrap().to_string(),
        "[0:v][1:v]overlay=10:10:shortest=1[memes_vout];[0:a][2:a]amix=inputs=2:duration=first[memes_aout]"
    );

    let meme_only = AssetInventory::new().with(AssetCategory::Meme, vec![meme.clone()]);
    let graph = GraphAssembler::new(catalog)
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["memes"]),
            &meme_only,
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap();
    assert_eq!(graph.inputs.len(), 2);
    assert_eq!(
        graph.program.unwrap().to_string(),
        "[0:v][1:v]overlay=10:10:shortest=1[memes_vout];[0:a]anull[memes_aout]"
    );

    let one_sound = meme_only.with(AssetCategory::Sound, vec![PathBuf::from("/assets/sounds/a.wav")]);
    let err = GraphAssembler::new(catalog)
        .assemble(
            Path::new("/v/source.mp4"),
            None,
            &select(&["memes", "sounds"]),
            &one_sound,
            &mut StdRng::seed_from_u64(8),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        MediaError::UnresolvedPlaceholder { ref effect, ref token } if effect == "sounds" && token == "asset2"
    ));
}
