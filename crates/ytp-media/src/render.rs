//! Render planning and execution.
//!
//! A render is planned synchronously (effect validation, asset scan, graph
//! assembly, command construction) and then handed to an
//! [`EngineExecutor`]. Planning never touches the destination.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use ytp_models::{AssetDirectories, EffectSelection, RenderProfile};

use crate::assets::AssetInventory;
use crate::binder::InputOrigin;
use crate::catalog::EffectCatalog;
use crate::command::{EngineExecutor, FfmpegCommand, DEFAULT_ENGINE, DEFAULT_LOG_LEVEL};
use crate::error::{MediaError, MediaResult};
use crate::graph::{AssembledGraph, GraphAssembler};

/// Everything needed to plan one render.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: PathBuf,
    pub overlay: Option<PathBuf>,
    pub effects: Vec<EffectSelection>,
    pub destination: PathBuf,
    pub profile: RenderProfile,
    /// Engine executable
    pub engine: PathBuf,
    /// Engine `-loglevel`
    pub log_level: String,
}

impl RenderRequest {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            overlay: None,
            effects: Vec::new(),
            destination: destination.into(),
            profile: RenderProfile::Final,
            engine: PathBuf::from(DEFAULT_ENGINE),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }

    pub fn with_overlay(mut self, overlay: impl Into<PathBuf>) -> Self {
        self.overlay = Some(overlay.into());
        self
    }

    pub fn with_effects(mut self, effects: Vec<EffectSelection>) -> Self {
        self.effects = effects;
        self
    }

    pub fn with_profile(mut self, profile: RenderProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_engine(mut self, engine: impl Into<PathBuf>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

/// An assembled graph and the command that renders it.
#[derive(Debug, Clone)]
pub struct RenderPlan {
    pub graph: AssembledGraph,
    pub command: FfmpegCommand,
}

/// Summary of a finished render.
#[derive(Debug, Clone, Serialize)]
pub struct RenderOutcome {
    pub destination: PathBuf,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub input_count: usize,
    pub passthrough: bool,
    pub elapsed_ms: u64,
}

/// Validate effects, scan assets and build the render command.
///
/// Unknown effect names fail before any directory is scanned.
pub fn plan_render<R: Rng + ?Sized>(
    request: &RenderRequest,
    catalog: &EffectCatalog,
    dirs: &AssetDirectories,
    rng: &mut R,
) -> MediaResult<RenderPlan> {
    catalog.lookup_all(&request.effects)?;

    let inventory = AssetInventory::scan(dirs);
    debug!(assets = inventory.total(), "Asset inventory ready");

    let graph = GraphAssembler::new(catalog).assemble(
        &request.source,
        request.overlay.as_deref(),
        &request.effects,
        &inventory,
        rng,
    )?;

    let command = build_command(&graph, &request.destination, request.profile)
        .program(&request.engine)
        .log_level(&request.log_level);

    Ok(RenderPlan { graph, command })
}

/// Build the engine command for an assembled graph.
pub fn build_command(graph: &AssembledGraph, destination: &Path, profile: RenderProfile) -> FfmpegCommand {
    let mut command = FfmpegCommand::new(destination);

    for input in graph.inputs.iter() {
        command = match input.origin {
            InputOrigin::Source => command.input_with_args(profile.source_input_args(), &input.path),
            _ => command.input(&input.path),
        };
    }

    if let Some(program) = &graph.program {
        command = command.filter_complex(program.to_string());
    }

    command = command
        .map(graph.video_map())
        .map(graph.audio_map())
        .output_args(profile.encoding().to_ffmpeg_args());

    if profile.stops_at_shortest() {
        command = command.output_arg("-shortest");
    }

    command
}

/// Render an assembled graph to `destination` with the default engine.
pub async fn render<E: EngineExecutor + ?Sized>(
    graph: &AssembledGraph,
    destination: &Path,
    profile: RenderProfile,
    executor: &E,
) -> MediaResult<RenderOutcome> {
    let plan = RenderPlan {
        graph: graph.clone(),
        command: build_command(graph, destination, profile),
    };
    execute_plan(&plan, executor).await
}

/// Run a planned render.
///
/// A failed, timed-out or cancelled run removes whatever partial output
/// the engine left behind.
pub async fn execute_plan<E: EngineExecutor + ?Sized>(
    plan: &RenderPlan,
    executor: &E,
) -> MediaResult<RenderOutcome> {
    let destination = plan.command.output_path().to_path_buf();
    check_paths(plan, &destination)?;

    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let args = plan.command.build_args();
    info!(command = %plan.command.command_line(), "Running FFmpeg");

    let start = Instant::now();
    let result = executor.execute(plan.command.program_path(), &args).await;

    let output = match result {
        Ok(output) if output.success() => output,
        Ok(output) => {
            remove_partial(&destination).await;
            return Err(MediaError::engine_failed(output.exit_code, output.stderr));
        }
        Err(e) => {
            remove_partial(&destination).await;
            return Err(e);
        }
    };

    let elapsed_ms = start.elapsed().as_millis() as u64;
    if !output.stderr.is_empty() {
        debug!(stderr = %output.stderr, "Engine diagnostics");
    }
    info!(
        destination = %destination.display(),
        elapsed_ms = elapsed_ms,
        applied = ?plan.graph.applied,
        "Render complete"
    );

    Ok(RenderOutcome {
        destination,
        applied: plan.graph.applied.clone(),
        skipped: plan.graph.skipped.clone(),
        input_count: plan.graph.inputs.len(),
        passthrough: plan.graph.is_passthrough(),
        elapsed_ms,
    })
}

fn check_paths(plan: &RenderPlan, destination: &Path) -> MediaResult<()> {
    if destination.as_os_str().is_empty() {
        return Err(MediaError::InvalidOutput("destination is empty".to_string()));
    }
    if destination.is_dir() {
        return Err(MediaError::InvalidOutput(format!(
            "{} is a directory",
            destination.display()
        )));
    }

    let dest_key = path_key(destination);
    for input in plan.graph.inputs.iter() {
        if !input.path.is_file() {
            return Err(MediaError::FileNotFound(input.path.clone()));
        }
        if path_key(&input.path) == dest_key {
            return Err(MediaError::InvalidOutput(format!(
                "{} is also an input",
                destination.display()
            )));
        }
    }
    Ok(())
}

/// Comparable form of a path; falls back to the path itself when it can't
/// be canonicalized (e.g. the destination does not exist yet).
fn path_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

async fn remove_partial(destination: &Path) {
    match tokio::fs::remove_file(destination).await {
        Ok(()) => debug!(path = %destination.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %destination.display(), error = %e, "Failed to remove partial output"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{EngineOutput, MockEngineExecutor};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;
    use ytp_models::AssetCategory;

    struct Fixture {
        dir: TempDir,
        source: PathBuf,
        memes: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"video").unwrap();
        let memes = dir.path().join("memes");
        std::fs::create_dir(&memes).unwrap();
        std::fs::write(memes.join("doge.png"), b"png").unwrap();
        Fixture { dir, source, memes }
    }

    fn count_inputs(args: &[String]) -> usize {
        args.iter().filter(|a| *a == "-i").count()
    }

    #[test]
    fn test_plan_render_builds_command() {
        let fx = fixture();
        let dirs = AssetDirectories::new().with(AssetCategory::Meme, &fx.memes);
        let request = RenderRequest::new(&fx.source, fx.dir.path().join("out.mp4"))
            .with_effects(vec![EffectSelection::new("memes"), EffectSelection::new("chorus")]);

        let plan = plan_render(&request, EffectCatalog::builtin(), &dirs, &mut StdRng::seed_from_u64(1)).unwrap();
        let args = plan.command.build_args();

        assert_eq!(count_inputs(&args), 2);
        assert!(args.contains(&"-filter_complex".to_string()));
        assert!(args.windows(2).any(|w| w == ["-map", "[memes_vout]"]));
        assert!(args.windows(2).any(|w| w == ["-map", "[chorus_aout]"]));
        assert!(!args.contains(&"-shortest".to_string()));
    }

    #[test]
    fn test_plan_render_unknown_effect() {
        let fx = fixture();
        let request = RenderRequest::new(&fx.source, fx.dir.path().join("out.mp4"))
            .with_effects(vec![EffectSelection::new("wobble")]);
        let err = plan_render(
            &request,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap_err();
        assert!(matches!(err, MediaError::UnknownEffect(_)));
    }

    #[test]
    fn test_preview_profile_trims_source() {
        let fx = fixture();
        let request = RenderRequest::new(&fx.source, fx.dir.path().join("p.mp4"))
            .with_profile(RenderProfile::Preview { duration_secs: 5 });
        let plan = plan_render(
            &request,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let args = plan.command.build_args();
        assert!(args.windows(4).any(|w| w == ["-ss", "0", "-t", "5"]));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(args.contains(&"veryfast".to_string()));
        assert!(args.windows(2).any(|w| w == ["-map", "0:v?"]));
    }

    #[tokio::test]
    async fn test_execute_plan_success() {
        let fx = fixture();
        let request = RenderRequest::new(&fx.source, fx.dir.path().join("nested/out.mp4"))
            .with_effects(vec![EffectSelection::new("mirror")]);
        let plan = plan_render(
            &request,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let mut mock = MockEngineExecutor::new();
        mock.expect_execute()
            .withf(|program, args| program == Path::new("ffmpeg") && args.iter().filter(|a| *a == "-i").count() == 1)
            .times(1)
            .returning(|_, _| Ok(EngineOutput { exit_code: Some(0), ..Default::default() }));

        let outcome = execute_plan(&plan, &mock).await.unwrap();
        assert_eq!(outcome.applied, vec!["mirror"]);
        assert_eq!(outcome.input_count, 1);
        assert!(!outcome.passthrough);
        assert!(fx.dir.path().join("nested").is_dir());
    }

    #[tokio::test]
    async fn test_engine_failure_removes_partial_output() {
        let fx = fixture();
        let dest = fx.dir.path().join("out.mp4");
        let request = RenderRequest::new(&fx.source, &dest);
        let plan = plan_render(
            &request,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let partial = dest.clone();
        let mut mock = MockEngineExecutor::new();
        mock.expect_execute().returning(move |_, _| {
            std::fs::write(&partial, b"half").unwrap();
            Ok(EngineOutput {
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "Invalid data found when processing input".to_string(),
            })
        });

        let err = execute_plan(&plan, &mock).await.unwrap_err();
        match err {
            MediaError::EngineInvocationFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(1));
                assert!(stderr.contains("Invalid data"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancelled_run_propagates() {
        let fx = fixture();
        let dest = fx.dir.path().join("out.mp4");
        let plan = plan_render(
            &RenderRequest::new(&fx.source, &dest),
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();

        let mut mock = MockEngineExecutor::new();
        mock.expect_execute().returning(|_, _| Err(MediaError::Cancelled));

        assert!(matches!(execute_plan(&plan, &mock).await, Err(MediaError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_input_and_self_overwrite() {
        let fx = fixture();
        let mut mock = MockEngineExecutor::new();
        mock.expect_execute().times(0);

        let missing = RenderRequest::new(fx.dir.path().join("gone.mp4"), fx.dir.path().join("o.mp4"));
        let plan = plan_render(
            &missing,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(matches!(execute_plan(&plan, &mock).await, Err(MediaError::FileNotFound(_))));

        let clobber = RenderRequest::new(&fx.source, &fx.source);
        let plan = plan_render(
            &clobber,
            EffectCatalog::builtin(),
            &AssetDirectories::new(),
            &mut StdRng::seed_from_u64(1),
        )
        .unwrap();
        assert!(matches!(execute_plan(&plan, &mock).await, Err(MediaError::InvalidOutput(_))));
    }

    #[tokio::test]
    async fn test_render_uses_given_graph() {
        let fx = fixture();
        let graph = GraphAssembler::new(EffectCatalog::builtin())
            .assemble(
                &fx.source,
                None,
                &[EffectSelection::new("invert")],
                &AssetInventory::new(),
                &mut StdRng::seed_from_u64(1),
            )
            .unwrap();

        let mut mock = MockEngineExecutor::new();
        mock.expect_execute()
            .withf(|_, args| args.windows(2).any(|w| w == ["-filter_complex", "[0:v]negate[invert_vout]"]))
            .returning(|_, _| Ok(EngineOutput { exit_code: Some(0), ..Default::default() }));

        let outcome = render(&graph, &fx.dir.path().join("o.mp4"), RenderProfile::Final, &mock)
            .await
            .unwrap();
        assert_eq!(outcome.applied, vec!["invert"]);
    }
}
