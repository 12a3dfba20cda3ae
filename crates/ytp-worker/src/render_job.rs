//! Render job processing.
//!
//! A job is one render request from the front end: it is turned into a
//! [`RenderRequest`], planned against the configured asset directories and
//! handed to the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, Instrument};

use ytp_media::{
    execute_plan, plan_render, EffectCatalog, EngineExecutor, FfmpegProgress, FfmpegRunner, RenderRequest,
};
use ytp_models::{EffectSelection, RenderProfile};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RenderLogger;

/// One render as requested by the front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RenderJob {
    /// Primary video
    pub source: PathBuf,
    /// Optional user overlay (image or video)
    #[serde(default)]
    pub overlay: Option<PathBuf>,
    /// Effects in application order
    #[serde(default)]
    pub effects: Vec<EffectSelection>,
    /// Output file or directory; defaults to the configured output dir
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Render a short low-quality preview
    #[serde(default)]
    pub preview: bool,
    /// Preview length override
    #[serde(default)]
    pub preview_secs: Option<u32>,
    /// Seed for asset sampling and probability rolls
    #[serde(default)]
    pub seed: Option<u64>,
    /// Timeout override in seconds (0 disables)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Plan and print the command without running it
    #[serde(default)]
    pub dry_run: bool,
}

/// What a processed job produced.
#[derive(Debug, Clone, Serialize)]
pub struct RenderJobResult {
    pub render_id: String,
    pub destination: PathBuf,
    pub command_line: String,
    pub inputs: Vec<PathBuf>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub dry_run: bool,
    pub elapsed_ms: Option<u64>,
}

impl RenderJob {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Render profile for this job.
    pub fn profile(&self, config: &WorkerConfig) -> RenderProfile {
        if self.preview {
            RenderProfile::Preview {
                duration_secs: self.preview_secs.filter(|s| *s > 0).unwrap_or(config.preview_secs),
            }
        } else {
            RenderProfile::Final
        }
    }

    /// Effective timeout in seconds, if any.
    pub fn timeout_secs(&self, config: &WorkerConfig) -> Option<u64> {
        match self.timeout_secs {
            Some(0) => None,
            Some(secs) => Some(secs),
            None => config.render_timeout.map(|d| d.as_secs()),
        }
    }
}

/// Default output file name: `<source stem>_ytp_<unix secs>.mp4`.
pub fn default_output_name(source: &Path, unix_secs: i64) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "output".to_string());
    format!("{}_ytp_{}.mp4", stem, unix_secs)
}

/// Where the job's render is written.
///
/// An explicit output that is an existing directory receives the default
/// file name; any other explicit output is used as is.
pub fn resolve_destination(job: &RenderJob, config: &WorkerConfig, unix_secs: i64) -> PathBuf {
    let name = default_output_name(&job.source, unix_secs);
    match &job.output {
        Some(out) if out.is_dir() => out.join(name),
        Some(out) => out.clone(),
        None => config.output_dir.join(name),
    }
}

/// Build the media-layer request for a job.
pub fn build_request(job: &RenderJob, config: &WorkerConfig, unix_secs: i64) -> WorkerResult<RenderRequest> {
    if job.source.as_os_str().is_empty() {
        return Err(WorkerError::invalid_request("source path is empty"));
    }

    let mut request = RenderRequest::new(&job.source, resolve_destination(job, config, unix_secs))
        .with_effects(job.effects.clone())
        .with_profile(job.profile(config))
        .with_engine(&config.ffmpeg_bin)
        .with_log_level(&config.ffmpeg_log_level);

    if let Some(overlay) = &job.overlay {
        request = request.with_overlay(overlay);
    }

    Ok(request)
}

/// Process a render job with the FFmpeg runner.
pub async fn process_render_job(
    job: &RenderJob,
    config: &WorkerConfig,
    cancel_rx: watch::Receiver<bool>,
) -> WorkerResult<RenderJobResult> {
    let logger = RenderLogger::new(if job.preview { "preview" } else { "render" });

    let mut runner = FfmpegRunner::new().with_cancel(cancel_rx);
    if let Some(secs) = job.timeout_secs(config) {
        runner = runner.with_timeout(secs);
    }

    let total_ms = match job.profile(config) {
        RenderProfile::Preview { duration_secs } => Some(duration_secs as i64 * 1000),
        RenderProfile::Final => None,
    };
    let progress_logger = logger.clone();
    runner = runner.with_progress(Arc::new(move |progress: FfmpegProgress| {
        let message = match total_ms {
            Some(total) => format!("{:.0}% at {:.2}x", progress.percentage(total), progress.speed),
            None => format!("{} at {:.2}x", progress.out_time, progress.speed),
        };
        if progress.is_complete {
            progress_logger.log_progress("encoding finished");
        } else {
            debug!(render_id = %progress_logger.render_id(), frame = progress.frame, "{}", message);
        }
    }));

    process_render_job_with(job, config, &runner, &logger).await
}

/// Process a render job with any engine executor.
pub async fn process_render_job_with<E: EngineExecutor + ?Sized>(
    job: &RenderJob,
    config: &WorkerConfig,
    executor: &E,
    logger: &RenderLogger,
) -> WorkerResult<RenderJobResult> {
    run_job(job, config, executor, logger)
        .instrument(logger.create_span())
        .await
}

async fn run_job<E: EngineExecutor + ?Sized>(
    job: &RenderJob,
    config: &WorkerConfig,
    executor: &E,
    logger: &RenderLogger,
) -> WorkerResult<RenderJobResult> {
    logger.log_start(&format!(
        "{} with {} effect(s)",
        job.source.display(),
        job.effects.len()
    ));

    let request = build_request(job, config, chrono::Utc::now().timestamp())?;
    let mut rng = match job.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let plan = match plan_render(&request, EffectCatalog::builtin(), &config.assets, &mut rng) {
        Ok(plan) => plan,
        Err(e) => {
            logger.log_error(&e.to_string());
            return Err(e.into());
        }
    };

    for name in &plan.graph.skipped {
        logger.log_warning(&format!("effect '{}' skipped by its probability roll", name));
    }

    let mut result = RenderJobResult {
        render_id: logger.render_id().to_string(),
        destination: request.destination.clone(),
        command_line: plan.command.command_line(),
        inputs: plan.graph.inputs.iter().map(|i| i.path.clone()).collect(),
        applied: plan.graph.applied.clone(),
        skipped: plan.graph.skipped.clone(),
        dry_run: job.dry_run,
        elapsed_ms: None,
    };

    if job.dry_run {
        logger.log_completion("dry run, engine not started");
        return Ok(result);
    }

    match execute_plan(&plan, executor).await {
        Ok(outcome) => {
            result.elapsed_ms = Some(outcome.elapsed_ms);
            logger.log_completion(&format!(
                "{} in {} ms",
                outcome.destination.display(),
                outcome.elapsed_ms
            ));
            Ok(result)
        }
        Err(e) => {
            logger.log_error(&e.to_string());
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use ytp_media::{EngineOutput, MediaError, MediaResult};

    #[derive(Default)]
    struct CountingEngine {
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl EngineExecutor for CountingEngine {
        async fn execute(&self, _program: &Path, _args: &[String]) -> MediaResult<EngineOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EngineOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        }
    }

    struct CancelledEngine;

    #[async_trait::async_trait]
    impl EngineExecutor for CancelledEngine {
        async fn execute(&self, _program: &Path, _args: &[String]) -> MediaResult<EngineOutput> {
            Err(MediaError::Cancelled)
        }
    }

    fn config(dir: &Path) -> WorkerConfig {
        WorkerConfig {
            output_dir: dir.join("renders"),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(default_output_name(Path::new("/v/My Clip.mov"), 1700000000), "My Clip_ytp_1700000000.mp4");
        assert_eq!(default_output_name(Path::new("/"), 5), "output_ytp_5.mp4");
    }

    #[test]
    fn test_resolve_destination() {
        let dir = TempDir::new().unwrap();
        let cfg = config(dir.path());
        let mut job = RenderJob::new("/v/clip.mp4");

        assert_eq!(resolve_destination(&job, &cfg, 7), dir.path().join("renders/clip_ytp_7.mp4"));

        job.output = Some(dir.path().to_path_buf());
        assert_eq!(resolve_destination(&job, &cfg, 7), dir.path().join("clip_ytp_7.mp4"));

        job.output = Some(dir.path().join("final.mp4"));
        assert_eq!(resolve_destination(&job, &cfg, 7), dir.path().join("final.mp4"));
    }

    #[test]
    fn test_profile_and_timeout() {
        let cfg = WorkerConfig {
            preview_secs: 6,
            render_timeout: Some(Duration::from_secs(90)),
            ..Default::default()
        };
        let mut job = RenderJob::new("/v/clip.mp4");
        assert_eq!(job.profile(&cfg), RenderProfile::Final);
        assert_eq!(job.timeout_secs(&cfg), Some(90));

        job.preview = true;
        assert_eq!(job.profile(&cfg), RenderProfile::Preview { duration_secs: 6 });
        job.preview_secs = Some(3);
        assert_eq!(job.profile(&cfg), RenderProfile::Preview { duration_secs: 3 });

        job.timeout_secs = Some(0);
        assert_eq!(job.timeout_secs(&cfg), None);
    }

    #[test]
    fn test_build_request_rejects_empty_source() {
        let err = build_request(&RenderJob::default(), &WorkerConfig::default(), 0).unwrap_err();
        assert!(matches!(err, WorkerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_dry_run_does_not_start_engine() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"v").unwrap();

        let mut job = RenderJob::new(&source);
        job.effects = vec![EffectSelection::new("mirror")];
        job.dry_run = true;
        job.seed = Some(1);

        let engine = CountingEngine::default();
        let logger = RenderLogger::from_string("test", "render");
        let result = process_render_job_with(&job, &config(dir.path()), &engine, &logger)
            .await
            .unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
        assert!(result.dry_run);
        assert!(result.command_line.contains("-filter_complex"));
        assert_eq!(result.applied, vec!["mirror"]);
        assert_eq!(result.render_id, "test");
    }

    #[tokio::test]
    async fn test_job_runs_engine_once() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"v").unwrap();

        let mut job = RenderJob::new(&source);
        job.effects = vec![EffectSelection::new("reverse")];
        job.output = Some(dir.path().join("out.mp4"));

        let engine = CountingEngine::default();
        let logger = RenderLogger::new("render");
        let result = process_render_job_with(&job, &config(dir.path()), &engine, &logger)
            .await
            .unwrap();

        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.destination, dir.path().join("out.mp4"));
        assert!(result.elapsed_ms.is_some());
    }

    #[tokio::test]
    async fn test_unknown_effect_is_reported() {
        let mut job = RenderJob::new("/v/clip.mp4");
        job.effects = vec![EffectSelection::new("nope")];

        let engine = CountingEngine::default();
        let logger = RenderLogger::new("render");
        let err = process_render_job_with(&job, &WorkerConfig::default(), &engine, &logger)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Media(MediaError::UnknownEffect(_))));
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn test_cancelled_render_is_reported_as_cancelled() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"v").unwrap();

        let mut job = RenderJob::new(&source);
        job.output = Some(dir.path().join("out.mp4"));

        let logger = RenderLogger::new("render");
        let err = process_render_job_with(&job, &config(dir.path()), &CancelledEngine, &logger)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!err.is_user_error());
        assert!(!dir.path().join("out.mp4").exists());
    }
}
