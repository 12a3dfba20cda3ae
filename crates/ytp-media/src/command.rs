//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{is_progress_line, ProgressCallback, ProgressParser};

/// Engine executable used when none is configured.
pub const DEFAULT_ENGINE: &str = "ffmpeg";

/// Default `-loglevel` passed to the engine.
pub const DEFAULT_LOG_LEVEL: &str = "error";

/// Number of diagnostic stderr lines kept for error reporting.
const STDERR_TAIL_LINES: usize = 50;

/// One `-i` input with the options that precede it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CommandInput {
    args: Vec<String>,
    path: PathBuf,
}

/// Builder for FFmpeg commands with multiple inputs.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    program: PathBuf,
    inputs: Vec<CommandInput>,
    filter_complex: Option<String>,
    maps: Vec<String>,
    output_args: Vec<String>,
    output: PathBuf,
    overwrite: bool,
    log_level: String,
    progress: bool,
}

impl FfmpegCommand {
    /// Create a command writing to `output`.
    pub fn new(output: impl AsRef<Path>) -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ENGINE),
            inputs: Vec::new(),
            filter_complex: None,
            maps: Vec::new(),
            output_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            overwrite: true,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            progress: true,
        }
    }

    /// Engine executable (name on PATH or explicit path).
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Add an input file.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        self.input_with_args(Vec::<String>::new(), path)
    }

    /// Add an input file preceded by input options (e.g. `-ss`, `-t`).
    pub fn input_with_args<I, S>(mut self, args: I, path: impl AsRef<Path>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.push(CommandInput {
            args: args.into_iter().map(Into::into).collect(),
            path: path.as_ref().to_path_buf(),
        });
        self
    }

    /// Set filter complex.
    pub fn filter_complex(mut self, filter: impl Into<String>) -> Self {
        self.filter_complex = Some(filter.into());
        self
    }

    /// Add a `-map` target (`[label]` or a stream specifier).
    pub fn map(mut self, target: impl Into<String>) -> Self {
        self.maps.push(target.into());
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Disable `-progress pipe:2`.
    pub fn without_progress(mut self) -> Self {
        self.progress = false;
        self
    }

    pub fn program_path(&self) -> &Path {
        &self.program
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }
        args.push("-hide_banner".to_string());

        args.push("-loglevel".to_string());
        args.push(self.log_level.clone());

        if self.progress {
            args.push("-progress".to_string());
            args.push("pipe:2".to_string());
        }

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.path.to_string_lossy().to_string());
        }

        if let Some(filter) = &self.filter_complex {
            args.push("-filter_complex".to_string());
            args.push(filter.clone());
        }

        for target in &self.maps {
            args.push("-map".to_string());
            args.push(target.clone());
        }

        args.extend(self.output_args.iter().cloned());

        args.push(self.output.to_string_lossy().to_string());

        args
    }

    /// Shell-like rendering of the full command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.build_args())
            .map(|arg| quote_arg(&arg))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=,+@%".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Captured result of one engine process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    /// Diagnostic stderr lines; progress blocks are not retained
    pub stderr: String,
}

impl EngineOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the external engine.
///
/// A non-zero exit is reported through [`EngineOutput::exit_code`], not as
/// an error; errors are reserved for failing to run the process at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngineExecutor: Send + Sync {
    async fn execute(&self, program: &Path, args: &[String]) -> MediaResult<EngineOutput>;
}

/// Locate the engine executable.
pub fn check_ffmpeg(program: impl AsRef<Path>) -> MediaResult<PathBuf> {
    let program = program.as_ref();
    which::which(program).map_err(|_| MediaError::EngineNotFound {
        program: program.display().to_string(),
    })
}

enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut(u64),
    Cancelled,
}

/// Runner for FFmpeg processes with progress tracking, timeout and cancellation.
#[derive(Default)]
pub struct FfmpegRunner {
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
    progress: Option<ProgressCallback>,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kill the process once the receiver observes `true`.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Kill the process after `secs` seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<WaitOutcome> {
        let timeout_secs = self.timeout_secs;
        let timeout = async move {
            match timeout_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };

        let cancel_rx = self.cancel_rx.clone();
        let cancelled = async move {
            if let Some(mut rx) = cancel_rx {
                if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                    return;
                }
            }
            // No signal, or the sender is gone: never cancels.
            std::future::pending::<()>().await
        };

        tokio::select! {
            status = child.wait() => Ok(WaitOutcome::Exited(status?)),
            _ = timeout => Ok(WaitOutcome::TimedOut(timeout_secs.unwrap_or_default())),
            _ = cancelled => Ok(WaitOutcome::Cancelled),
        }
    }
}

#[async_trait]
impl EngineExecutor for FfmpegRunner {
    async fn execute(&self, program: &Path, args: &[String]) -> MediaResult<EngineOutput> {
        let program = check_ffmpeg(program)?;
        debug!(program = %program.display(), args = args.len(), "Spawning engine");

        let mut child = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("engine stderr not captured"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| MediaError::internal("engine stdout not captured"))?;

        let progress = self.progress.clone();
        let stderr_task = tokio::spawn(async move {
            let mut reader = BufReader::new(stderr).lines();
            let mut parser = ProgressParser::new();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);

            while let Ok(Some(line)) = reader.next_line().await {
                if is_progress_line(&line) {
                    if let (Some(snapshot), Some(callback)) = (parser.feed(&line), progress.as_ref()) {
                        callback(snapshot);
                    }
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }

            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let stdout_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stdout.read_to_string(&mut buf).await;
            buf
        });

        let outcome = self.wait_for_completion(&mut child).await?;

        let status = match outcome {
            WaitOutcome::Exited(status) => status,
            WaitOutcome::TimedOut(secs) => {
                warn!("Engine timed out after {} seconds, killing process", secs);
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill engine process");
                }
                return Err(MediaError::EngineTimeout(secs));
            }
            WaitOutcome::Cancelled => {
                info!("Render cancelled, killing engine process");
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "Failed to kill engine process");
                }
                return Err(MediaError::Cancelled);
            }
        };

        let stderr = stderr_task
            .await
            .map_err(|e| MediaError::internal(format!("stderr reader failed: {}", e)))?;
        let stdout = stdout_task
            .await
            .map_err(|e| MediaError::internal(format!("stdout reader failed: {}", e)))?;

        debug!(exit_code = ?status.code(), "Engine exited");

        Ok(EngineOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}
