//! YTP render worker binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ytp_media::{AssetInventory, EffectCatalog};
use ytp_models::{AssetCategory, AssetDirectories, EffectSelection};
use ytp_worker::{process_render_job, RenderJob, WorkerConfig};

#[derive(Parser, Debug)]
#[command(name = "ytp-worker", version, about = "Assemble and render YTP-style edits with FFmpeg")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a video with the selected effects.
    Render(RenderArgs),
    /// List the available effects.
    Effects {
        /// Print as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show how many assets each category currently holds.
    Scan(AssetArgs),
    /// Print the JSON schema of an assets file.
    Schema,
}

#[derive(Parser, Debug)]
struct AssetArgs {
    /// JSON file mapping asset categories to directories.
    #[arg(long)]
    assets_file: Option<PathBuf>,

    /// Asset directory for one category, as CATEGORY=DIR (repeatable).
    #[arg(long = "asset", value_parser = parse_asset_dir)]
    assets: Vec<(AssetCategory, PathBuf)>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Primary video.
    #[arg(long)]
    source: PathBuf,

    /// Optional overlay image or video.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Effect to apply, as NAME[:LEVEL[:PROBABILITY]] (repeatable, applied in order).
    #[arg(long = "effect")]
    effects: Vec<EffectSelection>,

    /// Output file or directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Render a short low-quality preview.
    #[arg(long, default_value_t = false)]
    preview: bool,

    /// Preview length in seconds.
    #[arg(long)]
    preview_secs: Option<u32>,

    /// Seed for reproducible asset picks.
    #[arg(long)]
    seed: Option<u64>,

    /// Render timeout in seconds (0 disables).
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the FFmpeg command without running it.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// FFmpeg executable.
    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(flatten)]
    assets: AssetArgs,
}

fn parse_asset_dir(s: &str) -> Result<(AssetCategory, PathBuf), String> {
    let (category, dir) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=DIR, got '{}'", s))?;
    let category = category.parse::<AssetCategory>().map_err(|e| e.to_string())?;
    if dir.trim().is_empty() {
        return Err(format!("empty directory for {}", category));
    }
    Ok((category, PathBuf::from(dir.trim())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    init_tracing()?;

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Render(args) => cmd_render(args).await,
        Command::Effects { json } => cmd_effects(json),
        Command::Scan(args) => cmd_scan(args),
        Command::Schema => cmd_schema(),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Colored output for dev, JSON when `LOG_FORMAT=json`. Logs go to stderr.
fn init_tracing() -> anyhow::Result<()> {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("ytp=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
    Ok(())
}

fn load_assets(base: AssetDirectories, args: &AssetArgs) -> anyhow::Result<AssetDirectories> {
    let mut dirs = base;
    if let Some(path) = &args.assets_file {
        dirs.merge(read_assets_file(path)?);
    }
    for (category, dir) in &args.assets {
        dirs.set(*category, dir);
    }
    Ok(dirs)
}

fn read_assets_file(path: &Path) -> anyhow::Result<AssetDirectories> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read assets file '{}'", path.display()))?;
    AssetDirectories::from_json(&json).with_context(|| format!("parse assets file '{}'", path.display()))
}

async fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = WorkerConfig::from_env();
    config.assets = load_assets(config.assets.clone(), &args.assets)?;
    if let Some(ffmpeg) = args.ffmpeg {
        config.ffmpeg_bin = ffmpeg;
    }
    info!("Worker config: {:?}", config);

    let job = RenderJob {
        source: args.source,
        overlay: args.overlay,
        effects: args.effects,
        output: args.out,
        preview: args.preview,
        preview_secs: args.preview_secs,
        seed: args.seed,
        timeout_secs: args.timeout,
        dry_run: args.dry_run,
    };

    // Ctrl-C cancels the running render
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal, cancelling render");
            let _ = cancel_tx.send(true);
        }
    });

    let result = match process_render_job(&job, &config, cancel_rx).await {
        Ok(result) => result,
        Err(e) if e.is_cancelled() => {
            info!("Render cancelled, partial output removed");
            std::process::exit(130);
        }
        Err(e) => return Err(e.into()),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.dry_run {
        println!("{}", result.command_line);
    } else {
        println!("{}", result.destination.display());
    }
    Ok(())
}

fn cmd_effects(json: bool) -> anyhow::Result<()> {
    let catalog = EffectCatalog::builtin();

    if json {
        let entries: Vec<serde_json::Value> = catalog
            .iter()
            .map(|spec| {
                serde_json::json!({
                    "name": spec.name,
                    "display_name": spec.display_name,
                    "inputs": spec.inputs.iter().map(|r| serde_json::json!({
                        "category": r.category,
                        "count": r.count,
                        "optional": r.optional,
                    })).collect::<Vec<_>>(),
                    "video": spec.produces_video(),
                    "audio": spec.produces_audio(),
                    "default_level": spec.default_level,
                    "max_level": spec.max_level,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for spec in catalog.iter() {
        let inputs: Vec<String> = spec
            .inputs
            .iter()
            .map(|r| format!("{}x{}{}", r.category, r.count, if r.optional { "?" } else { "" }))
            .collect();
        let streams = match (spec.produces_video(), spec.produces_audio()) {
            (true, true) => "av",
            (true, false) => "v",
            (false, true) => "a",
            (false, false) => "-",
        };
        println!(
            "{:<16} {:<3} level {}/{}  {:<28} {}",
            spec.name,
            streams,
            spec.default_level,
            spec.max_level,
            inputs.join(","),
            spec.display_name
        );
    }
    Ok(())
}

fn cmd_scan(args: AssetArgs) -> anyhow::Result<()> {
    let dirs = load_assets(AssetDirectories::from_env(), &args)?;
    let inventory = AssetInventory::scan(&dirs);

    for category in AssetCategory::ALL {
        let dir = dirs
            .get(*category)
            .map(|d| d.display().to_string())
            .unwrap_or_else(|| "(not configured)".to_string());
        println!("{:<14} {:>4}  {}", category.as_str(), inventory.count(*category), dir);
    }
    println!("{:<14} {:>4}", "total", inventory.total());
    Ok(())
}

fn cmd_schema() -> anyhow::Result<()> {
    let schema = schemars::schema_for!(AssetDirectories);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
