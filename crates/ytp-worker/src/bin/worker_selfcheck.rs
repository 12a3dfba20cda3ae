use std::path::Path;
use std::process::Command;

use ytp_media::{AssetInventory, EffectCatalog};
use ytp_models::AssetCategory;
use ytp_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env();

    println!(
        "worker-selfcheck: starting with output_dir={}",
        config.output_dir.display()
    );
    ensure_output_dir(&config.output_dir).await?;
    ensure_ffmpeg(&config.ffmpeg_bin)?;
    EffectCatalog::builtin()
        .validate()
        .map_err(|e| anyhow::anyhow!("effect catalog invalid: {}", e))?;
    report_assets(&config);

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_output_dir<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_ffmpeg(program: &Path) -> anyhow::Result<()> {
    let output = Command::new(program)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", program.display(), e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} -version failed: {:?}",
            program.display(),
            output.status
        ));
    }
    Ok(())
}

fn report_assets(config: &WorkerConfig) {
    let inventory = AssetInventory::scan(&config.assets);
    for category in AssetCategory::ALL {
        match config.assets.get(*category) {
            Some(dir) if !dir.is_dir() => {
                println!("worker-selfcheck: warning: {} dir {} missing", category, dir.display())
            }
            Some(_) => println!(
                "worker-selfcheck: {} assets: {}",
                category,
                inventory.count(*category)
            ),
            None => println!("worker-selfcheck: {} not configured", category),
        }
    }
}
