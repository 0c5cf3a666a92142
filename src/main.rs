use anyhow::{Context, Result};
use price_insights::config::PipelineSettings;
use price_insights::pipeline::{run_clean, run_collect, run_train};
use std::env;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    price_insights::init_logging();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let settings = PipelineSettings::load(PipelineSettings::config_path_from_args(&args))
        .context("Failed to load pipeline configuration")?;

    // Reuse the raw CSV from an earlier run instead of scraping again
    let skip_collect = args.iter().any(|arg| arg == "--skip-collect" || arg == "-s");

    info!("🚀 Starting price insights pipeline");

    if skip_collect {
        info!("Skipping collection, using {}", settings.paths.raw_csv.display());
    } else {
        let collected = run_collect(&settings).await?;
        if collected == 0 {
            warn!("Nothing collected, stopping before clean and train");
            return Ok(());
        }
    }

    run_clean(&settings.paths)?;
    run_train(&settings.paths, &settings.trainer)?;

    info!("🎉 Pipeline finished; start the dashboard with `cargo run --bin dashboard`");
    Ok(())
}
