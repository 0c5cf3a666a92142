use anyhow::{Context, Result};
use price_insights::config::PipelineSettings;
use price_insights::pipeline::run_clean;
use std::env;

fn main() -> Result<()> {
    price_insights::init_logging();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let settings = PipelineSettings::load(PipelineSettings::config_path_from_args(&args))
        .context("Failed to load pipeline configuration")?;

    run_clean(&settings.paths)?;
    Ok(())
}
