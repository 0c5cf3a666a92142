use anyhow::{Context, Result};
use price_insights::config::PipelineSettings;
use price_insights::pipeline::run_train;
use std::env;

fn main() -> Result<()> {
    price_insights::init_logging();
    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let settings = PipelineSettings::load(PipelineSettings::config_path_from_args(&args))
        .context("Failed to load pipeline configuration")?;

    let artifact = run_train(&settings.paths, &settings.trainer)?;
    for candidate in &artifact.candidates {
        println!(
            "{:<18} {:<60} MAE {:>10.1}  RMSE {:>10.1}  R2 {:>7.4}",
            candidate.name,
            candidate.params.to_string(),
            candidate.metrics.mae,
            candidate.metrics.rmse,
            candidate.metrics.r2
        );
    }
    println!("Best model: {} -> {}", artifact.model_name, settings.paths.model_artifact.display());
    Ok(())
}
