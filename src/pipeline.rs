use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::config::{CollectorConfig, PathsConfig, PipelineSettings, TrainerConfig};
use crate::fetcher::{ListingCollector, PageRenderer, renderer_from_config};
use crate::processor::{NormalizeReport, RuleNormalizer};
use crate::storage::{
    ModelArtifact, listings_to_dataframe, read_cleaned_listings, read_csv, save_artifact, write_csv,
};
use crate::training::PriceModelTrainer;

/// Scrape with the configured renderer and write the raw CSV
pub async fn run_collect(settings: &PipelineSettings) -> Result<usize> {
    let renderer = renderer_from_config(&settings.collector).context("Failed to start page renderer")?;
    collect_listings(renderer, &settings.collector, &settings.paths.raw_csv).await
}

/// Scrape every configured page and write all records at once. Nothing is
/// written when no records were collected.
pub async fn collect_listings(
    renderer: Box<dyn PageRenderer>,
    config: &CollectorConfig,
    output: &Path,
) -> Result<usize> {
    info!(
        "🚀 Collecting '{}' from {} ({} pages)",
        config.scraping.query, config.site.name, config.scraping.max_pages
    );

    let listings = {
        let collector = ListingCollector::new(renderer, config.clone())?;
        collector
            .collect(&config.scraping.query, config.scraping.max_pages)
            .await
    };

    if listings.is_empty() {
        warn!("No listings collected; {} was not written", output.display());
        return Ok(0);
    }

    let mut df = listings_to_dataframe(&listings)?;
    write_csv(&mut df, output)?;
    info!("✅ Collected {} listings", listings.len());
    Ok(listings.len())
}

/// Raw CSV in, cleaned CSV out
pub fn run_clean(paths: &PathsConfig) -> Result<NormalizeReport> {
    info!("🧹 Cleaning {}", paths.raw_csv.display());

    let raw = read_csv(&paths.raw_csv, "raw data")?;
    let normalizer = RuleNormalizer::new()?;
    let (mut cleaned, report) = normalizer
        .normalize_dataframe(&raw)
        .with_context(|| format!("Failed to normalize {}", paths.raw_csv.display()))?;

    write_csv(&mut cleaned, &paths.clean_csv)?;
    info!("✅ Cleaned {} -> {} rows", report.rows_in, report.after_outliers);
    Ok(report)
}

/// Cleaned CSV in, model artifact out
pub fn run_train(paths: &PathsConfig, config: &TrainerConfig) -> Result<ModelArtifact> {
    info!("🧠 Training on {}", paths.clean_csv.display());

    let listings = read_cleaned_listings(&paths.clean_csv)?;
    let outcome = PriceModelTrainer::new(config.clone()).train(&listings)?;
    let artifact = ModelArtifact::from_outcome(outcome);

    save_artifact(&artifact, &paths.model_artifact)?;
    info!(
        "✅ Best model: {} (MAE {:.1}, RMSE {:.1}, R2 {:.4})",
        artifact.model_name, artifact.metrics.mae, artifact.metrics.rmse, artifact.metrics.r2
    );
    Ok(artifact)
}
