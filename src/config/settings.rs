use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::CollectorConfig;

pub const DEFAULT_CONFIG_PATH: &str = "configs/pipeline.toml";
pub const ENV_PREFIX: &str = "PRICE_INSIGHTS";

/// Settings shared by every pipeline stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub paths: PathsConfig,
    pub collector: CollectorConfig,
    pub trainer: TrainerConfig,
    pub dashboard: DashboardConfig,
}

/// Flat files that couple the stages together
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub raw_csv: PathBuf,
    pub clean_csv: PathBuf,
    pub model_artifact: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub seed: u64,
    pub test_fraction: f64,
    pub cv_folds: usize,
    pub min_rows: usize,
    pub ridge_alphas: Vec<f64>,
    pub forest_trees: Vec<usize>,
    /// 0 means the trees grow without a depth limit
    pub forest_max_depths: Vec<u16>,
    pub boosting: BoostingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingConfig {
    pub n_rounds: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    pub subsample: f64,
    pub colsample: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub bind: String,
    pub preview_rows: usize,
}

impl PipelineSettings {
    /// Load settings from a TOML file (optional) layered with
    /// `PRICE_INSIGHTS_<SECTION>__<KEY>` environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read pipeline config: {}", path))?;

        settings
            .try_deserialize::<PipelineSettings>()
            .with_context(|| format!("Failed to parse pipeline config: {}", path))
    }

    /// Pick `--config <path>` out of the process arguments
    pub fn config_path_from_args(args: &[String]) -> Option<&str> {
        args.iter()
            .position(|arg| arg == "--config" || arg == "-c")
            .and_then(|idx| args.get(idx + 1))
            .map(|s| s.as_str())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_csv: PathBuf::from("data/raw/flipkart_laptops.csv"),
            clean_csv: PathBuf::from("data/processed/flipkart_laptops_clean.csv"),
            model_artifact: PathBuf::from("models/artifacts/best_price_model.json.gz"),
        }
    }
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            test_fraction: 0.2,
            cv_folds: 3,
            min_rows: 10,
            ridge_alphas: vec![0.1, 1.0, 10.0],
            forest_trees: vec![200, 400],
            forest_max_depths: vec![0, 10, 20],
            boosting: BoostingConfig::default(),
        }
    }
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_rounds: 500,
            learning_rate: 0.05,
            max_depth: 6,
            subsample: 0.8,
            colsample: 0.8,
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            preview_rows: 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("absent-{}.toml", Uuid::new_v4()));
        let settings = PipelineSettings::load(path.to_str()).unwrap();

        assert_eq!(settings.trainer.seed, 42);
        assert_eq!(settings.trainer.cv_folds, 3);
        assert_eq!(settings.collector.scraping.query, "laptop");
        assert_eq!(settings.dashboard.preview_rows, 5);
    }

    #[test]
    fn test_file_overrides_selected_keys() {
        let path = std::env::temp_dir().join(format!("pipeline-{}.toml", Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"
[paths]
raw_csv = "tmp/raw.csv"

[collector.scraping]
max_pages = 2
renderer = "http"

[trainer]
ridge_alphas = [0.5]
"#,
        )
        .unwrap();

        let settings = PipelineSettings::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(settings.paths.raw_csv, PathBuf::from("tmp/raw.csv"));
        assert_eq!(
            settings.paths.clean_csv,
            PathBuf::from("data/processed/flipkart_laptops_clean.csv")
        );
        assert_eq!(settings.collector.scraping.max_pages, 2);
        assert_eq!(
            settings.collector.scraping.renderer,
            crate::config::RendererKind::Http
        );
        assert_eq!(settings.collector.scraping.query, "laptop");
        assert_eq!(settings.trainer.ridge_alphas, vec![0.5]);
        assert_eq!(settings.trainer.boosting.n_rounds, 500);
    }

    #[test]
    fn test_config_path_from_args() {
        let args: Vec<String> = ["clean", "--config", "alt.toml"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(PipelineSettings::config_path_from_args(&args), Some("alt.toml"));
        assert_eq!(PipelineSettings::config_path_from_args(&args[..1]), None);
    }
}
