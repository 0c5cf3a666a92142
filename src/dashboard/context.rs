use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::config::PathsConfig;
use crate::error::{PredictError, ResourceError};
use crate::models::{CleanedListing, FeatureRow};
use crate::storage::{ModelArtifact, load_artifact, read_cleaned_listings};

/// Everything the dashboard reads, loaded once at startup and never mutated.
///
/// Each resource keeps its own load result so a broken model still lets
/// the data views render, and the reason for any failure can be shown.
pub struct DashboardContext {
    pub data: Result<Vec<CleanedListing>, ResourceError>,
    pub model: Result<ModelArtifact, ResourceError>,
}

impl DashboardContext {
    pub fn load(paths: &PathsConfig) -> Self {
        let data = read_cleaned_listings(&paths.clean_csv);
        match &data {
            Ok(rows) => info!("📊 Loaded {} cleaned listings from {}", rows.len(), paths.clean_csv.display()),
            Err(e) => warn!("{}", e),
        }

        let model = load_artifact(&paths.model_artifact);
        match &model {
            Ok(artifact) => info!(
                "🤖 Loaded {} model {} trained at {}",
                artifact.model_name, artifact.model_id, artifact.trained_at
            ),
            Err(e) => warn!("{}", e),
        }

        Self { data, model }
    }

    /// Load failures in display order
    pub fn diagnostics(&self) -> Vec<String> {
        [self.data.as_ref().err(), self.model.as_ref().err()]
            .into_iter()
            .flatten()
            .map(|e| e.to_string())
            .collect()
    }

    /// Price estimate from the loaded model; `None` when no model is available
    pub fn predict(&self, row: &FeatureRow) -> Option<Result<f64, PredictError>> {
        self.model.as_ref().ok().map(|artifact| artifact.predict(row))
    }
}

/// Number of listings at each distinct price, ascending by price
pub fn price_distribution(listings: &[CleanedListing]) -> Vec<(i64, usize)> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for listing in listings {
        *counts.entry(listing.price).or_default() += 1;
    }
    counts.into_iter().collect()
}
