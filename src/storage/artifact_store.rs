use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::error::{PredictError, ResourceError};
use crate::models::FeatureRow;
use crate::training::{CandidateReport, PricePipeline, RegressionMetrics, TrainingOutcome};

/// Envelope layout understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

const ARTIFACT_KIND: &str = "model";

/// The persisted model: fitted pipeline plus training metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub model_name: String,
    pub metrics: RegressionMetrics,
    pub candidates: Vec<CandidateReport>,
    pub pipeline: PricePipeline,
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

impl ModelArtifact {
    pub fn from_outcome(outcome: TrainingOutcome) -> Self {
        let best = outcome.best_report().clone();
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            model_name: best.name,
            metrics: best.metrics,
            candidates: outcome.candidates,
            pipeline: outcome.pipeline,
        }
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<f64, PredictError> {
        self.pipeline.predict(row)
    }
}

/// Write the artifact as gzip-compressed JSON, creating parent directories
pub fn save_artifact(artifact: &ModelArtifact, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, artifact).context("Failed to serialize model artifact")?;
    encoder
        .finish()
        .and_then(|mut writer| writer.flush())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        "💾 Saved {} model {} to {}",
        artifact.model_name,
        artifact.model_id,
        path.display()
    );
    Ok(())
}

/// Read an artifact written by [`save_artifact`], rejecting other format versions
pub fn load_artifact(path: &Path) -> Result<ModelArtifact, ResourceError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ResourceError::missing(ARTIFACT_KIND, path)
        } else {
            ResourceError::malformed(ARTIFACT_KIND, path, e)
        }
    })?;

    let mut body = Vec::new();
    GzDecoder::new(file)
        .read_to_end(&mut body)
        .map_err(|e| ResourceError::malformed(ARTIFACT_KIND, path, format!("not a gzip stream: {}", e)))?;

    let header: ArtifactHeader = serde_json::from_slice(&body)
        .map_err(|e| ResourceError::malformed(ARTIFACT_KIND, path, e))?;
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(ResourceError::malformed(
            ARTIFACT_KIND,
            path,
            format!(
                "format version {} is not supported (expected {})",
                header.format_version, ARTIFACT_FORMAT_VERSION
            ),
        ));
    }

    serde_json::from_slice(&body).map_err(|e| ResourceError::malformed(ARTIFACT_KIND, path, e))
}
