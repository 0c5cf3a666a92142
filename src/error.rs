use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to load one of the flat files or the model artifact
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{kind} file not found: {}", path.display())]
    Missing { kind: &'static str, path: PathBuf },

    #[error("could not load {kind} from {}: {detail}", path.display())]
    Malformed {
        kind: &'static str,
        path: PathBuf,
        detail: String,
    },
}

impl ResourceError {
    pub fn missing(kind: &'static str, path: &Path) -> Self {
        ResourceError::Missing {
            kind,
            path: path.to_path_buf(),
        }
    }

    pub fn malformed(kind: &'static str, path: &Path, detail: impl ToString) -> Self {
        ResourceError::Malformed {
            kind,
            path: path.to_path_buf(),
            detail: detail.to_string(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ResourceError::Missing { .. })
    }
}

/// Failure to turn one feature row into a price estimate
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] crate::models::FeatureRowError),

    #[error("estimator failed: {0}")]
    Estimator(String),
}
