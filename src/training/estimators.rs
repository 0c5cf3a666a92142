use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::ridge_regression::{RidgeRegression, RidgeRegressionParameters};
use std::fmt;

use super::gradient_boosting::GradientBoostedTrees;
use super::preprocessor::Preprocessor;
use crate::config::BoostingConfig;
use crate::error::PredictError;
use crate::models::FeatureRow;

type Matrix = DenseMatrix<f64>;

/// Hyperparameters of one candidate estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorSpec {
    Ridge { alpha: f64 },
    RandomForest { n_trees: usize, max_depth: Option<u16> },
    GradientBoosting(BoostingConfig),
}

impl fmt::Display for EstimatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorSpec::Ridge { alpha } => write!(f, "ridge(alpha={})", alpha),
            EstimatorSpec::RandomForest { n_trees, max_depth } => match max_depth {
                Some(depth) => write!(f, "random_forest(n_trees={}, max_depth={})", n_trees, depth),
                None => write!(f, "random_forest(n_trees={}, max_depth=None)", n_trees),
            },
            EstimatorSpec::GradientBoosting(c) => write!(
                f,
                "gradient_boosting(n_rounds={}, learning_rate={}, max_depth={})",
                c.n_rounds, c.learning_rate, c.max_depth
            ),
        }
    }
}

/// Ridge regression with an unpenalized intercept: inputs and target are
/// centered before the fit and the means are restored at prediction time.
#[derive(Debug, Serialize, Deserialize)]
pub struct RidgeModel {
    model: RidgeRegression<f64, f64, Matrix, Vec<f64>>,
    x_means: Vec<f64>,
    y_mean: f64,
}

impl RidgeModel {
    fn fit(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self> {
        let n = x.len() as f64;
        let n_cols = x.first().map(Vec::len).unwrap_or(0);

        let mut x_means = vec![0.0; n_cols];
        for row in x {
            for (mean, value) in x_means.iter_mut().zip(row) {
                *mean += value / n;
            }
        }
        let y_mean = y.iter().sum::<f64>() / n;

        let centered_x = center(x, &x_means);
        let centered_y: Vec<f64> = y.iter().map(|v| v - y_mean).collect();

        let params = RidgeRegressionParameters::default()
            .with_alpha(alpha)
            .with_normalize(false);
        let model = RidgeRegression::fit(&DenseMatrix::from_2d_vec(&centered_x), &centered_y, params)
            .map_err(|e| anyhow!("Ridge fit failed: {}", e))?;

        Ok(Self { model, x_means, y_mean })
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let centered = DenseMatrix::from_2d_vec(&center(x, &self.x_means));
        let predictions = self
            .model
            .predict(&centered)
            .map_err(|e| anyhow!("Ridge prediction failed: {}", e))?;
        Ok(predictions.into_iter().map(|p| p + self.y_mean).collect())
    }
}

fn center(x: &[Vec<f64>], means: &[f64]) -> Vec<Vec<f64>> {
    x.iter()
        .map(|row| row.iter().zip(means).map(|(v, m)| v - m).collect())
        .collect()
}

/// A fitted regression estimator
#[derive(Debug, Serialize, Deserialize)]
pub enum Estimator {
    Ridge(RidgeModel),
    RandomForest(RandomForestRegressor<f64, f64, Matrix, Vec<f64>>),
    GradientBoosting(GradientBoostedTrees),
}

impl Estimator {
    pub fn fit(x: &[Vec<f64>], y: &[f64], spec: &EstimatorSpec, seed: u64) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(anyhow!("Cannot fit on {} rows with {} targets", x.len(), y.len()));
        }

        Ok(match spec {
            EstimatorSpec::Ridge { alpha } => Estimator::Ridge(RidgeModel::fit(x, y, *alpha)?),
            EstimatorSpec::RandomForest { n_trees, max_depth } => {
                let n_features = x[0].len();
                let mut params = RandomForestRegressorParameters::default()
                    .with_n_trees(*n_trees)
                    .with_m(n_features)
                    .with_seed(seed);
                if let Some(depth) = max_depth {
                    params = params.with_max_depth(*depth);
                }
                let model = RandomForestRegressor::fit(&DenseMatrix::from_2d_vec(&x.to_vec()), &y.to_vec(), params)
                    .map_err(|e| anyhow!("Random forest fit failed: {}", e))?;
                Estimator::RandomForest(model)
            }
            EstimatorSpec::GradientBoosting(config) => {
                Estimator::GradientBoosting(GradientBoostedTrees::fit(x, y, config, seed)?)
            }
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self {
            Estimator::Ridge(model) => model.predict(x),
            Estimator::RandomForest(model) => model
                .predict(&DenseMatrix::from_2d_vec(&x.to_vec()))
                .map_err(|e| anyhow!("Random forest prediction failed: {}", e)),
            Estimator::GradientBoosting(model) => model.predict(x),
        }
    }
}

/// Preprocessing and estimator bound together; the unit that gets persisted
#[derive(Debug, Serialize, Deserialize)]
pub struct PricePipeline {
    spec: EstimatorSpec,
    preprocessor: Preprocessor,
    estimator: Estimator,
}

impl PricePipeline {
    pub fn fit(rows: &[FeatureRow], targets: &[f64], spec: &EstimatorSpec, seed: u64) -> Result<Self> {
        let preprocessor = Preprocessor::fit(rows);
        let x = preprocessor.transform(rows);
        let estimator = Estimator::fit(&x, targets, spec, seed)?;

        Ok(Self {
            spec: spec.clone(),
            preprocessor,
            estimator,
        })
    }

    pub fn predict_rows(&self, rows: &[FeatureRow]) -> Result<Vec<f64>, PredictError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let x = self.preprocessor.transform(rows);
        let predictions = self
            .estimator
            .predict(&x)
            .map_err(|e| PredictError::Estimator(e.to_string()))?;

        if let Some(bad) = predictions.iter().find(|p| !p.is_finite()) {
            return Err(PredictError::Estimator(format!("non-finite prediction {}", bad)));
        }
        Ok(predictions)
    }

    pub fn predict(&self, row: &FeatureRow) -> Result<f64, PredictError> {
        self.predict_rows(std::slice::from_ref(row))?
            .first()
            .copied()
            .ok_or_else(|| PredictError::Estimator("estimator returned no prediction".to_string()))
    }
}
