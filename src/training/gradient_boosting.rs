use anyhow::{Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use crate::config::BoostingConfig;

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// One boosting round: a regression tree fit on a column subset
#[derive(Debug, Serialize, Deserialize)]
struct Stage {
    columns: Vec<usize>,
    tree: Tree,
}

/// Squared-error gradient boosting over smartcore regression trees, with row
/// and column subsampling per round
#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    base_score: f64,
    learning_rate: f64,
    stages: Vec<Stage>,
}

impl GradientBoostedTrees {
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &BoostingConfig, seed: u64) -> Result<Self> {
        let n_rows = x.len();
        let n_cols = x.first().map(Vec::len).unwrap_or(0);
        if n_rows == 0 || n_cols == 0 || y.len() != n_rows {
            return Err(anyhow!(
                "Cannot boost on {} rows x {} columns with {} targets",
                n_rows,
                n_cols,
                y.len()
            ));
        }

        let rows_per_round = sample_size(n_rows, config.subsample);
        let cols_per_round = sample_size(n_cols, config.colsample);
        let tree_params = DecisionTreeRegressorParameters::default()
            .with_max_depth(config.max_depth)
            .with_min_samples_leaf(1);

        let base_score = y.iter().sum::<f64>() / n_rows as f64;
        let mut predictions = vec![base_score; n_rows];
        let mut stages = Vec::with_capacity(config.n_rounds);
        let mut rng = StdRng::seed_from_u64(seed);

        for round in 0..config.n_rounds {
            let residuals: Vec<f64> = y.iter().zip(&predictions).map(|(t, p)| t - p).collect();

            let rows = index::sample(&mut rng, n_rows, rows_per_round).into_vec();
            let mut columns = index::sample(&mut rng, n_cols, cols_per_round).into_vec();
            columns.sort_unstable();

            let sub_x: Vec<Vec<f64>> = rows.iter().map(|&r| project(&x[r], &columns)).collect();
            let sub_y: Vec<f64> = rows.iter().map(|&r| residuals[r]).collect();

            let tree = Tree::fit(&DenseMatrix::from_2d_vec(&sub_x), &sub_y, tree_params.clone())
                .map_err(|e| anyhow!("Boosting round {} failed: {}", round, e))?;

            let stage = Stage { columns, tree };
            let update = stage.predict(x)?;
            for (p, u) in predictions.iter_mut().zip(update) {
                *p += config.learning_rate * u;
            }
            stages.push(stage);
        }

        Ok(Self {
            base_score,
            learning_rate: config.learning_rate,
            stages,
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let mut predictions = vec![self.base_score; x.len()];
        for stage in &self.stages {
            for (p, u) in predictions.iter_mut().zip(stage.predict(x)?) {
                *p += self.learning_rate * u;
            }
        }
        Ok(predictions)
    }

    pub fn n_rounds(&self) -> usize {
        self.stages.len()
    }
}

impl Stage {
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        let projected: Vec<Vec<f64>> = x.iter().map(|row| project(row, &self.columns)).collect();
        self.tree
            .predict(&DenseMatrix::from_2d_vec(&projected))
            .map_err(|e| anyhow!("Tree prediction failed: {}", e))
    }
}

fn project(row: &[f64], columns: &[usize]) -> Vec<f64> {
    columns.iter().map(|&c| row[c]).collect()
}

fn sample_size(total: usize, fraction: f64) -> usize {
    ((total as f64 * fraction.clamp(0.0, 1.0)).round() as usize).clamp(1, total)
}
