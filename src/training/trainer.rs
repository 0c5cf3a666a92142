use anyhow::{Context, Result, anyhow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::estimators::{EstimatorSpec, PricePipeline};
use super::grid_search::grid_search;
use super::metrics::{RegressionMetrics, evaluate, select_best};
use crate::config::TrainerConfig;
use crate::models::{CleanedListing, FeatureRow};

/// Held-out result for one estimator family after its grid search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateReport {
    pub name: String,
    pub params: EstimatorSpec,
    pub cv_r2: f64,
    pub metrics: RegressionMetrics,
}

/// Every candidate's report plus the winning fitted pipeline
pub struct TrainingOutcome {
    pub candidates: Vec<CandidateReport>,
    pub best: usize,
    pub pipeline: PricePipeline,
}

impl TrainingOutcome {
    pub fn best_report(&self) -> &CandidateReport {
        &self.candidates[self.best]
    }
}

/// Seeded shuffle split into `(train, test)` index sets. The test side holds
/// `ceil(test_fraction * n)` rows, and each side keeps at least one row.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < 2 {
        return (indices, Vec::new());
    }

    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction.clamp(0.0, 1.0)).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}

pub struct PriceModelTrainer {
    config: TrainerConfig,
}

impl PriceModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self { config }
    }

    /// Candidate families in evaluation order, each with its parameter grid
    pub fn candidate_grids(&self) -> Vec<(&'static str, Vec<EstimatorSpec>)> {
        let ridge: Vec<EstimatorSpec> = self
            .config
            .ridge_alphas
            .iter()
            .map(|&alpha| EstimatorSpec::Ridge { alpha })
            .collect();

        let forest: Vec<EstimatorSpec> = self
            .config
            .forest_trees
            .iter()
            .flat_map(|&n_trees| {
                self.config.forest_max_depths.iter().map(move |&depth| EstimatorSpec::RandomForest {
                    n_trees,
                    max_depth: (depth > 0).then_some(depth),
                })
            })
            .collect();

        let boosting = vec![EstimatorSpec::GradientBoosting(self.config.boosting.clone())];

        vec![
            ("ridge", ridge),
            ("random_forest", forest),
            ("gradient_boosting", boosting),
        ]
    }

    pub fn train(&self, listings: &[CleanedListing]) -> Result<TrainingOutcome> {
        let min_rows = self.config.min_rows.max(self.config.cv_folds + 1);
        if listings.len() < min_rows {
            return Err(anyhow!(
                "Need at least {} cleaned rows to train, found {}",
                min_rows,
                listings.len()
            ));
        }

        let rows = listings
            .iter()
            .enumerate()
            .map(|(i, listing)| {
                FeatureRow::try_from(listing).with_context(|| format!("Cleaned row {} is not a valid feature row", i + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        let targets: Vec<f64> = listings.iter().map(|l| l.price as f64).collect();

        let (train_idx, test_idx) = train_test_split(rows.len(), self.config.test_fraction, self.config.seed);
        let pick_rows = |idx: &[usize]| idx.iter().map(|&i| rows[i].clone()).collect::<Vec<_>>();
        let pick_targets = |idx: &[usize]| idx.iter().map(|&i| targets[i]).collect::<Vec<_>>();

        let (x_train, y_train) = (pick_rows(&train_idx), pick_targets(&train_idx));
        let (x_test, y_test) = (pick_rows(&test_idx), pick_targets(&test_idx));
        info!("🔀 Split {} rows: {} train / {} test", rows.len(), x_train.len(), x_test.len());

        let mut candidates = Vec::new();
        let mut pipelines = Vec::new();

        for (name, grid) in self.candidate_grids() {
            if grid.is_empty() {
                warn!("Skipping {}: empty parameter grid", name);
                continue;
            }
            info!("🔍 Grid search for {} over {} settings", name, grid.len());

            let search = grid_search(&x_train, &y_train, &grid, self.config.cv_folds, self.config.seed)
                .with_context(|| format!("Grid search failed for {}", name))?;
            let predicted = search
                .pipeline
                .predict_rows(&x_test)
                .with_context(|| format!("Held-out prediction failed for {}", name))?;
            let metrics = evaluate(&y_test, &predicted);

            info!(
                "📈 {} best {} | cv r2 {:.4} | MAE {:.1} RMSE {:.1} R2 {:.4}",
                name, search.best_spec, search.best_score, metrics.mae, metrics.rmse, metrics.r2
            );

            candidates.push(CandidateReport {
                name: name.to_string(),
                params: search.best_spec,
                cv_r2: search.best_score,
                metrics,
            });
            pipelines.push(search.pipeline);
        }

        let scores: Vec<RegressionMetrics> = candidates.iter().map(|c| c.metrics).collect();
        let best = select_best(&scores).ok_or_else(|| anyhow!("No candidate produced a usable RMSE"))?;
        let pipeline = pipelines.swap_remove(best);

        info!(
            "🏆 Selected {} (RMSE {:.1})",
            candidates[best].name, candidates[best].metrics.rmse
        );

        Ok(TrainingOutcome {
            candidates,
            best,
            pipeline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoostingConfig;
    use crate::models::ReviewsBucket;

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(11, 0.2, 42);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_seeded() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(train_test_split(50, 0.2, 42).1, train_test_split(50, 0.2, 7).1);
    }

    #[test]
    fn test_default_grids() {
        let trainer = PriceModelTrainer::new(TrainerConfig::default());
        let grids = trainer.candidate_grids();

        let names: Vec<&str> = grids.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["ridge", "random_forest", "gradient_boosting"]);
        assert_eq!(grids[0].1.len(), 3);
        assert_eq!(grids[1].1.len(), 6);
        assert_eq!(
            grids[1].1[0],
            EstimatorSpec::RandomForest { n_trees: 200, max_depth: None }
        );
        assert_eq!(grids[2].1.len(), 1);
    }

    fn listing(i: usize) -> CleanedListing {
        let rating = 1.0 + ((i * 7) % 40) as f64 * 0.1;
        let reviews = (i * 53 % 1500) as i64;
        let has_pro = i64::from(i % 3 == 0);
        CleanedListing {
            product_name: format!("Laptop {}", i),
            price: (30000.0 + 9000.0 * rating + 12000.0 * has_pro as f64) as i64,
            rating,
            reviews_count: reviews,
            source: "Flipkart".to_string(),
            query: "laptop".to_string(),
            page: 1 + (i % 4) as u32,
            name_len: 9,
            has_pro,
            has_ultra: 0,
            reviews_bucket: ReviewsBucket::from_count(reviews),
        }
    }

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            forest_trees: vec![10],
            forest_max_depths: vec![0, 4],
            boosting: BoostingConfig {
                n_rounds: 20,
                ..BoostingConfig::default()
            },
            ..TrainerConfig::default()
        }
    }

    #[test]
    fn test_train_selects_lowest_rmse_candidate() {
        let listings: Vec<CleanedListing> = (0..60).map(listing).collect();
        let outcome = PriceModelTrainer::new(small_config()).train(&listings).unwrap();

        assert_eq!(outcome.candidates.len(), 3);
        let best_rmse = outcome.best_report().metrics.rmse;
        assert!(outcome.candidates.iter().all(|c| c.metrics.rmse >= best_rmse));
        // the data is exactly linear
        assert_eq!(outcome.best_report().name, "ridge");
    }

    #[test]
    fn test_train_rejects_tiny_dataset() {
        let listings: Vec<CleanedListing> = (0..5).map(listing).collect();
        let err = PriceModelTrainer::new(small_config()).train(&listings).err().unwrap();
        assert!(err.to_string().contains("at least 10"));
    }
}
