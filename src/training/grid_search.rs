use anyhow::{Result, anyhow};
use tracing::debug;

use super::estimators::{EstimatorSpec, PricePipeline};
use super::metrics::evaluate;
use crate::models::FeatureRow;

/// Outcome of a cross-validated search over one estimator family
pub struct GridSearchResult {
    pub best_spec: EstimatorSpec,
    pub best_score: f64,
    pub pipeline: PricePipeline,
}

/// Contiguous, unshuffled folds; the first `n % k` folds take one extra row.
/// Returns `(train, validation)` index pairs.
pub fn kfold_indices(n: usize, k: usize) -> Vec<(Vec<usize>, Vec<usize>)> {
    let k = k.clamp(1, n.max(1));
    let base = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let validation: Vec<usize> = (start..start + size).collect();
        let train: Vec<usize> = (0..start).chain(start + size..n).collect();
        folds.push((train, validation));
        start += size;
    }
    folds
}

fn pick<T: Clone>(values: &[T], indices: &[usize]) -> Vec<T> {
    indices.iter().map(|&i| values[i].clone()).collect()
}

/// Mean validation R² of `spec` across the folds
fn cross_val_score(
    rows: &[FeatureRow],
    targets: &[f64],
    spec: &EstimatorSpec,
    folds: &[(Vec<usize>, Vec<usize>)],
    seed: u64,
) -> Result<f64> {
    let mut total = 0.0;
    for (train, validation) in folds {
        let pipeline = PricePipeline::fit(&pick(rows, train), &pick(targets, train), spec, seed)?;
        let predicted = pipeline.predict_rows(&pick(rows, validation))?;
        total += evaluate(&pick(targets, validation), &predicted).r2;
    }
    Ok(total / folds.len() as f64)
}

/// Score every candidate with k-fold R², keep the highest mean (earliest on
/// ties) and refit it on all rows.
pub fn grid_search(
    rows: &[FeatureRow],
    targets: &[f64],
    candidates: &[EstimatorSpec],
    folds: usize,
    seed: u64,
) -> Result<GridSearchResult> {
    if rows.len() != targets.len() {
        return Err(anyhow!("{} rows but {} targets", rows.len(), targets.len()));
    }
    if rows.len() < folds.max(2) {
        return Err(anyhow!(
            "Need at least {} rows for {}-fold search, got {}",
            folds.max(2),
            folds,
            rows.len()
        ));
    }

    let splits = kfold_indices(rows.len(), folds);
    let mut best: Option<(&EstimatorSpec, f64)> = None;

    for spec in candidates {
        let score = cross_val_score(rows, targets, spec, &splits, seed)?;
        debug!("  {} -> mean cv r2 {:.4}", spec, score);

        let better = match best {
            None => true,
            Some((_, best_score)) => score > best_score || (best_score.is_nan() && !score.is_nan()),
        };
        if better {
            best = Some((spec, score));
        }
    }

    let (spec, score) = best.ok_or_else(|| anyhow!("Grid search needs at least one candidate"))?;
    let pipeline = PricePipeline::fit(rows, targets, spec, seed)?;

    Ok(GridSearchResult {
        best_spec: spec.clone(),
        best_score: score,
        pipeline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReviewsBucket;

    #[test]
    fn test_kfold_sizes_match_sklearn() {
        let folds = kfold_indices(10, 3);
        let sizes: Vec<usize> = folds.iter().map(|(_, v)| v.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
        assert_eq!(folds[1].1, vec![4, 5, 6]);
        assert_eq!(folds[1].0, vec![0, 1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn test_kfold_covers_every_row_once() {
        let folds = kfold_indices(17, 3);
        let mut seen: Vec<usize> = folds.iter().flat_map(|(_, v)| v.clone()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..17).collect::<Vec<_>>());
    }

    fn linear_rows(n: usize) -> (Vec<FeatureRow>, Vec<f64>) {
        (0..n)
            .map(|i| {
                let rating = 2.0 + (i % 30) as f64 * 0.1;
                let row = FeatureRow::new("row", rating, 10, 25, false, false, ReviewsBucket::VeryLow, 1).unwrap();
                (row, 10000.0 * rating)
            })
            .unzip()
    }

    #[test]
    fn test_prefers_weaker_regularization_on_clean_linear_data() {
        let (rows, targets) = linear_rows(45);
        let candidates = [
            EstimatorSpec::Ridge { alpha: 1000.0 },
            EstimatorSpec::Ridge { alpha: 0.01 },
        ];

        let result = grid_search(&rows, &targets, &candidates, 3, 42).unwrap();
        assert_eq!(result.best_spec, EstimatorSpec::Ridge { alpha: 0.01 });
        assert!(result.best_score > 0.9);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let (rows, targets) = linear_rows(30);
        let candidates = [
            EstimatorSpec::Ridge { alpha: 0.5 },
            EstimatorSpec::Ridge { alpha: 0.5 },
        ];
        let result = grid_search(&rows, &targets, &candidates, 3, 42).unwrap();
        assert_eq!(result.best_spec, candidates[0]);
    }

    #[test]
    fn test_rejects_too_few_rows() {
        let (rows, targets) = linear_rows(2);
        assert!(grid_search(&rows, &targets, &[EstimatorSpec::Ridge { alpha: 1.0 }], 3, 1).is_err());
        assert!(grid_search(&rows, &targets, &[], 2, 1).is_err());
    }
}
