use serde::{Deserialize, Serialize};

/// Held-out regression error metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mae: f64,
    pub rmse: f64,
    pub r2: f64,
}

/// MAE, RMSE and coefficient of determination over paired slices.
///
/// With zero variance in `y_true`, R² is 1.0 for a perfect fit and 0.0
/// otherwise.
pub fn evaluate(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
    assert_eq!(y_true.len(), y_pred.len(), "prediction length mismatch");

    let n = y_true.len() as f64;
    if y_true.is_empty() {
        return RegressionMetrics {
            mae: f64::NAN,
            rmse: f64::NAN,
            r2: f64::NAN,
        };
    }

    let mean = y_true.iter().sum::<f64>() / n;
    let (abs_err, sq_err, ss_tot) = y_true.iter().zip(y_pred).fold(
        (0.0, 0.0, 0.0),
        |(abs_err, sq_err, ss_tot), (t, p)| {
            let err = t - p;
            (abs_err + err.abs(), sq_err + err * err, ss_tot + (t - mean).powi(2))
        },
    );

    let r2 = if ss_tot == 0.0 {
        if sq_err == 0.0 { 1.0 } else { 0.0 }
    } else {
        1.0 - sq_err / ss_tot
    };

    RegressionMetrics {
        mae: abs_err / n,
        rmse: (sq_err / n).sqrt(),
        r2,
    }
}

/// Index of the lowest RMSE; ties go to the earliest candidate
pub fn select_best(metrics: &[RegressionMetrics]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, m) in metrics.iter().enumerate() {
        if m.rmse.is_nan() {
            continue;
        }
        match best {
            Some(b) if m.rmse >= metrics[b].rmse => {}
            _ => best = Some(idx),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_metrics() {
        let m = evaluate(&[10.0, 20.0, 30.0], &[12.0, 18.0, 33.0]);

        assert!((m.mae - 7.0 / 3.0).abs() < 1e-8);
        assert!((m.rmse - (17.0_f64 / 3.0).sqrt()).abs() < 1e-8);
        // ss_res = 17, ss_tot = 200
        assert!((m.r2 - (1.0 - 17.0 / 200.0)).abs() < 1e-8);
    }

    #[test]
    fn test_constant_target_r2() {
        assert_eq!(evaluate(&[5.0, 5.0], &[5.0, 5.0]).r2, 1.0);
        assert_eq!(evaluate(&[5.0, 5.0], &[4.0, 6.0]).r2, 0.0);
    }

    fn with_rmse(rmse: f64) -> RegressionMetrics {
        RegressionMetrics { mae: 0.0, rmse, r2: 0.0 }
    }

    #[test]
    fn test_select_lowest_rmse() {
        let metrics = [with_rmse(900.0), with_rmse(450.0), with_rmse(600.0)];
        assert_eq!(select_best(&metrics), Some(1));
    }

    #[test]
    fn test_select_ties_go_to_first() {
        let metrics = [with_rmse(700.0), with_rmse(500.0), with_rmse(500.0)];
        assert_eq!(select_best(&metrics), Some(1));
    }

    #[test]
    fn test_select_skips_nan() {
        let metrics = [with_rmse(f64::NAN), with_rmse(10.0)];
        assert_eq!(select_best(&metrics), Some(1));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn test_selection_from_synthetic_predictions() {
        let y_true = [100.0, 200.0, 300.0, 400.0];
        let candidates = [
            [110.0, 190.0, 310.0, 390.0],
            [101.0, 199.0, 301.0, 399.0],
            [150.0, 250.0, 250.0, 450.0],
        ];
        let metrics: Vec<_> = candidates.iter().map(|p| evaluate(&y_true, p)).collect();
        assert_eq!(select_best(&metrics), Some(1));
    }
}
