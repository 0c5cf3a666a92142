//! Order statistics used by the normalizer.

/// Median of the values, `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    quantile_sorted(&sorted, 0.5)
}

/// Quantile with linear interpolation between closest ranks, on sorted input
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Tukey fences: `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`
pub fn iqr_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - 1.5 * iqr, q3 + 1.5 * iqr))
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_linear_quantiles() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile_sorted(&sorted, 0.75), Some(3.25));
        assert_eq!(quantile_sorted(&[7.0], 0.25), Some(7.0));
    }

    #[test]
    fn test_iqr_bounds() {
        let (lower, upper) = iqr_bounds(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();
        // Q1 = 20, Q3 = 40, IQR = 20
        assert_eq!(lower, -10.0);
        assert_eq!(upper, 70.0);
        assert!(iqr_bounds(&[]).is_none());
    }
}
