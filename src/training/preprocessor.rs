use serde::{Deserialize, Serialize};

use crate::models::{FeatureRow, ReviewsBucket};

/// Numeric columns passed through unchanged, in output order
pub const NUMERIC_FEATURES: [&str; 6] = [
    "rating",
    "reviews_count",
    "page",
    "name_len",
    "has_pro",
    "has_ultra",
];

/// One-hot encodes `reviews_bucket` over the categories seen at fit time and
/// appends the numeric columns. Unseen categories encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    categories: Vec<ReviewsBucket>,
}

impl Preprocessor {
    pub fn fit(rows: &[FeatureRow]) -> Self {
        let mut categories: Vec<ReviewsBucket> = rows.iter().map(|r| r.reviews_bucket()).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn categories(&self) -> &[ReviewsBucket] {
        &self.categories
    }

    pub fn n_features(&self) -> usize {
        self.categories.len() + NUMERIC_FEATURES.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|c| format!("reviews_bucket_{}", c))
            .chain(NUMERIC_FEATURES.iter().map(|n| n.to_string()))
            .collect()
    }

    pub fn transform_row(&self, row: &FeatureRow) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.n_features());
        features.extend(
            self.categories
                .iter()
                .map(|c| if *c == row.reviews_bucket() { 1.0 } else { 0.0 }),
        );
        features.extend([
            row.rating(),
            row.reviews_count() as f64,
            row.page() as f64,
            row.name_len() as f64,
            if row.has_pro() { 1.0 } else { 0.0 },
            if row.has_ultra() { 1.0 } else { 0.0 },
        ]);
        features
    }

    pub fn transform(&self, rows: &[FeatureRow]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(bucket: ReviewsBucket, rating: f64, has_pro: bool) -> FeatureRow {
        FeatureRow::new("x", rating, 120, 30, has_pro, false, bucket, 2).unwrap()
    }

    #[test]
    fn test_fit_sorts_observed_categories() {
        let pre = Preprocessor::fit(&[
            row(ReviewsBucket::High, 4.0, false),
            row(ReviewsBucket::VeryLow, 4.0, false),
            row(ReviewsBucket::High, 4.0, false),
        ]);
        assert_eq!(pre.categories(), &[ReviewsBucket::VeryLow, ReviewsBucket::High]);
        assert_eq!(
            pre.feature_names(),
            vec![
                "reviews_bucket_very_low",
                "reviews_bucket_high",
                "rating",
                "reviews_count",
                "page",
                "name_len",
                "has_pro",
                "has_ultra"
            ]
        );
    }

    #[test]
    fn test_transform_layout() {
        let pre = Preprocessor::fit(&[row(ReviewsBucket::Low, 4.0, false), row(ReviewsBucket::High, 4.0, false)]);
        assert_eq!(
            pre.transform_row(&row(ReviewsBucket::High, 4.5, true)),
            vec![0.0, 1.0, 4.5, 120.0, 2.0, 30.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_unknown_category_is_ignored() {
        let pre = Preprocessor::fit(&[row(ReviewsBucket::Low, 4.0, false)]);
        let encoded = pre.transform_row(&row(ReviewsBucket::Medium, 3.0, false));
        assert_eq!(encoded[0], 0.0);
        assert_eq!(encoded.len(), pre.n_features());
    }
}
