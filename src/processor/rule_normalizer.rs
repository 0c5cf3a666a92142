use anyhow::Result;
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

use super::feature_engineering::FeatureExtractor;
use super::stats;
use crate::storage::csv_store::{RAW_COLUMNS, f64_values, i64_values, require_columns, str_values};

/// Row counts after each cleaning step
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    pub rows_in: usize,
    pub after_dedupe: usize,
    pub after_price_drop: usize,
    pub after_outliers: usize,
    pub price_bounds: Option<(f64, f64)>,
}

/// Turns the raw listing table into the cleaned, feature-enriched table.
///
/// Steps run in a fixed order: dedupe, impute, price coercion, price outlier
/// filter, then feature derivation on the surviving rows.
pub struct RuleNormalizer {
    features: FeatureExtractor,
}

impl RuleNormalizer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            features: FeatureExtractor::new()?,
        })
    }

    pub fn normalize_dataframe(&self, df: &DataFrame) -> Result<(DataFrame, NormalizeReport)> {
        require_columns(df, &RAW_COLUMNS)?;

        let mut report = NormalizeReport {
            rows_in: df.height(),
            ..Default::default()
        };

        let df = self.drop_duplicates(df)?;
        report.after_dedupe = df.height();

        let df = self.fill_missing(df)?;

        let df = self.clean_prices(df)?;
        report.after_price_drop = df.height();

        let (df, bounds) = self.remove_price_outliers(df)?;
        report.after_outliers = df.height();
        report.price_bounds = bounds;

        let df = self.add_features(df)?;

        info!(
            "Normalized {} rows -> {} (dedupe {}, priced {}, bounds {:?})",
            report.rows_in, report.after_outliers, report.after_dedupe, report.after_price_drop, bounds
        );

        Ok((df, report))
    }

    /// Keep the first row of every (product_name, price) pair
    pub fn drop_duplicates(&self, df: &DataFrame) -> Result<DataFrame> {
        let names = str_values(df, "product_name")?;
        let prices = f64_values(df, "price")?;

        let mut seen = HashSet::new();
        let mask: Vec<bool> = names
            .into_iter()
            .zip(prices)
            .map(|(name, price)| seen.insert((name, price.map(f64::to_bits))))
            .collect();

        Ok(df.filter(&BooleanChunked::from_slice("dedupe".into(), &mask))?)
    }

    fn fill_missing(&self, mut df: DataFrame) -> Result<DataFrame> {
        let ratings = f64_values(&df, "rating")?;
        let present: Vec<f64> = ratings.iter().flatten().copied().collect();
        let fill = stats::median(&present).unwrap_or_else(|| {
            warn!("No ratings present, imputing 0.0");
            0.0
        });
        let ratings: Vec<f64> = ratings.into_iter().map(|r| r.unwrap_or(fill)).collect();

        let reviews: Vec<i64> = i64_values(&df, "reviews_count")?
            .into_iter()
            .map(|r| r.unwrap_or(0))
            .collect();

        df.with_column(Column::new("rating".into(), ratings))?;
        df.with_column(Column::new("reviews_count".into(), reviews))?;
        Ok(df)
    }

    fn clean_prices(&self, df: DataFrame) -> Result<DataFrame> {
        let prices = f64_values(&df, "price")?;
        let mask: Vec<bool> = prices.iter().map(|p| p.is_some_and(f64::is_finite)).collect();

        let mut df = df.filter(&BooleanChunked::from_slice("priced".into(), &mask))?;
        let prices: Vec<i64> = f64_values(&df, "price")?
            .into_iter()
            .map(|p| p.unwrap_or_default() as i64)
            .collect();
        df.with_column(Column::new("price".into(), prices))?;
        Ok(df)
    }

    fn remove_price_outliers(&self, df: DataFrame) -> Result<(DataFrame, Option<(f64, f64)>)> {
        let prices: Vec<f64> = i64_values(&df, "price")?
            .into_iter()
            .flatten()
            .map(|p| p as f64)
            .collect();

        let Some((lower, upper)) = stats::iqr_bounds(&prices) else {
            return Ok((df, None));
        };

        let mask: Vec<bool> = prices.iter().map(|&p| p >= lower && p <= upper).collect();
        let df = df.filter(&BooleanChunked::from_slice("inliers".into(), &mask))?;
        Ok((df, Some((lower, upper))))
    }

    fn add_features(&self, mut df: DataFrame) -> Result<DataFrame> {
        let names = str_values(&df, "product_name")?;
        let reviews = i64_values(&df, "reviews_count")?;

        let mut name_len = Vec::with_capacity(names.len());
        let mut has_pro = Vec::with_capacity(names.len());
        let mut has_ultra = Vec::with_capacity(names.len());
        for name in &names {
            let features = self.features.name_features(name.as_deref().unwrap_or(""));
            name_len.push(features.name_len);
            has_pro.push(features.has_pro as i64);
            has_ultra.push(features.has_ultra as i64);
        }

        let buckets: Vec<&str> = reviews
            .into_iter()
            .map(|r| self.features.reviews_bucket(r.unwrap_or(0)).as_str())
            .collect();

        df.with_column(Column::new("name_len".into(), name_len))?;
        df.with_column(Column::new("has_pro".into(), has_pro))?;
        df.with_column(Column::new("has_ultra".into(), has_ultra))?;
        df.with_column(Column::new("reviews_bucket".into(), buckets))?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawListing, ReviewsBucket};
    use crate::storage::csv_store::{cleaned_from_dataframe, listings_to_dataframe};

    fn raw(name: &str, price: Option<i64>, rating: Option<f64>, reviews: Option<i64>) -> RawListing {
        RawListing {
            product_name: name.to_string(),
            price,
            rating,
            reviews_count: reviews,
            source: "Flipkart".to_string(),
            query: "laptop".to_string(),
            page: 1,
        }
    }

    fn sample() -> DataFrame {
        listings_to_dataframe(&[
            raw("ASUS Vivobook 15", Some(40000), Some(4.2), Some(120)),
            raw("ASUS Vivobook 15", Some(40000), Some(4.2), Some(120)),
            raw("HP Pavilion Pro", Some(50000), None, Some(2500)),
            raw("Lenovo IdeaPad", Some(45000), Some(4.0), None),
            raw("Acer Aspire", None, Some(3.9), Some(10)),
            raw("Dell Inspiron Ultra", Some(55000), Some(4.4), Some(800)),
            raw("MSI Modern", Some(42000), Some(4.6), Some(51)),
            raw("Gold Plated Collector Edition", Some(900000), Some(5.0), Some(3)),
        ])
        .unwrap()
    }

    #[test]
    fn test_full_normalization() {
        let normalizer = RuleNormalizer::new().unwrap();
        let (df, report) = normalizer.normalize_dataframe(&sample()).unwrap();

        assert_eq!(report.rows_in, 8);
        assert_eq!(report.after_dedupe, 7);
        assert_eq!(report.after_price_drop, 6);
        assert_eq!(report.after_outliers, 5);

        let rows = cleaned_from_dataframe(&df).unwrap();
        assert!(rows.iter().all(|r| r.product_name != "Gold Plated Collector Edition"));

        // Median of 4.2, 4.0, 3.9, 4.4, 4.6, 5.0 after dedupe
        let hp = rows.iter().find(|r| r.product_name == "HP Pavilion Pro").unwrap();
        assert!((hp.rating - 4.3).abs() < 1e-9);
        assert_eq!(hp.has_pro, 1);
        assert_eq!(hp.reviews_bucket, ReviewsBucket::High);

        let lenovo = rows.iter().find(|r| r.product_name == "Lenovo IdeaPad").unwrap();
        assert_eq!(lenovo.reviews_count, 0);
        assert_eq!(lenovo.reviews_bucket, ReviewsBucket::VeryLow);

        let dell = rows.iter().find(|r| r.product_name == "Dell Inspiron Ultra").unwrap();
        assert_eq!(dell.has_ultra, 1);
        assert_eq!(dell.name_len, 19);
        assert_eq!(dell.reviews_bucket, ReviewsBucket::Medium);

        let msi = rows.iter().find(|r| r.product_name == "MSI Modern").unwrap();
        assert_eq!(msi.reviews_bucket, ReviewsBucket::Low);
    }

    #[test]
    fn test_prices_present_and_within_bounds() {
        let normalizer = RuleNormalizer::new().unwrap();
        let (df, report) = normalizer.normalize_dataframe(&sample()).unwrap();
        let (lower, upper) = report.price_bounds.unwrap();

        let prices = i64_values(&df, "price").unwrap();
        assert!(!prices.is_empty());
        for price in prices {
            let price = price.expect("price must be present") as f64;
            assert!(price >= lower && price <= upper);
        }
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let normalizer = RuleNormalizer::new().unwrap();
        let once = normalizer.drop_duplicates(&sample()).unwrap();
        let twice = normalizer.drop_duplicates(&once).unwrap();
        assert_eq!(once.height(), twice.height());
    }

    #[test]
    fn test_column_order() {
        let normalizer = RuleNormalizer::new().unwrap();
        let (df, _) = normalizer.normalize_dataframe(&sample()).unwrap();
        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "product_name",
                "price",
                "rating",
                "reviews_count",
                "source",
                "query",
                "page",
                "name_len",
                "has_pro",
                "has_ultra",
                "reviews_bucket"
            ]
        );
    }

    #[test]
    fn test_empty_input_keeps_header() {
        let normalizer = RuleNormalizer::new().unwrap();
        let (df, report) = normalizer
            .normalize_dataframe(&listings_to_dataframe(&[]).unwrap())
            .unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 11);
        assert_eq!(report.price_bounds, None);
    }
}
