use anyhow::Result;
use regex::Regex;

use crate::models::ReviewsBucket;

/// Text features derived from a product name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameFeatures {
    pub name_len: i64,
    pub has_pro: bool,
    pub has_ultra: bool,
}

/// Derives name features and review buckets for cleaned rows
pub struct FeatureExtractor {
    pro_pattern: Regex,
    ultra_pattern: Regex,
}

impl FeatureExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pro_pattern: Regex::new(r"(?i)\bpro\b")?,
            ultra_pattern: Regex::new(r"(?i)\bultra\b")?,
        })
    }

    pub fn name_features(&self, name: &str) -> NameFeatures {
        NameFeatures {
            name_len: name.chars().count() as i64,
            has_pro: self.pro_pattern.is_match(name),
            has_ultra: self.ultra_pattern.is_match(name),
        }
    }

    pub fn reviews_bucket(&self, reviews_count: i64) -> ReviewsBucket {
        ReviewsBucket::from_count(reviews_count)
    }
}
