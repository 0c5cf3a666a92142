use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One product card as scraped from a search result page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    pub product_name: String,
    pub price: Option<i64>,
    pub rating: Option<f64>,
    pub reviews_count: Option<i64>,
    pub source: String,
    pub query: String,
    pub page: u32,
}

/// A listing that survived normalization, with derived features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedListing {
    pub product_name: String,
    pub price: i64,
    pub rating: f64,
    pub reviews_count: i64,
    pub source: String,
    pub query: String,
    pub page: u32,
    pub name_len: i64,
    pub has_pro: i64,
    pub has_ultra: i64,
    pub reviews_bucket: ReviewsBucket,
}

/// Ordinal discretization of the review count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewsBucket {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ReviewsBucket {
    pub const ALL: [ReviewsBucket; 4] = [
        ReviewsBucket::VeryLow,
        ReviewsBucket::Low,
        ReviewsBucket::Medium,
        ReviewsBucket::High,
    ];

    /// Upper edges are inclusive: 50 is very_low, 200 is low, 1000 is medium.
    pub fn from_count(reviews_count: i64) -> Self {
        match reviews_count {
            i64::MIN..=50 => ReviewsBucket::VeryLow,
            51..=200 => ReviewsBucket::Low,
            201..=1000 => ReviewsBucket::Medium,
            _ => ReviewsBucket::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewsBucket::VeryLow => "very_low",
            ReviewsBucket::Low => "low",
            ReviewsBucket::Medium => "medium",
            ReviewsBucket::High => "high",
        }
    }
}

impl fmt::Display for ReviewsBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewsBucket {
    type Err = FeatureRowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "very_low" => Ok(ReviewsBucket::VeryLow),
            "low" => Ok(ReviewsBucket::Low),
            "medium" => Ok(ReviewsBucket::Medium),
            "high" => Ok(ReviewsBucket::High),
            other => Err(FeatureRowError::UnknownBucket(other.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureRowError {
    #[error("rating must be a number between 0 and 5, got {0}")]
    Rating(f64),
    #[error("reviews count must be non-negative, got {0}")]
    ReviewsCount(i64),
    #[error("name length must be at least 1, got {0}")]
    NameLen(i64),
    #[error("page must be at least 1, got {0}")]
    Page(u32),
    #[error("unknown reviews bucket '{0}'")]
    UnknownBucket(String),
}

/// Fixed input schema accepted by a trained price pipeline.
///
/// Fields are private so every row goes through [`FeatureRow::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    product_name: String,
    rating: f64,
    reviews_count: i64,
    name_len: i64,
    has_pro: bool,
    has_ultra: bool,
    reviews_bucket: ReviewsBucket,
    page: u32,
}

impl FeatureRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        product_name: impl Into<String>,
        rating: f64,
        reviews_count: i64,
        name_len: i64,
        has_pro: bool,
        has_ultra: bool,
        reviews_bucket: ReviewsBucket,
        page: u32,
    ) -> Result<Self, FeatureRowError> {
        if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
            return Err(FeatureRowError::Rating(rating));
        }
        if reviews_count < 0 {
            return Err(FeatureRowError::ReviewsCount(reviews_count));
        }
        if name_len < 1 {
            return Err(FeatureRowError::NameLen(name_len));
        }
        if page < 1 {
            return Err(FeatureRowError::Page(page));
        }

        Ok(Self {
            product_name: product_name.into(),
            rating,
            reviews_count,
            name_len,
            has_pro,
            has_ultra,
            reviews_bucket,
            page,
        })
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn reviews_count(&self) -> i64 {
        self.reviews_count
    }

    pub fn name_len(&self) -> i64 {
        self.name_len
    }

    pub fn has_pro(&self) -> bool {
        self.has_pro
    }

    pub fn has_ultra(&self) -> bool {
        self.has_ultra
    }

    pub fn reviews_bucket(&self) -> ReviewsBucket {
        self.reviews_bucket
    }

    pub fn page(&self) -> u32 {
        self.page
    }
}

impl TryFrom<&CleanedListing> for FeatureRow {
    type Error = FeatureRowError;

    fn try_from(listing: &CleanedListing) -> Result<Self, Self::Error> {
        FeatureRow::new(
            listing.product_name.clone(),
            listing.rating,
            listing.reviews_count,
            listing.name_len,
            listing.has_pro != 0,
            listing.has_ultra != 0,
            listing.reviews_bucket,
            listing.page,
        )
    }
}
