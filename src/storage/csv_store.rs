use anyhow::{Context, Result, anyhow};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

use crate::error::ResourceError;
use crate::models::{CleanedListing, RawListing, ReviewsBucket};

pub const RAW_COLUMNS: [&str; 7] = [
    "product_name",
    "price",
    "rating",
    "reviews_count",
    "source",
    "query",
    "page",
];

pub const FEATURE_COLUMNS: [&str; 4] = ["name_len", "has_pro", "has_ultra", "reviews_bucket"];

/// Build the raw table in its fixed column order
pub fn listings_to_dataframe(listings: &[RawListing]) -> Result<DataFrame> {
    let columns = vec![
        Column::new(
            "product_name".into(),
            listings.iter().map(|l| l.product_name.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("price".into(), listings.iter().map(|l| l.price).collect::<Vec<_>>()),
        Column::new("rating".into(), listings.iter().map(|l| l.rating).collect::<Vec<_>>()),
        Column::new(
            "reviews_count".into(),
            listings.iter().map(|l| l.reviews_count).collect::<Vec<_>>(),
        ),
        Column::new(
            "source".into(),
            listings.iter().map(|l| l.source.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "query".into(),
            listings.iter().map(|l| l.query.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "page".into(),
            listings.iter().map(|l| l.page as i64).collect::<Vec<_>>(),
        ),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Write a table with a header row, creating parent directories, replacing any
/// existing file
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV {}", path.display()))?;

    info!("Saved {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Read a delimited file, separating "absent" from "unreadable"
pub fn read_csv(path: &Path, kind: &'static str) -> Result<DataFrame, ResourceError> {
    if !path.exists() {
        return Err(ResourceError::missing(kind, path));
    }

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| ResourceError::malformed(kind, path, e))
}

/// Ensure the table carries every named column
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|column| !present.iter().any(|p| p == column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("Missing columns: {}", missing.join(", ")))
    }
}

pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}

pub fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(name)?.cast(&DataType::Int64)?;
    Ok(column.i64()?.into_iter().collect())
}

pub fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Typed rows from a cleaned table
pub fn cleaned_from_dataframe(df: &DataFrame) -> Result<Vec<CleanedListing>> {
    let mut expected = RAW_COLUMNS.to_vec();
    expected.extend(FEATURE_COLUMNS);
    require_columns(df, &expected)?;

    let names = str_values(df, "product_name")?;
    let prices = i64_values(df, "price")?;
    let ratings = f64_values(df, "rating")?;
    let reviews = i64_values(df, "reviews_count")?;
    let sources = str_values(df, "source")?;
    let queries = str_values(df, "query")?;
    let pages = i64_values(df, "page")?;
    let name_lens = i64_values(df, "name_len")?;
    let has_pro = i64_values(df, "has_pro")?;
    let has_ultra = i64_values(df, "has_ultra")?;
    let buckets = str_values(df, "reviews_bucket")?;

    (0..df.height())
        .map(|i| {
            let row = i + 1;
            let price = prices[i].ok_or_else(|| anyhow!("Row {} has no price", row))?;
            let bucket = buckets[i]
                .as_deref()
                .ok_or_else(|| anyhow!("Row {} has no reviews bucket", row))?
                .parse::<ReviewsBucket>()
                .with_context(|| format!("Row {} has an invalid reviews bucket", row))?;

            Ok(CleanedListing {
                product_name: names[i].clone().unwrap_or_default(),
                price,
                rating: ratings[i].ok_or_else(|| anyhow!("Row {} has no rating", row))?,
                reviews_count: reviews[i].unwrap_or(0),
                source: sources[i].clone().unwrap_or_default(),
                query: queries[i].clone().unwrap_or_default(),
                page: pages[i].unwrap_or(1).max(1) as u32,
                name_len: name_lens[i].unwrap_or(0),
                has_pro: has_pro[i].unwrap_or(0),
                has_ultra: has_ultra[i].unwrap_or(0),
                reviews_bucket: bucket,
            })
        })
        .collect()
}

/// Load the cleaned table as typed rows
pub fn read_cleaned_listings(path: &Path) -> Result<Vec<CleanedListing>, ResourceError> {
    let df = read_csv(path, "data")?;
    cleaned_from_dataframe(&df).map_err(|e| ResourceError::malformed("data", path, format!("{:#}", e)))
}
