//! Listing cleaning module
//!
//! Turns a raw per-city listings table into the cleaned analytical dataset:
//! - Declared type coercion (percentages, flags, dates, currency, numbers)
//! - Price percentile trim and `minimum_nights` validity filter
//! - Bathroom descriptor decomposition
//! - Per-neighbourhood bedroom imputation
//! - Amenity vocabulary extraction and amenity counting

mod config;
mod coercion;
mod imputer;
mod pipeline;
pub mod amenities;
pub mod outlier;

pub use amenities::AmenityVocabulary;
pub use coercion::{coerce_cell, parse_bathrooms, BathroomParts, CellValue, ColumnCoercionStats};
pub use config::{CleaningConfig, ColumnCoercion, CoercionType};
pub use imputer::{GroupMedianImputer, ImputationStats};
pub use outlier::{linear_quantile, ListingFilter};
pub use pipeline::{CleanedDataset, Cleaner, CleaningReport};

use crate::error::{PricerError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Cell texts that mean "no value" in listing exports
pub const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Whether a raw cell holds one of the [`MISSING_TOKENS`]
pub fn is_missing_token(text: &str) -> bool {
    MISSING_TOKENS.contains(&text.trim())
}

/// Column names the cleaner reads or derives
pub mod columns {
    pub const PRICE: &str = "price";
    pub const MINIMUM_NIGHTS: &str = "minimum_nights";
    pub const BATHROOMS_TEXT: &str = "bathrooms_text";
    pub const BATHROOMS: &str = "bathrooms";
    pub const BATHROOMS_IS_SHARED: &str = "bathrooms_is_shared";
    pub const BEDROOMS: &str = "bedrooms";
    pub const NEIGHBOURHOOD: &str = "neighbourhood_cleansed";
    pub const AMENITIES: &str = "amenities";
    pub const NUM_AMENITIES: &str = "num_amenities";
    pub const HOST_VERIFICATIONS: &str = "host_verifications";
}

/// Outcome of coercing a single cell.
///
/// `Defaulted` carries the reason a present value was replaced with null so
/// degraded cells can be counted instead of vanishing silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellOutcome<T> {
    Parsed(T),
    Missing,
    Defaulted { reason: String },
}

impl<T> CellOutcome<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            CellOutcome::Parsed(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, CellOutcome::Defaulted { .. })
    }
}

fn column_series(df: &DataFrame, name: &str) -> Result<Series> {
    df.column(name)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| PricerError::ColumnNotFound(name.to_string()))
}

/// Read a column as optional text, whatever its physical type
pub(crate) fn text_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let series = column_series(df, name)?.cast(&DataType::String)?;
    let ca = series.str()?;
    Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
}

/// Read a column as a float chunked array
pub(crate) fn float_column(df: &DataFrame, name: &str) -> Result<Float64Chunked> {
    let series = column_series(df, name)?.cast(&DataType::Float64)?;
    Ok(series.f64()?.clone())
}

/// Read a column as optional floats
pub(crate) fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(float_column(df, name)?.into_iter().collect())
}
