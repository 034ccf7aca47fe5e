//! Price outlier trim and listing validity filter

use super::{columns, float_column};
use crate::error::{PricerError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Quantile with linear interpolation between closest ranks, nulls ignored.
///
/// `Ok(None)` when there is no non-null value.
pub fn linear_quantile(values: &Float64Chunked, q: f64) -> Result<Option<f64>> {
    Ok(values.quantile(q, QuantileMethod::Linear)?)
}

/// Drops price outliers and listings with implausible minimum stays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingFilter {
    price_quantile: f64,
    max_minimum_nights: f64,
    price_cutoff: Option<f64>,
}

impl ListingFilter {
    pub fn new(price_quantile: f64, max_minimum_nights: f64) -> Self {
        Self {
            price_quantile,
            max_minimum_nights,
            price_cutoff: None,
        }
    }

    /// Compute the price cutoff from the coerced, unfiltered dataset
    pub fn fit(&mut self, df: &DataFrame) -> Result<f64> {
        let prices = float_column(df, columns::PRICE)?;
        let cutoff = linear_quantile(&prices, self.price_quantile)?.ok_or_else(|| {
            PricerError::config(format!(
                "column '{}' has no values to compute the {} quantile from",
                columns::PRICE,
                self.price_quantile
            ))
        })?;

        self.price_cutoff = Some(cutoff);
        Ok(cutoff)
    }

    /// Keep rows with `price < cutoff` and `minimum_nights <= max`.
    ///
    /// Rows missing either value are dropped.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let cutoff = self.price_cutoff.ok_or_else(|| {
            PricerError::DataError("listing filter used before fit".to_string())
        })?;

        let prices = float_column(df, columns::PRICE)?;
        let nights = float_column(df, columns::MINIMUM_NIGHTS)?;

        // null comparisons stay null and filter drops them
        let mask = prices.lt(cutoff) & nights.lt_eq(self.max_minimum_nights);

        Ok(df.filter(&mask)?)
    }

    pub fn price_cutoff(&self) -> Option<f64> {
        self.price_cutoff
    }
}
