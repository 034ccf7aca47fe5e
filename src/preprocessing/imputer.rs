//! Grouped median imputation

use super::{float_column, float_values, text_values};
use crate::error::{PricerError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counts reported by a grouped imputation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImputationStats {
    /// Cells filled with their own group's median
    pub imputed: usize,
    /// Cells whose group had no observed value and took the dataset median
    pub fallback: usize,
    /// Groups without a single observed value
    pub empty_groups: Vec<String>,
}

/// Fills nulls in a numeric column with the median of the row's group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMedianImputer {
    target: String,
    group_by: String,
    medians: BTreeMap<Option<String>, f64>,
    overall_median: Option<f64>,
    is_fitted: bool,
}

impl GroupMedianImputer {
    pub fn new(target: impl Into<String>, group_by: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            group_by: group_by.into(),
            medians: BTreeMap::new(),
            overall_median: None,
            is_fitted: false,
        }
    }

    /// Compute per-group medians over non-null target values
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let target = float_column(df, &self.target)?;
        df.column(&self.group_by)
            .map_err(|_| PricerError::ColumnNotFound(self.group_by.clone()))?;

        let median_name = format!("{}_median", self.target);
        let per_group = df
            .clone()
            .lazy()
            .group_by([col(self.group_by.as_str())])
            .agg([col(self.target.as_str())
                .cast(DataType::Float64)
                .median()
                .alias(median_name.as_str())])
            .collect()?;

        let groups = text_values(&per_group, &self.group_by)?;
        let medians = float_values(&per_group, &median_name)?;
        self.medians = groups
            .into_iter()
            .zip(medians)
            .filter_map(|(group, median)| median.map(|m| (group, m)))
            .collect();
        self.overall_median = target.median();
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace nulls in the target column
    pub fn transform(&self, df: &DataFrame) -> Result<(DataFrame, ImputationStats)> {
        if !self.is_fitted {
            return Err(PricerError::DataError(format!(
                "imputer for '{}' used before fit",
                self.target
            )));
        }

        let targets = float_values(df, &self.target)?;
        let groups = text_values(df, &self.group_by)?;
        let mut stats = ImputationStats::default();

        let mut filled = Vec::with_capacity(targets.len());
        for (value, group) in targets.into_iter().zip(groups) {
            if let Some(v) = value {
                filled.push(v);
                continue;
            }
            if let Some(m) = self.medians.get(&group) {
                stats.imputed += 1;
                filled.push(*m);
                continue;
            }
            let fallback = self.overall_median.ok_or_else(|| {
                PricerError::config(format!(
                    "column '{}' has no observed values to impute from",
                    self.target
                ))
            })?;
            let label = group.unwrap_or_else(|| "<missing>".to_string());
            if !stats.empty_groups.contains(&label) {
                stats.empty_groups.push(label);
            }
            stats.fallback += 1;
            filled.push(fallback);
        }

        let mut result = df.clone();
        result.with_column(Series::new(self.target.as_str().into(), filled))?;
        Ok((result, stats))
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<(DataFrame, ImputationStats)> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Median learned for a group, if any value was observed there
    pub fn group_median(&self, group: Option<&str>) -> Option<f64> {
        self.medians.get(&group.map(str::to_string)).copied()
    }
}
