//! Listing cleaning pipeline

use super::{
    amenities::{parse_amenities, strip_list_punctuation, AmenityVocabulary},
    coercion::{coerce_column, parse_bathrooms, ColumnCoercionStats},
    columns,
    config::CleaningConfig,
    imputer::{GroupMedianImputer, ImputationStats},
    outlier::ListingFilter,
    is_missing_token, text_values, CellOutcome,
};
use crate::encoding::HostVerification;
use crate::error::{PricerError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What happened to a dataset on its way through the cleaner
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_retained: usize,
    pub price_cutoff: f64,
    pub coercions: Vec<ColumnCoercionStats>,
    /// Bathroom descriptors with no numeric token
    pub bathrooms_unparsed: usize,
    pub bedrooms: ImputationStats,
    pub vocabulary: Vec<String>,
}

impl CleaningReport {
    /// Total cells nulled by best-effort coercion, across all columns
    pub fn degraded_cells(&self) -> usize {
        self.coercions.iter().map(|c| c.defaulted).sum::<usize>() + self.bathrooms_unparsed
    }
}

/// A cleaned city dataset together with its amenity vocabulary
#[derive(Debug, Clone)]
pub struct CleanedDataset {
    data: DataFrame,
    vocabulary: AmenityVocabulary,
    report: CleaningReport,
}

impl CleanedDataset {
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    pub fn vocabulary(&self) -> &AmenityVocabulary {
        &self.vocabulary
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Sorted distinct values of a column, as text, skipping missing markers
    pub fn distinct_values(&self, column: &str) -> Result<Vec<String>> {
        let values: BTreeSet<String> = text_values(&self.data, column)?
            .into_iter()
            .flatten()
            .filter(|v| !is_missing_token(v))
            .collect();
        Ok(values.into_iter().collect())
    }

    pub fn into_parts(self) -> (DataFrame, AmenityVocabulary, CleaningReport) {
        (self.data, self.vocabulary, self.report)
    }
}

/// Raw listings -> cleaned dataset + amenity vocabulary
#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: CleaningConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Run every cleaning step over one raw dataset.
    ///
    /// Deterministic: the same raw frame always yields the same cleaned frame
    /// and vocabulary.
    pub fn clean(&self, raw: &DataFrame) -> Result<CleanedDataset> {
        let start = Instant::now();
        self.config.validate()?;

        let mut report = CleaningReport {
            rows_in: raw.height(),
            ..Default::default()
        };

        let mut df = raw.clone();
        for (column, dtype) in self.config.resolved_coercions()? {
            let stats = coerce_column(&mut df, &column, dtype)?;
            if stats.defaulted > 0 {
                warn!(
                    column = %column,
                    dtype = %dtype,
                    defaulted = stats.defaulted,
                    "Malformed cells replaced with null"
                );
            }
            report.coercions.push(stats);
        }

        let mut filter = ListingFilter::new(self.config.price_quantile, self.config.max_minimum_nights);
        report.price_cutoff = filter.fit(&df)?;
        let mut df = filter.transform(&df)?;
        report.rows_retained = df.height();
        debug!(
            cutoff = report.price_cutoff,
            rows_in = report.rows_in,
            rows_retained = report.rows_retained,
            "Applied price and minimum_nights filter"
        );

        report.bathrooms_unparsed = Self::decompose_bathrooms(&mut df)?;

        let mut imputer = GroupMedianImputer::new(columns::BEDROOMS, columns::NEIGHBOURHOOD);
        let (imputed, bedroom_stats) = imputer.fit_transform(&df)?;
        if bedroom_stats.fallback > 0 {
            warn!(
                groups = ?bedroom_stats.empty_groups,
                rows = bedroom_stats.fallback,
                "Neighbourhoods without observed bedrooms imputed from the dataset median"
            );
        }
        report.bedrooms = bedroom_stats;
        let mut df = imputed;

        let vocabulary = self.derive_amenities(&mut df)?;
        report.vocabulary = vocabulary.tokens().to_vec();

        if df.column(columns::HOST_VERIFICATIONS).is_ok() {
            Self::derive_host_verifications(&mut df)?;
        }

        info!(
            rows_in = report.rows_in,
            rows_retained = report.rows_retained,
            degraded_cells = report.degraded_cells(),
            vocabulary = vocabulary.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cleaned listings dataset"
        );

        Ok(CleanedDataset {
            data: df,
            vocabulary,
            report,
        })
    }

    /// Add `bathrooms` and `bathrooms_is_shared`; returns the unparsed count
    fn decompose_bathrooms(df: &mut DataFrame) -> Result<usize> {
        let descriptors = text_values(df, columns::BATHROOMS_TEXT).map_err(|_| {
            PricerError::config(format!(
                "column '{}' is missing from the dataset",
                columns::BATHROOMS_TEXT
            ))
        })?;

        let mut unparsed = 0;
        let mut counts = Vec::with_capacity(descriptors.len());
        let mut shared = Vec::with_capacity(descriptors.len());
        for text in &descriptors {
            let parts = parse_bathrooms(text.as_deref());
            if let CellOutcome::Defaulted { reason } = &parts.bathrooms {
                debug!(reason = %reason, "Bathroom descriptor without a count");
                unparsed += 1;
            }
            counts.push(parts.bathrooms.into_option());
            shared.push(parts.is_shared);
        }

        df.with_column(Series::new(columns::BATHROOMS.into(), counts))?;
        df.with_column(Series::new(columns::BATHROOMS_IS_SHARED.into(), shared))?;
        Ok(unparsed)
    }

    /// Normalise amenity text, extract the vocabulary and add `num_amenities`
    fn derive_amenities(&self, df: &mut DataFrame) -> Result<AmenityVocabulary> {
        let raw = text_values(df, columns::AMENITIES).map_err(|_| {
            PricerError::config(format!(
                "column '{}' is missing from the dataset",
                columns::AMENITIES
            ))
        })?;

        let delimiter = self.config.amenity_delimiter.as_str();
        let token_lists: Vec<Vec<String>> = raw
            .iter()
            .map(|cell| {
                cell.as_deref()
                    .map(|text| parse_amenities(text, delimiter))
                    .unwrap_or_default()
            })
            .collect();

        let vocabulary = AmenityVocabulary::extract(&token_lists, self.config.vocabulary_size);

        let num_amenities: Vec<i64> = token_lists
            .iter()
            .map(|tokens| vocabulary.count_matches(tokens) as i64)
            .collect();
        let stripped: Vec<Option<String>> = raw
            .iter()
            .map(|cell| cell.as_deref().map(strip_list_punctuation))
            .collect();

        df.with_column(Series::new(columns::AMENITIES.into(), stripped))?;
        df.with_column(Series::new(columns::NUM_AMENITIES.into(), num_amenities))?;
        Ok(vocabulary)
    }

    /// One boolean column per verification kind from the `host_verifications` list
    fn derive_host_verifications(df: &mut DataFrame) -> Result<()> {
        let raw = text_values(df, columns::HOST_VERIFICATIONS)?;
        let kinds: Vec<BTreeSet<String>> = raw
            .iter()
            .map(|cell| {
                cell.as_deref()
                    .map(|text| {
                        text.chars()
                            .filter(|c| !matches!(c, '[' | ']' | '\'' | '"'))
                            .collect::<String>()
                            .split(',')
                            .map(|t| t.trim().to_string())
                            .filter(|t| !t.is_empty())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();

        for kind in HostVerification::ALL {
            let flags: Vec<bool> = kinds.iter().map(|set| set.contains(kind.token())).collect();
            df.with_column(Series::new(kind.column_name().into(), flags))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessing::{ColumnCoercion, CoercionType};

    fn minimal_config() -> CleaningConfig {
        CleaningConfig::new().with_coercions(vec![
            ColumnCoercion::new("price", CoercionType::Currency),
            ColumnCoercion::new("minimum_nights", CoercionType::Number),
            ColumnCoercion::new("bedrooms", CoercionType::Number),
        ])
    }

    fn raw_frame() -> DataFrame {
        df!(
            "price" => &["$100.00", "$80.00", "$1,500.00", "$60.00", "$90.00"],
            "minimum_nights" => &["30", "2", "1", "400", "3"],
            "bathrooms_text" => &[Some("1.5 shared baths"), Some("Half-bath"), Some("2 baths"), Some("1 bath"), None],
            "bedrooms" => &[Some("2"), None, Some("3"), Some("1"), Some("4")],
            "neighbourhood_cleansed" => &["A", "A", "B", "A", "A"],
            "amenities" => &[r#"["Wifi", "Kitchen"]"#, r#"["Wifi"]"#, r#"["Pool"]"#, "[]", r#"["Kitchen", "Iron"]"#],
            "host_verifications" => &[Some("['email', 'phone']"), Some("['phone']"), None, Some("[]"), Some("['work_email']")],
        )
        .unwrap()
    }

    #[test]
    fn test_clean_end_to_end_row() {
        let cleaned = Cleaner::with_config(minimal_config()).clean(&raw_frame()).unwrap();
        let df = cleaned.data();

        // $1,500 is above the 95th percentile, 400 nights exceeds a year
        assert_eq!(df.height(), 3);

        let price = df.column("price").unwrap().f64().unwrap();
        let bathrooms = df.column("bathrooms").unwrap().f64().unwrap();
        let shared = df.column("bathrooms_is_shared").unwrap().bool().unwrap();
        assert_eq!(price.get(0), Some(100.0));
        assert_eq!(bathrooms.get(0), Some(1.5));
        assert_eq!(shared.get(0), Some(true));

        // "Half-bath" degrades instead of failing
        assert_eq!(bathrooms.get(1), None);
        assert_eq!(shared.get(1), Some(false));
        assert_eq!(cleaned.report().bathrooms_unparsed, 1);
    }

    #[test]
    fn test_bedrooms_imputed_from_neighbourhood() {
        let cleaned = Cleaner::with_config(minimal_config()).clean(&raw_frame()).unwrap();
        let bedrooms = cleaned.data().column("bedrooms").unwrap().f64().unwrap();
        assert_eq!(bedrooms.null_count(), 0);
        // retained "A" rows have 2 and 4 observed
        assert_eq!(bedrooms.get(1), Some(3.0));
    }

    #[test]
    fn test_num_amenities_counts_vocabulary_hits() {
        let config = minimal_config().with_vocabulary_size(1);
        let cleaned = Cleaner::with_config(config).clean(&raw_frame()).unwrap();

        assert_eq!(cleaned.vocabulary().tokens(), &["Wifi"]);
        let counts: Vec<i64> = cleaned
            .data()
            .column("num_amenities")
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(counts, vec![1, 1, 0]);
    }

    #[test]
    fn test_host_verification_columns() {
        let cleaned = Cleaner::with_config(minimal_config()).clean(&raw_frame()).unwrap();
        let email = cleaned.data().column("host_verification_email").unwrap().bool().unwrap();
        let work = cleaned.data().column("host_verification_work_email").unwrap().bool().unwrap();
        assert_eq!(email.get(0), Some(true));
        assert_eq!(email.get(2), Some(false));
        assert_eq!(work.get(2), Some(true));
    }

    #[test]
    fn test_missing_declared_column_is_config_error() {
        let raw = raw_frame().drop("price").unwrap();
        let err = Cleaner::with_config(minimal_config()).clean(&raw).unwrap_err();
        assert!(matches!(err, PricerError::ConfigError(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn test_clean_is_deterministic() {
        let cleaner = Cleaner::with_config(minimal_config());
        let first = cleaner.clean(&raw_frame()).unwrap();
        let second = cleaner.clean(&raw_frame()).unwrap();
        assert!(first.data().equals_missing(second.data()));
        assert_eq!(first.vocabulary(), second.vocabulary());
        assert_eq!(first.report(), second.report());
    }
}
