//! Versioned feature schema shared by training and inference

use crate::error::{PricerError, Result};
use crate::preprocessing::{AmenityVocabulary, CleanedDataset};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Bumped whenever the column layout rules change
pub const SCHEMA_VERSION: u32 = 1;

/// Fixed numeric and boolean columns, in model order
pub const NUMERIC_COLUMNS: [&str; 14] = [
    "host_acceptance_rate",
    "host_is_superhost",
    "host_listings_count",
    "accommodates",
    "bathrooms",
    "bedrooms",
    "beds",
    "minimum_nights",
    "maximum_nights",
    "has_availability",
    "availability_365",
    "instant_bookable",
    "bathrooms_is_shared",
    "num_amenities",
];

/// Columns expanded into one-hot blocks, in model order
pub const CATEGORICAL_COLUMNS: [&str; 4] = [
    "host_response_time",
    "neighbourhood_cleansed",
    "room_type",
    "bathrooms_text",
];

/// Kind of identity verification a host completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostVerification {
    Email,
    Phone,
    WorkEmail,
}

impl HostVerification {
    pub const ALL: [HostVerification; 3] = [
        HostVerification::Email,
        HostVerification::Phone,
        HostVerification::WorkEmail,
    ];

    /// Token used in the raw `host_verifications` list
    pub fn token(&self) -> &'static str {
        match self {
            HostVerification::Email => "email",
            HostVerification::Phone => "phone",
            HostVerification::WorkEmail => "work_email",
        }
    }

    pub fn column_name(&self) -> &'static str {
        match self {
            HostVerification::Email => "host_verification_email",
            HostVerification::Phone => "host_verification_phone",
            HostVerification::WorkEmail => "host_verification_work_email",
        }
    }
}

/// Name of the one-hot column for a categorical value
pub fn one_hot_column(column: &str, value: &str) -> String {
    format!("{}_{}", column, value)
}

/// Columns present in one schema but not the other
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub reordered: bool,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && !self.reordered
    }
}

/// Ordered, named list of every column the price model consumes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    version: u32,
    city: String,
    columns: Vec<String>,
    categories: BTreeMap<String, Vec<String>>,
    amenities: Vec<String>,
}

impl FeatureSchema {
    /// Enumerate columns from a cleaned dataset and its vocabulary.
    ///
    /// One-hot blocks cover every distinct value observed in the dataset, so
    /// the schema must be rebuilt (or reloaded) whenever the dataset changes.
    pub fn build(city: impl Into<String>, dataset: &CleanedDataset) -> Result<Self> {
        if dataset.height() == 0 {
            return Err(PricerError::config(
                "cannot build a feature schema from an empty dataset",
            ));
        }

        let mut categories = BTreeMap::new();
        for column in CATEGORICAL_COLUMNS {
            let values = dataset.distinct_values(column).map_err(|_| {
                PricerError::config(format!(
                    "categorical column '{}' is missing from the cleaned dataset",
                    column
                ))
            })?;
            if values.is_empty() {
                return Err(PricerError::config(format!(
                    "categorical column '{}' has no observed values",
                    column
                )));
            }
            categories.insert(column.to_string(), values);
        }

        Self::from_parts(city, categories, dataset.vocabulary())
    }

    /// Assemble a schema from known categories and vocabulary
    pub fn from_parts(
        city: impl Into<String>,
        categories: BTreeMap<String, Vec<String>>,
        vocabulary: &AmenityVocabulary,
    ) -> Result<Self> {
        let mut columns: Vec<String> = NUMERIC_COLUMNS.iter().map(|c| c.to_string()).collect();

        let mut amenities = vocabulary.tokens().to_vec();
        amenities.sort();
        columns.extend(amenities.iter().cloned());

        columns.extend(HostVerification::ALL.iter().map(|v| v.column_name().to_string()));

        for column in CATEGORICAL_COLUMNS {
            let values = categories.get(column).ok_or_else(|| {
                PricerError::config(format!("no categories given for column '{}'", column))
            })?;
            columns.extend(values.iter().map(|v| one_hot_column(column, v)));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(PricerError::config(format!(
                "feature column '{}' would appear twice in the schema",
                dup
            )));
        }

        Ok(Self {
            version: SCHEMA_VERSION,
            city: city.into(),
            columns,
            categories,
            amenities: vocabulary.tokens().to_vec(),
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Values with a one-hot column for a categorical column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    /// Vocabulary the schema was built with, in frequency order
    pub fn vocabulary(&self) -> AmenityVocabulary {
        AmenityVocabulary::from_tokens(self.amenities.clone())
    }

    /// SHA-256 over the version and ordered column names
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update([0u8]);
        }
        format!("{:x}", hasher.finalize())
    }

    /// Column-level difference from `other` to `self`
    pub fn diff(&self, other: &FeatureSchema) -> SchemaDiff {
        let mine: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.columns.iter().map(String::as_str).collect();

        let added: Vec<String> = self
            .columns
            .iter()
            .filter(|c| !theirs.contains(c.as_str()))
            .cloned()
            .collect();
        let removed: Vec<String> = other
            .columns
            .iter()
            .filter(|c| !mine.contains(c.as_str()))
            .cloned()
            .collect();
        let reordered = added.is_empty() && removed.is_empty() && self.columns != other.columns;

        SchemaDiff {
            added,
            removed,
            reordered,
        }
    }

    /// Fail with a schema violation unless `self` has exactly `expected`'s layout
    pub fn ensure_matches(&self, expected: &FeatureSchema) -> Result<()> {
        let diff = self.diff(expected);
        if let Some(column) = diff.added.first() {
            return Err(PricerError::schema_violation(
                column.clone(),
                format!("column not in trained schema ({} added)", diff.added.len()),
            ));
        }
        if let Some(column) = diff.removed.first() {
            return Err(PricerError::schema_violation(
                column.clone(),
                format!("column missing from rebuilt schema ({} removed)", diff.removed.len()),
            ));
        }
        if diff.reordered {
            let column = self
                .columns
                .iter()
                .zip(&expected.columns)
                .find(|(a, b)| a != b)
                .map(|(a, _)| a.clone())
                .unwrap_or_default();
            return Err(PricerError::schema_violation(column, "column out of trained order"));
        }
        Ok(())
    }

    /// Persist as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a persisted schema, rejecting other layout versions
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&json)?;
        schema.check_version()?;
        Ok(schema)
    }

    pub(crate) fn check_version(&self) -> Result<()> {
        if self.version != SCHEMA_VERSION {
            return Err(PricerError::config(format!(
                "feature schema version {} is not supported (expected {})",
                self.version, SCHEMA_VERSION
            )));
        }
        Ok(())
    }
}
