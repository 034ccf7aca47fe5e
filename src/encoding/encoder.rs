//! Attribute bundle -> feature vector encoding

use super::schema::{one_hot_column, FeatureSchema, HostVerification};
use crate::error::{PricerError, Result};
use crate::preprocessing::AmenityVocabulary;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;
use tracing::debug;

/// Everything known about a single listing to be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingAttributes {
    pub accommodates: f64,
    pub bathrooms: f64,
    pub bedrooms: f64,
    pub beds: f64,
    pub minimum_nights: f64,
    pub maximum_nights: f64,
    pub availability_365: f64,
    /// Fraction in [0, 1]
    pub host_acceptance_rate: f64,
    pub host_listings_count: f64,

    #[serde(default)]
    pub host_is_superhost: bool,
    #[serde(default)]
    pub instant_bookable: bool,
    #[serde(default)]
    pub has_availability: bool,
    #[serde(default)]
    pub bathrooms_is_shared: bool,

    pub room_type: String,
    pub neighbourhood_cleansed: String,
    pub bathrooms_text: String,
    pub host_response_time: String,

    #[serde(default)]
    pub amenities: BTreeSet<String>,
    #[serde(default)]
    pub host_verifications: BTreeSet<HostVerification>,
}

impl ListingAttributes {
    /// One guest, one of everything, no flags set
    pub fn new(
        room_type: impl Into<String>,
        neighbourhood: impl Into<String>,
        bathrooms_text: impl Into<String>,
        host_response_time: impl Into<String>,
    ) -> Self {
        Self {
            accommodates: 1.0,
            bathrooms: 1.0,
            bedrooms: 1.0,
            beds: 1.0,
            minimum_nights: 1.0,
            maximum_nights: 1.0,
            availability_365: 1.0,
            host_acceptance_rate: 0.0,
            host_listings_count: 1.0,
            host_is_superhost: false,
            instant_bookable: false,
            has_availability: false,
            bathrooms_is_shared: false,
            room_type: room_type.into(),
            neighbourhood_cleansed: neighbourhood.into(),
            bathrooms_text: bathrooms_text.into(),
            host_response_time: host_response_time.into(),
            amenities: BTreeSet::new(),
            host_verifications: BTreeSet::new(),
        }
    }

    pub fn with_amenity(mut self, amenity: impl Into<String>) -> Self {
        self.amenities.insert(amenity.into());
        self
    }

    pub fn with_verification(mut self, verification: HostVerification) -> Self {
        self.host_verifications.insert(verification);
        self
    }

    /// Load a bundle from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 13] {
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        [
            ("host_acceptance_rate", self.host_acceptance_rate),
            ("host_is_superhost", flag(self.host_is_superhost)),
            ("host_listings_count", self.host_listings_count),
            ("accommodates", self.accommodates),
            ("bathrooms", self.bathrooms),
            ("bedrooms", self.bedrooms),
            ("beds", self.beds),
            ("minimum_nights", self.minimum_nights),
            ("maximum_nights", self.maximum_nights),
            ("has_availability", flag(self.has_availability)),
            ("availability_365", self.availability_365),
            ("instant_bookable", flag(self.instant_bookable)),
            ("bathrooms_is_shared", flag(self.bathrooms_is_shared)),
        ]
    }

    fn categorical_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("host_response_time", self.host_response_time.as_str()),
            ("neighbourhood_cleansed", self.neighbourhood_cleansed.as_str()),
            ("room_type", self.room_type.as_str()),
            ("bathrooms_text", self.bathrooms_text.as_str()),
        ]
    }

    /// Reject negative or non-finite counts and out-of-range rates
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                return Err(PricerError::InvalidParameter {
                    name: name.to_string(),
                    value: value.to_string(),
                    reason: "must be a finite, non-negative number".to_string(),
                });
            }
        }
        if self.host_acceptance_rate > 1.0 {
            return Err(PricerError::InvalidParameter {
                name: "host_acceptance_rate".to_string(),
                value: self.host_acceptance_rate.to_string(),
                reason: "must be a fraction between 0 and 1".to_string(),
            });
        }
        Ok(())
    }
}

/// One encoded row, laid out exactly as its schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    /// A `1 x n` matrix for models that take a batch
    pub fn to_array(&self) -> Result<Array2<f64>> {
        Ok(Array2::from_shape_vec((1, self.values.len()), self.values.clone())?)
    }

    /// Single-row frame with one column per feature
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let columns: Vec<Column> = self
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| Column::new(name.as_str().into(), &[*value]))
            .collect();
        Ok(DataFrame::new(columns)?)
    }

    /// Write the vector as a one-row CSV for inspection
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_dataframe()?;
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file).finish(&mut df)?;
        Ok(())
    }
}

/// Encodes attribute bundles against a fixed schema and vocabulary
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    schema: FeatureSchema,
    vocabulary: AmenityVocabulary,
}

impl FeatureEncoder {
    pub fn new(schema: FeatureSchema, vocabulary: AmenityVocabulary) -> Self {
        Self { schema, vocabulary }
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn vocabulary(&self) -> &AmenityVocabulary {
        &self.vocabulary
    }

    pub fn encode(&self, attributes: &ListingAttributes) -> Result<FeatureVector> {
        encode(&self.schema, &self.vocabulary, attributes)
    }
}

/// Build the feature vector for one listing.
///
/// Starts from all zeros in schema order. A categorical value with no one-hot
/// column is a schema violation; amenities outside the vocabulary are skipped.
pub fn encode(
    schema: &FeatureSchema,
    vocabulary: &AmenityVocabulary,
    attributes: &ListingAttributes,
) -> Result<FeatureVector> {
    attributes.validate()?;

    let mut values = vec![0.0; schema.len()];
    let mut write = |column: &str, value: f64| -> Result<()> {
        let idx = schema
            .position(column)
            .ok_or_else(|| PricerError::schema_violation(column, value.to_string()))?;
        values[idx] = value;
        Ok(())
    };

    for (column, value) in attributes.numeric_fields() {
        write(column, value)?;
    }

    for (column, value) in attributes.categorical_fields() {
        let known = schema
            .categories(column)
            .is_some_and(|values| values.iter().any(|v| v == value));
        if !known {
            return Err(PricerError::schema_violation(column, value));
        }
        write(&one_hot_column(column, value), 1.0)?;
    }

    let mut matched = 0usize;
    for amenity in &attributes.amenities {
        if vocabulary.contains(amenity) && schema.contains(amenity) {
            write(amenity, 1.0)?;
            matched += 1;
        } else {
            debug!(amenity = %amenity, "Amenity outside vocabulary ignored");
        }
    }
    write("num_amenities", matched as f64)?;

    for verification in &attributes.host_verifications {
        write(verification.column_name(), 1.0)?;
    }

    Ok(FeatureVector {
        columns: schema.columns().to_vec(),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn schema() -> FeatureSchema {
        let mut categories = BTreeMap::new();
        categories.insert("host_response_time".to_string(), vec!["within an hour".to_string()]);
        categories.insert(
            "neighbourhood_cleansed".to_string(),
            vec!["Outremont".to_string(), "Verdun".to_string()],
        );
        categories.insert("room_type".to_string(), vec!["Private room".to_string()]);
        categories.insert("bathrooms_text".to_string(), vec!["1 shared bath".to_string()]);
        let vocab = AmenityVocabulary::from_tokens(vec!["Wifi".into(), "Kitchen".into()]);
        FeatureSchema::from_parts("montreal", categories, &vocab).unwrap()
    }

    fn attributes() -> ListingAttributes {
        ListingAttributes::new("Private room", "Verdun", "1 shared bath", "within an hour")
    }

    #[test]
    fn test_encode_sets_one_hot_and_numeric_columns() {
        let schema = schema();
        let vocab = schema.vocabulary();
        let mut attrs = attributes()
            .with_amenity("Wifi")
            .with_amenity("Hot tub")
            .with_verification(HostVerification::Phone);
        attrs.accommodates = 4.0;
        attrs.host_is_superhost = true;

        let vector = encode(&schema, &vocab, &attrs).unwrap();
        assert_eq!(vector.columns(), schema.columns());
        assert_eq!(vector.get("accommodates"), Some(4.0));
        assert_eq!(vector.get("host_is_superhost"), Some(1.0));
        assert_eq!(vector.get("neighbourhood_cleansed_Verdun"), Some(1.0));
        assert_eq!(vector.get("neighbourhood_cleansed_Outremont"), Some(0.0));
        assert_eq!(vector.get("Wifi"), Some(1.0));
        assert_eq!(vector.get("Kitchen"), Some(0.0));
        assert_eq!(vector.get("num_amenities"), Some(1.0));
        assert_eq!(vector.get("host_verification_phone"), Some(1.0));
        assert_eq!(vector.get("host_verification_email"), Some(0.0));
        // nine non-zero numeric inputs, num_amenities, four one-hot, Wifi, phone
        assert_eq!(vector.values().iter().filter(|v| **v != 0.0).count(), 16);
    }

    #[test]
    fn test_unseen_category_is_schema_violation() {
        let schema = schema();
        let mut attrs = attributes();
        attrs.neighbourhood_cleansed = "Atlantis".to_string();

        match encode(&schema, &schema.vocabulary(), &attrs) {
            Err(PricerError::SchemaViolation { column, value }) => {
                assert_eq!(column, "neighbourhood_cleansed");
                assert_eq!(value, "Atlantis");
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_encode_is_pure() {
        let schema = schema();
        let vocab = schema.vocabulary();
        let attrs = attributes().with_amenity("Kitchen");
        let encoder = FeatureEncoder::new(schema.clone(), vocab.clone());
        assert_eq!(encoder.encode(&attrs).unwrap(), encode(&schema, &vocab, &attrs).unwrap());
    }

    #[test]
    fn test_invalid_acceptance_rate() {
        let schema = schema();
        let mut attrs = attributes();
        attrs.host_acceptance_rate = 87.0;
        assert!(matches!(
            encode(&schema, &schema.vocabulary(), &attrs),
            Err(PricerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_to_array_shape() {
        let schema = schema();
        let vector = encode(&schema, &schema.vocabulary(), &attributes()).unwrap();
        let array = vector.to_array().unwrap();
        assert_eq!(array.shape(), &[1, schema.len()]);
    }

    #[test]
    fn test_write_csv() {
        let schema = schema();
        let vector = encode(&schema, &schema.vocabulary(), &attributes()).unwrap();
        let file = tempfile::NamedTempFile::new().unwrap();
        vector.write_csv(file.path()).unwrap();
        let text = std::fs::read_to_string(file.path()).unwrap();
        assert!(text.starts_with("host_acceptance_rate,"));
        assert_eq!(text.lines().count(), 2);
    }
}
