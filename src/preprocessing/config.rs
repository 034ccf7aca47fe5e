//! Cleaning configuration

use crate::error::{PricerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Target type for a declared column coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoercionType {
    /// "87%" -> 0.87
    Percentage,
    /// "t" / "f" -> true / false
    Boolean,
    /// ISO-like text -> date
    DateTime,
    /// "$1,250.00" -> 1250.0
    Currency,
    /// Plain numeric text -> f64
    Number,
}

impl FromStr for CoercionType {
    type Err = PricerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => Ok(CoercionType::Percentage),
            "boolean" | "bool" => Ok(CoercionType::Boolean),
            "datetime" | "date" => Ok(CoercionType::DateTime),
            "currency" => Ok(CoercionType::Currency),
            "number" | "float" => Ok(CoercionType::Number),
            other => Err(PricerError::config(format!(
                "unsupported coercion type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for CoercionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoercionType::Percentage => "percentage",
            CoercionType::Boolean => "boolean",
            CoercionType::DateTime => "datetime",
            CoercionType::Currency => "currency",
            CoercionType::Number => "number",
        };
        f.write_str(name)
    }
}

/// One entry of the declared column -> type mapping, as written in config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCoercion {
    pub column: String,
    pub dtype: String,
}

impl ColumnCoercion {
    pub fn new(column: impl Into<String>, dtype: CoercionType) -> Self {
        Self {
            column: column.into(),
            dtype: dtype.to_string(),
        }
    }
}

/// Configuration for the listing cleaner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Rows with a price at or above this quantile are dropped
    pub price_quantile: f64,

    /// Upper bound (inclusive) for `minimum_nights`
    pub max_minimum_nights: f64,

    /// Number of amenity tokens kept in the vocabulary
    pub vocabulary_size: usize,

    /// Separator between amenity tokens once list punctuation is stripped
    pub amenity_delimiter: String,

    /// Declared column coercions, applied in order
    pub coercions: Vec<ColumnCoercion>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        use CoercionType::*;

        let declared: [(&str, CoercionType); 19] = [
            ("host_since", DateTime),
            ("host_response_rate", Percentage),
            ("host_acceptance_rate", Percentage),
            ("host_is_superhost", Boolean),
            ("host_has_profile_pic", Boolean),
            ("host_identity_verified", Boolean),
            ("instant_bookable", Boolean),
            ("has_availability", Boolean),
            ("price", Currency),
            ("host_listings_count", Number),
            ("accommodates", Number),
            ("bedrooms", Number),
            ("beds", Number),
            ("minimum_nights", Number),
            ("maximum_nights", Number),
            ("availability_365", Number),
            ("latitude", Number),
            ("longitude", Number),
            ("review_scores_rating", Number),
        ];

        Self {
            price_quantile: 0.95,
            max_minimum_nights: 365.0,
            vocabulary_size: 20,
            amenity_delimiter: ", ".to_string(),
            coercions: declared
                .iter()
                .map(|(col, dtype)| ColumnCoercion::new(*col, *dtype))
                .collect(),
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the price quantile cutoff
    pub fn with_price_quantile(mut self, quantile: f64) -> Self {
        self.price_quantile = quantile;
        self
    }

    /// Builder method to set the vocabulary size
    pub fn with_vocabulary_size(mut self, size: usize) -> Self {
        self.vocabulary_size = size;
        self
    }

    /// Builder method to replace the declared coercions
    pub fn with_coercions(mut self, coercions: Vec<ColumnCoercion>) -> Self {
        self.coercions = coercions;
        self
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check bounds and resolve every declared coercion type
    pub fn validate(&self) -> Result<()> {
        if !(self.price_quantile > 0.0 && self.price_quantile <= 1.0) {
            return Err(PricerError::InvalidParameter {
                name: "price_quantile".to_string(),
                value: self.price_quantile.to_string(),
                reason: "must be in (0, 1]".to_string(),
            });
        }
        if self.vocabulary_size == 0 {
            return Err(PricerError::InvalidParameter {
                name: "vocabulary_size".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        self.resolved_coercions().map(|_| ())
    }

    /// Declared coercions with their type names parsed.
    ///
    /// An unknown type name is a configuration error naming the column.
    pub fn resolved_coercions(&self) -> Result<Vec<(String, CoercionType)>> {
        self.coercions
            .iter()
            .map(|c| {
                let dtype = c.dtype.parse::<CoercionType>().map_err(|_| {
                    PricerError::config(format!(
                        "unsupported coercion type '{}' declared for column '{}'",
                        c.dtype, c.column
                    ))
                })?;
                Ok((c.column.clone(), dtype))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.price_quantile, 0.95);
        assert_eq!(config.max_minimum_nights, 365.0);
        assert_eq!(config.vocabulary_size, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = CleaningConfig::new()
            .with_price_quantile(0.9)
            .with_vocabulary_size(5);
        assert_eq!(config.price_quantile, 0.9);
        assert_eq!(config.vocabulary_size, 5);
    }

    #[test]
    fn test_unknown_coercion_type_is_config_error() {
        let config = CleaningConfig::new()
            .with_coercions(vec![ColumnCoercion {
                column: "price".to_string(),
                dtype: "money".to_string(),
            }]);

        let err = config.resolved_coercions().unwrap_err();
        assert!(matches!(err, PricerError::ConfigError(_)));
        let msg = err.to_string();
        assert!(msg.contains("money"));
        assert!(msg.contains("price"));
    }

    #[test]
    fn test_coercion_type_round_trips_through_name() {
        for dtype in [
            CoercionType::Percentage,
            CoercionType::Boolean,
            CoercionType::DateTime,
            CoercionType::Currency,
            CoercionType::Number,
        ] {
            assert_eq!(dtype.to_string().parse::<CoercionType>().unwrap(), dtype);
        }
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "price_quantile": 0.9,
            "max_minimum_nights": 30.0,
            "vocabulary_size": 10,
            "amenity_delimiter": ", ",
            "coercions": [{"column": "price", "dtype": "currency"}]
        }"#;
        let config: CleaningConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolved_coercions().unwrap();
        assert_eq!(resolved, vec![("price".to_string(), CoercionType::Currency)]);
    }
}
