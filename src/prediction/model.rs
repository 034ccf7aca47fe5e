//! Price model artifacts

use crate::encoding::{FeatureSchema, FeatureVector};
use crate::error::{PricerError, Result};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// A trained log-price regressor.
///
/// Implementations are loaded once per city and shared read-only.
pub trait PriceModel: Send + Sync + fmt::Debug {
    /// Schema the model was trained against
    fn schema(&self) -> &FeatureSchema;

    /// Raw model output for one listing (natural log of the price)
    fn predict(&self, features: &FeatureVector) -> Result<f64>;
}

/// Reject vectors whose layout differs from the trained schema
pub fn check_layout(schema: &FeatureSchema, features: &FeatureVector) -> Result<()> {
    if features.columns() == schema.columns() {
        return Ok(());
    }
    let offending = features
        .columns()
        .iter()
        .zip(schema.columns())
        .find(|(got, want)| got != want)
        .map(|(got, _)| got.clone())
        .or_else(|| schema.columns().get(features.len()).cloned())
        .or_else(|| features.columns().get(schema.len()).cloned())
        .unwrap_or_default();
    Err(PricerError::schema_violation(
        offending,
        format!(
            "feature vector has {} columns, trained schema {} has {}",
            features.len(),
            schema.fingerprint(),
            schema.len()
        ),
    ))
}

/// Linear model over the schema columns, stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearPriceModel {
    city: String,
    schema: FeatureSchema,
    intercept: f64,
    weights: Vec<f64>,
}

impl LinearPriceModel {
    pub fn new(
        city: impl Into<String>,
        schema: FeatureSchema,
        intercept: f64,
        weights: Vec<f64>,
    ) -> Result<Self> {
        let model = Self {
            city: city.into(),
            schema,
            intercept,
            weights,
        };
        model.check_weights()?;
        Ok(model)
    }

    fn check_weights(&self) -> Result<()> {
        if self.weights.len() != self.schema.len() {
            return Err(PricerError::ShapeError {
                expected: format!("{} weights", self.schema.len()),
                actual: format!("{} weights", self.weights.len()),
            });
        }
        Ok(())
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&json)?;
        model.schema.check_version()?;
        model.check_weights()?;
        Ok(model)
    }
}

impl PriceModel for LinearPriceModel {
    fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        check_layout(&self.schema, features)?;
        let x = features.to_array()?;
        let w = ArrayView1::from(self.weights.as_slice());
        Ok(x.dot(&w)[0] + self.intercept)
    }
}

/// Source of per-city model artifacts
pub trait ModelRepository: Send + Sync {
    /// Load the model for `city`; any failure is [`PricerError::UpstreamUnavailable`]
    fn load(&self, city: &str) -> Result<Arc<dyn PriceModel>>;
}

/// Reads `{dir}/{city}.json` linear artifacts
#[derive(Debug, Clone)]
pub struct DirectoryModelRepository {
    dir: PathBuf,
}

impl DirectoryModelRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn artifact_path(&self, city: &str) -> PathBuf {
        self.dir.join(format!("{}.json", city))
    }
}

impl ModelRepository for DirectoryModelRepository {
    fn load(&self, city: &str) -> Result<Arc<dyn PriceModel>> {
        let path = self.artifact_path(city);
        let model = LinearPriceModel::load(&path).map_err(|e| PricerError::UpstreamUnavailable {
            city: city.to_string(),
            reason: format!("{}: {}", path.display(), e),
        })?;
        info!(
            city = city,
            path = %path.display(),
            columns = model.schema.len(),
            "Loaded price model"
        );
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::{encode, ListingAttributes};
    use crate::preprocessing::AmenityVocabulary;
    use std::collections::BTreeMap;

    fn schema() -> FeatureSchema {
        let mut categories = BTreeMap::new();
        for (column, value) in [
            ("host_response_time", "within an hour"),
            ("neighbourhood_cleansed", "Verdun"),
            ("room_type", "Private room"),
            ("bathrooms_text", "1 bath"),
        ] {
            categories.insert(column.to_string(), vec![value.to_string()]);
        }
        let vocab = AmenityVocabulary::from_tokens(vec!["Wifi".into()]);
        FeatureSchema::from_parts("verdun", categories, &vocab).unwrap()
    }

    #[test]
    fn test_linear_model_predicts_log_price() {
        let schema = schema();
        let mut weights = vec![0.0; schema.len()];
        weights[schema.position("accommodates").unwrap()] = 0.5;
        let model = LinearPriceModel::new("verdun", schema.clone(), 3.0, weights).unwrap();

        let mut attrs = ListingAttributes::new("Private room", "Verdun", "1 bath", "within an hour");
        attrs.accommodates = 4.0;
        let vector = encode(&schema, &schema.vocabulary(), &attrs).unwrap();

        assert!((model.predict(&vector).unwrap() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_weight_count_must_match_schema() {
        let err = LinearPriceModel::new("verdun", schema(), 0.0, vec![1.0]).unwrap_err();
        assert!(matches!(err, PricerError::ShapeError { .. }));
    }

    #[test]
    fn test_missing_artifact_is_upstream_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let repo = DirectoryModelRepository::new(dir.path());
        match repo.load("atlantis") {
            Err(PricerError::UpstreamUnavailable { city, .. }) => assert_eq!(city, "atlantis"),
            other => panic!("expected upstream unavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_artifact_round_trip_through_repository() {
        let dir = tempfile::tempdir().unwrap();
        let schema = schema();
        let weights = vec![0.0; schema.len()];
        LinearPriceModel::new("verdun", schema.clone(), 4.2, weights)
            .unwrap()
            .save(dir.path().join("verdun.json"))
            .unwrap();

        let model = DirectoryModelRepository::new(dir.path()).load("verdun").unwrap();
        assert_eq!(model.schema(), &schema);
    }
}
