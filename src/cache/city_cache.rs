//! Per-city artifact cache
//!
//! Lazily builds, and then keeps for the life of the process, everything a
//! prediction for one city needs: the cleaned dataset, its vocabulary, the
//! trained schema and the model.

use crate::encoding::{
    build_schema, FeatureEncoder, FeatureSchema, FeatureVector, ListingAttributes,
};
use crate::error::{PricerError, Result};
use crate::prediction::{DirectoryModelRepository, ModelRepository, PriceModel, PricePrediction};
use crate::preprocessing::{CleanedDataset, Cleaner, CleaningConfig};
use crate::utils::{city_key, DataLoader};
use parking_lot::RwLock;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Where city datasets and model artifacts live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding `{city}.csv` raw datasets
    pub data_dir: PathBuf,
    /// Directory holding `{city}.json` model artifacts
    pub models_dir: PathBuf,
    #[serde(default)]
    pub cleaning: CleaningConfig,
}

impl CacheConfig {
    pub fn new(data_dir: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            models_dir: models_dir.into(),
            cleaning: CleaningConfig::default(),
        }
    }

    pub fn with_cleaning(mut self, cleaning: CleaningConfig) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn dataset_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", key))
    }
}

/// Everything needed to price listings in one city
#[derive(Debug)]
pub struct CityArtifacts {
    city: String,
    dataset: CleanedDataset,
    encoder: FeatureEncoder,
    model: Arc<dyn PriceModel>,
}

impl CityArtifacts {
    /// Check the dataset still produces the model's schema and wire up an encoder
    pub fn assemble(city: &str, dataset: CleanedDataset, model: Arc<dyn PriceModel>) -> Result<Self> {
        let rebuilt = build_schema(city, &dataset)?;
        rebuilt.ensure_matches(model.schema())?;

        let encoder = FeatureEncoder::new(model.schema().clone(), dataset.vocabulary().clone());
        Ok(Self {
            city: city.to_string(),
            dataset,
            encoder,
            model,
        })
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn dataset(&self) -> &CleanedDataset {
        &self.dataset
    }

    pub fn schema(&self) -> &FeatureSchema {
        self.encoder.schema()
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn model(&self) -> &Arc<dyn PriceModel> {
        &self.model
    }

    /// Encode, predict and decode one listing
    pub fn predict(&self, attributes: &ListingAttributes) -> Result<PricePrediction> {
        let features = self.encoder.encode(attributes)?;
        self.predict_encoded(&features)
    }

    /// Price a listing that has already been encoded with [`Self::encoder`]
    pub fn predict_encoded(&self, features: &FeatureVector) -> Result<PricePrediction> {
        let log_price = self.model.predict(features)?;
        let prediction = PricePrediction::from_model_output(self.city.clone(), log_price);
        debug!(city = %self.city, log_price, price = prediction.price, "Predicted price");
        Ok(prediction)
    }
}

/// City key -> artifacts, populated on first request and never invalidated
pub struct CityCache {
    config: CacheConfig,
    cleaner: Cleaner,
    loader: DataLoader,
    models: Arc<dyn ModelRepository>,
    entries: RwLock<HashMap<String, Arc<CityArtifacts>>>,
}

impl std::fmt::Debug for CityCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CityCache")
            .field("config", &self.config)
            .field("cached", &self.cached_cities())
            .finish()
    }
}

impl CityCache {
    /// Cache reading model artifacts from `config.models_dir`
    pub fn new(config: CacheConfig) -> Self {
        let models = Arc::new(DirectoryModelRepository::new(config.models_dir.clone()));
        Self::with_repository(config, models)
    }

    pub fn with_repository(config: CacheConfig, models: Arc<dyn ModelRepository>) -> Self {
        let cleaner = Cleaner::with_config(config.cleaning.clone());
        Self {
            config,
            cleaner,
            loader: DataLoader::new(),
            models,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Artifacts for `city`, loading them on first use.
    ///
    /// The model is fetched before the dataset is touched so a missing
    /// artifact fails fast.
    pub fn get(&self, city: &str) -> Result<Arc<CityArtifacts>> {
        let key = city_key(city);
        if let Some(found) = self.entries.read().get(&key) {
            return Ok(Arc::clone(found));
        }

        let artifacts = Arc::new(self.load(&key)?);
        let mut entries = self.entries.write();
        let entry = entries.entry(key).or_insert(artifacts);
        Ok(Arc::clone(entry))
    }

    fn load(&self, key: &str) -> Result<CityArtifacts> {
        let model = self.models.load(key)?;

        let path = self.config.dataset_path(key);
        if !path.exists() {
            return Err(PricerError::DataError(format!(
                "no dataset for city '{}' at {}",
                key,
                path.display()
            )));
        }
        let raw = self.loader.load_csv(&path)?;
        let dataset = self.cleaner.clean(&raw)?;
        let artifacts = CityArtifacts::assemble(key, dataset, model)?;

        info!(
            city = key,
            rows = artifacts.dataset.height(),
            columns = artifacts.schema().len(),
            "Cached city artifacts"
        );
        Ok(artifacts)
    }

    /// Load several cities in parallel; each city is independent
    pub fn warm(&self, cities: &[String]) -> Vec<(String, Result<()>)> {
        cities
            .par_iter()
            .map(|city| (city.clone(), self.get(city).map(|_| ())))
            .collect()
    }

    /// Price one listing in `city`
    pub fn predict(&self, city: &str, attributes: &ListingAttributes) -> Result<PricePrediction> {
        self.get(city)?.predict(attributes)
    }

    pub fn is_cached(&self, city: &str) -> bool {
        self.entries.read().contains_key(&city_key(city))
    }

    pub fn cached_cities(&self) -> Vec<String> {
        let mut cities: Vec<String> = self.entries.read().keys().cloned().collect();
        cities.sort();
        cities
    }
}
