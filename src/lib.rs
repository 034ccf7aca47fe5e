//! Rental Pricer - nightly price estimation for short-term-rental listings
//!
//! This crate turns raw city listing exports into model-ready data and
//! prices new listings:
//! - Listing cleaning: type coercion, outlier filtering, bathroom
//!   decomposition, grouped bedroom imputation, amenity vocabulary
//! - A deterministic per-city feature schema and a one-row encoder
//! - Decoding of log-price model output back into currency
//!
//! # Modules
//!
//! - [`preprocessing`] - Listing cleaning
//! - [`encoding`] - Feature schema and listing encoder
//! - [`prediction`] - Model boundary and price decoding
//! - [`cache`] - Per-city artifact cache
//! - [`utils`] - Listing file loading and city discovery
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline
pub mod preprocessing;
pub mod encoding;
pub mod prediction;

// Infrastructure
pub mod cache;
pub mod utils;

// Services
pub mod cli;

pub use error::{PricerError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PricerError, Result};

    // Cleaning
    pub use crate::preprocessing::{
        AmenityVocabulary, CleanedDataset, Cleaner, CleaningConfig, CleaningReport,
    };

    // Encoding
    pub use crate::encoding::{
        build_schema, FeatureEncoder, FeatureSchema, FeatureVector, HostVerification,
        ListingAttributes,
    };

    // Prediction
    pub use crate::prediction::{decode, LinearPriceModel, PriceModel, PricePrediction};

    // Cache
    pub use crate::cache::{CacheConfig, CityCache};

    // Data loading
    pub use crate::utils::{DataLoader, DataSaver};
}
