//! Caching of per-city datasets, schemas and models

mod city_cache;

pub use city_cache::{CacheConfig, CityArtifacts, CityCache};
