//! Utility functions and types

pub mod data_loader;

pub use data_loader::{city_display_name, city_key, discover_cities, DataLoader, DataSaver};
