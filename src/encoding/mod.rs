//! Feature schema construction and listing encoding
//!
//! The schema fixes the name and position of every model input; the encoder
//! turns one listing's attributes into a vector in exactly that layout.

mod encoder;
mod schema;

pub use encoder::{encode, FeatureEncoder, FeatureVector, ListingAttributes};
pub use schema::{
    one_hot_column, FeatureSchema, HostVerification, SchemaDiff, CATEGORICAL_COLUMNS,
    NUMERIC_COLUMNS, SCHEMA_VERSION,
};

use crate::error::Result;
use crate::preprocessing::CleanedDataset;

/// Enumerate the feature columns of a cleaned city dataset
pub fn build_schema(city: &str, dataset: &CleanedDataset) -> Result<FeatureSchema> {
    let schema = FeatureSchema::build(city, dataset)?;
    tracing::debug!(
        city = city,
        columns = schema.len(),
        fingerprint = %schema.fingerprint(),
        "Built feature schema"
    );
    Ok(schema)
}
