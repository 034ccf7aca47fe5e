//! Model output -> price

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invert the log transform the model was trained on
pub fn decode(log_price: f64) -> f64 {
    log_price.exp()
}

/// [`decode`] applied to every output of a batch
pub fn decode_batch(log_prices: &[f64]) -> Vec<f64> {
    log_prices.iter().copied().map(decode).collect()
}

/// Round to cents for display
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// A decoded prediction for one listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub city: String,
    /// Raw model output
    pub log_price: f64,
    pub price: f64,
}

impl PricePrediction {
    pub fn from_model_output(city: impl Into<String>, log_price: f64) -> Self {
        Self {
            city: city.into(),
            log_price,
            price: decode(log_price),
        }
    }

    pub fn rounded(&self) -> f64 {
        round_price(self.price)
    }
}

impl fmt::Display for PricePrediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.price)
    }
}
