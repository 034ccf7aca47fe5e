//! Price prediction
//!
//! The model is an opaque log-price regressor behind [`PriceModel`];
//! [`decode`] turns its output back into a price.

mod decode;
mod model;

pub use decode::{decode, decode_batch, round_price, PricePrediction};
pub use model::{check_layout, DirectoryModelRepository, LinearPriceModel, ModelRepository, PriceModel};
