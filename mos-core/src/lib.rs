//! Core types for station Model Output Statistics (MOS).
//!
//! Everything the other crates exchange lives here: station metadata,
//! observation and model-grid records, fitted models, forecast records,
//! the error taxonomy, run configuration and the historical data source
//! contract.

pub mod config;
pub mod date_range;
pub mod error;
pub mod forecast;
pub mod model;
pub mod record;
pub mod source;
pub mod station;

pub use error::MosError;
