//! Offline training and online forecasting of station MOS models.
//!
//! [`TrainingPipeline`] pulls history once per (lead time, predictand),
//! aligns and fits one model per station on a worker pool.
//! [`ForecastEngine`] evaluates persisted models against a fresh model run,
//! substituting missing-value records for stations it cannot serve.

pub mod forecast;
pub mod pipeline;

pub use forecast::ForecastEngine;
pub use pipeline::{TrainingOutput, TrainingPipeline, TrainingSummary};
