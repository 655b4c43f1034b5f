//! Fitted per-station models and the scoring contract shared by all backends.

use serde::{Deserialize, Serialize};

/// Identity of a station model: one per (station, lead time, predictand).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelKey {
    pub station_id: String,
    pub lead_time: u32,
    pub predictand: String,
}

impl ModelKey {
    pub fn new(station_id: &str, lead_time: u32, predictand: &str) -> Self {
        Self {
            station_id: station_id.to_string(),
            lead_time,
            predictand: predictand.to_string(),
        }
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/lt{:02}/{}", self.station_id, self.lead_time, self.predictand)
    }
}

/// Anything that can score a predictor vector for one station model.
///
/// `predict` receives values aligned 1:1 with [`StationModel::predictors`].
pub trait StationModel {
    fn key(&self) -> ModelKey;
    fn predictors(&self) -> &[String];
    fn predict(&self, predictor_values: &[f64]) -> f64;
    /// In-sample coefficient of determination of the fit.
    fn score(&self) -> f64;
}

/// A multiple linear regression selected and fitted for one station.
///
/// `coefficients` is always the same length as `predictor_names`, and the
/// predictor list is never empty. Once persisted, a model is only ever
/// replaced by re-running training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub station_id: String,
    pub lead_time: u32,
    pub predictand: String,
    pub predictor_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub fit_score: f64,
}

impl StationModel for FittedModel {
    fn key(&self) -> ModelKey {
        ModelKey::new(&self.station_id, self.lead_time, &self.predictand)
    }

    fn predictors(&self) -> &[String] {
        &self.predictor_names
    }

    fn predict(&self, predictor_values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(predictor_values)
            .map(|(c, v)| c * v)
            .sum::<f64>()
            + self.intercept
    }

    fn score(&self) -> f64 {
        self.fit_score
    }
}
