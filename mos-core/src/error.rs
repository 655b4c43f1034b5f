use thiserror::Error;

/// Errors raised by the MOS engine.
///
/// Contract and configuration errors fail fast. Station sparsity variants
/// (`StationNotInModels`, `StationNotInRunData`, `NoModel`) are raised by
/// single-station evaluation and turned into sentinel forecasts by batch
/// callers; see [`MosError::is_station_sparsity`].
#[derive(Debug, Error, PartialEq)]
pub enum MosError {
    #[error("{path} must contain at least the following columns, missing: {}", .missing.join(", "))]
    MissingColumns { path: String, missing: Vec<String> },

    #[error("invalid model for station {station_id}, lead time {lead_time}, predictand {predictand}: {reason}")]
    InvalidModel {
        station_id: String,
        lead_time: u32,
        predictand: String,
        reason: String,
    },

    #[error("too many lead times in model run data ({0:?}); expected data for exactly one lead time")]
    TooManyLeadTimes(Vec<u32>),

    #[error("model run data is empty")]
    EmptyRunData,

    #[error("predictand {predictand} not found in models, predictands available: {available:?}")]
    UnknownPredictand {
        predictand: String,
        available: Vec<String>,
    },

    #[error("station {0} not found in persisted models")]
    StationNotInModels(String),

    #[error("station {0} not found in model run data")]
    StationNotInRunData(String),

    #[error("no model for station {station_id}, lead time {lead_time}, predictand {predictand}")]
    NoModel {
        station_id: String,
        lead_time: u32,
        predictand: String,
    },

    #[error("predictor {variable} missing from model run data for station {station_id}")]
    MissingPredictor { station_id: String, variable: String },

    #[error("grid {grid} has no land cells")]
    NoLandCells { grid: String },

    #[error("shape mismatch in grid {grid}: {detail}")]
    ShapeMismatch { grid: String, detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MosError {
    /// True for the per-station "no data / no model" conditions that a
    /// forecast batch replaces with a missing-value record.
    pub fn is_station_sparsity(&self) -> bool {
        matches!(
            self,
            MosError::StationNotInModels(_)
                | MosError::StationNotInRunData(_)
                | MosError::NoModel { .. }
        )
    }
}
