//! The training contract shared by all model backends.

use crate::align::TrainingTable;
use mos_core::model::{ModelKey, StationModel};

/// Fits one station model from an aligned training table.
///
/// `None` is the normal outcome for sparse stations (too few rows, no
/// usable predictor); it is never an error. Backends are shared across
/// training workers, so they must be `Sync`.
pub trait ModelBackend: Sync {
    type Model: StationModel + Send;

    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    fn train(&self, key: &ModelKey, table: &TrainingTable) -> Option<Self::Model>;
}
