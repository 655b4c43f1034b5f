//! Contract of the tabular store historical training data is pulled from.

use crate::date_range::HistoryRange;
use crate::record::{ModelGridRecord, ObservationRecord};

/// Range/equality filtered access to the historical archives.
///
/// Training calls each method once per (lead time, predictand) pair and
/// slices the result per station in memory.
pub trait HistorySource {
    /// Model-grid records with `lead_time` equal to the given value and
    /// `run_datetime` within `range`.
    fn model_history(
        &self,
        lead_time: u32,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ModelGridRecord>>;

    /// Station observations of `variable` with `datetime` within `range`.
    fn station_history(
        &self,
        variable: &str,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ObservationRecord>>;
}
