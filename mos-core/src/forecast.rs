use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One station forecast for one model run and lead time.
///
/// `forecast` is `None` when no value could be produced for the station
/// (no model, or no model run data); that is the missing-value sentinel
/// and serializes as an empty CSV field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub run_datetime: NaiveDateTime,
    pub station_id: String,
    pub lead_time: u32,
    pub forecast: Option<f64>,
}

impl ForecastRecord {
    pub fn is_missing(&self) -> bool {
        self.forecast.is_none()
    }
}
