use chrono::NaiveDateTime;
use mos_utils::dates::valid_time;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single station observation of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub station_id: String,
    pub datetime: NaiveDateTime,
    pub variable: String,
    pub value: f64,
}

/// A model grid value already extracted at a station's resolved cell
/// for one model run and lead time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelGridRecord {
    pub station_id: String,
    pub run_datetime: NaiveDateTime,
    /// Hours ahead of `run_datetime`.
    pub lead_time: u32,
    pub variable: String,
    pub value: f64,
}

impl ModelGridRecord {
    /// The time this value is valid for: run initialisation plus lead time.
    pub fn valid_time(&self) -> NaiveDateTime {
        valid_time(&self.run_datetime, self.lead_time)
    }
}

/// Records that belong to a station.
pub trait StationKeyed {
    fn station_id(&self) -> &str;
}

impl StationKeyed for ObservationRecord {
    fn station_id(&self) -> &str {
        &self.station_id
    }
}

impl StationKeyed for ModelGridRecord {
    fn station_id(&self) -> &str {
        &self.station_id
    }
}

/// Partition records by station_id, preserving input order within each station.
pub fn group_by_station<T: StationKeyed>(records: &[T]) -> HashMap<&str, Vec<&T>> {
    let mut result: HashMap<&str, Vec<&T>> = HashMap::new();
    for record in records {
        result.entry(record.station_id()).or_default().push(record);
    }
    result
}
