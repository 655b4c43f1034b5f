//! Station/model alignment into a supervised training table.

use chrono::NaiveDateTime;
use mos_core::record::{ModelGridRecord, ObservationRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Time-indexed predictors plus the aligned observed predictand (`obs`)
/// for one station, lead time and predictand.
///
/// Columns are stored column-major: `values[c][r]` is predictor
/// `columns[c]` at `datetimes[r]`. Rows are in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingTable {
    pub station_id: String,
    pub datetimes: Vec<NaiveDateTime>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
    pub obs: Vec<f64>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.obs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obs.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Row `r` as a predictor vector aligned with `columns`.
    pub fn row(&self, r: usize) -> Vec<f64> {
        self.values.iter().map(|column| column[r]).collect()
    }
}

/// Builds training tables and rejects those too small to fit.
#[derive(Debug, Clone)]
pub struct FeatureAligner {
    min_samples: usize,
}

impl FeatureAligner {
    pub fn new(min_samples: usize) -> Self {
        Self { min_samples }
    }

    /// Align one station's history with its model history.
    ///
    /// 1. Observations of `predictand` become the `obs` column (first value
    ///    wins on a repeated datetime).
    /// 2. Model records are de-duplicated on (valid time, variable), first
    ///    wins, and pivoted to one row per valid time.
    /// 3. Rows are inner-joined on valid time == observation datetime;
    ///    rows missing any predictor column are dropped.
    ///
    /// `predictors` restricts the columns; `None` keeps every model variable.
    /// Returns `None` when fewer than the minimum sample count rows survive.
    pub fn align(
        &self,
        station_id: &str,
        station_history: &[&ObservationRecord],
        model_history: &[&ModelGridRecord],
        predictand: &str,
        predictors: Option<&[String]>,
    ) -> Option<TrainingTable> {
        let mut observed: BTreeMap<NaiveDateTime, f64> = BTreeMap::new();
        for record in station_history.iter().filter(|r| r.variable == predictand) {
            observed.entry(record.datetime).or_insert(record.value);
        }

        let mut wide: BTreeMap<NaiveDateTime, BTreeMap<&str, f64>> = BTreeMap::new();
        let mut variables: BTreeSet<&str> = BTreeSet::new();
        for record in model_history {
            variables.insert(record.variable.as_str());
            wide.entry(record.valid_time())
                .or_default()
                .entry(record.variable.as_str())
                .or_insert(record.value);
        }

        let columns: Vec<String> = match predictors {
            Some(wanted) => wanted
                .iter()
                .filter(|p| variables.contains(p.as_str()))
                .cloned()
                .collect(),
            None => variables.iter().map(|v| v.to_string()).collect(),
        };
        if columns.is_empty() {
            log::debug!("align: station {} has no predictor columns", station_id);
            return None;
        }

        let mut table = TrainingTable {
            station_id: station_id.to_string(),
            datetimes: Vec::new(),
            columns,
            values: Vec::new(),
            obs: Vec::new(),
        };
        table.values = vec![Vec::new(); table.columns.len()];

        for (datetime, row) in &wide {
            let Some(obs) = observed.get(datetime) else {
                continue;
            };
            let complete: Option<Vec<f64>> = table
                .columns
                .iter()
                .map(|c| row.get(c.as_str()).copied())
                .collect();
            let Some(complete) = complete else {
                continue;
            };
            table.datetimes.push(*datetime);
            table.obs.push(*obs);
            for (column, value) in table.values.iter_mut().zip(complete) {
                column.push(value);
            }
        }

        if table.len() < self.min_samples {
            log::debug!(
                "align: station {} {} has {} aligned rows, {} required",
                station_id,
                predictand,
                table.len(),
                self.min_samples
            );
            return None;
        }
        Some(table)
    }
}
