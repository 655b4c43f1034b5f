//! CSV data loading functions for populating the in-memory SQLite database.
//!
//! Each loader parses CSV data from a string slice and inserts rows into the
//! corresponding table inside one transaction. Columns are located by header
//! name, so extra columns and any column order are accepted.
//!
//! # CSV Formats
//!
//! - **Stations**: `station_id,latitude,longitude`
//! - **Observations**: `station_id,datetime,variable,value`
//! - **Model data**: `station_id,run_datetime,lead_time,variable,value`
//!
//! Datetimes may be `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`; they are
//! stored in the former. Rows with a missing or non-numeric value, or an
//! unparseable datetime, are skipped and counted.

use crate::Database;
use anyhow::Context;
use mos_core::MosError;
use mos_utils::dates::{format_datetime, parse_datetime};
use rusqlite::params;
use std::path::Path;

/// Positions of `required` columns in `headers`.
fn column_positions(
    headers: &csv::StringRecord,
    required: &[&str],
    source: &str,
) -> Result<Vec<usize>, MosError> {
    let mut positions = Vec::with_capacity(required.len());
    let mut missing = Vec::new();
    for name in required {
        match headers.iter().position(|h| h.trim() == *name) {
            Some(p) => positions.push(p),
            None => missing.push(name.to_string()),
        }
    }
    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(MosError::MissingColumns {
            path: source.to_string(),
            missing,
        })
    }
}

fn reader(csv_data: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes())
}

impl Database {
    /// Load station metadata from CSV string.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,latitude,longitude
    /// LUG,46.0,8.96
    /// ```
    pub fn load_stations(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);
        let cols = column_positions(
            rdr.headers()?,
            &["station_id", "latitude", "longitude"],
            "station metadata",
        )?;

        let tx = conn.unchecked_transaction()?;
        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(cols[0]).unwrap_or("").trim();
            let latitude = r.get(cols[1]).and_then(|s| s.trim().parse::<f64>().ok());
            let longitude = r.get(cols[2]).and_then(|s| s.trim().parse::<f64>().ok());
            let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
                skipped += 1;
                continue;
            };
            if station_id.is_empty() {
                skipped += 1;
                continue;
            }
            tx.execute(
                "INSERT OR REPLACE INTO stations (station_id, latitude, longitude)
                 VALUES (?1, ?2, ?3)",
                params![station_id, latitude, longitude],
            )?;
            count += 1;
        }
        tx.commit()?;
        log::info!("loader: Loaded {} stations, skipped {}", count, skipped);
        Ok(count)
    }

    /// Load station observations from CSV string.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,datetime,variable,value
    /// LUG,2023-01-01 06:00:00,2t,3.4
    /// ```
    pub fn load_observations(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);
        let cols = column_positions(
            rdr.headers()?,
            &["station_id", "datetime", "variable", "value"],
            "observations",
        )?;

        let tx = conn.unchecked_transaction()?;
        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(cols[0]).unwrap_or("").trim();
            let datetime = r.get(cols[1]).and_then(|s| parse_datetime(s.trim()).ok());
            let variable = r.get(cols[2]).unwrap_or("").trim();
            let value = r.get(cols[3]).and_then(|s| s.trim().parse::<f64>().ok());

            let (Some(datetime), Some(value)) = (datetime, value) else {
                skipped += 1;
                continue;
            };
            if station_id.is_empty() || variable.is_empty() || !value.is_finite() {
                skipped += 1;
                continue;
            }
            tx.execute(
                "INSERT INTO observations (station_id, datetime, variable, value)
                 VALUES (?1, ?2, ?3, ?4)",
                params![station_id, format_datetime(&datetime), variable, value],
            )?;
            count += 1;
        }
        tx.commit()?;
        log::info!("loader: Loaded {} observations, skipped {}", count, skipped);
        Ok(count)
    }

    /// Load extracted model-grid values from CSV string.
    ///
    /// # Example CSV
    /// ```text
    /// station_id,run_datetime,lead_time,variable,value
    /// LUG,2023-01-01 00:00:00,6,2t,2.9
    /// ```
    pub fn load_model_data(&self, csv_data: &str) -> anyhow::Result<usize> {
        let conn = self.conn.borrow();
        let mut rdr = reader(csv_data);
        let cols = column_positions(
            rdr.headers()?,
            &["station_id", "run_datetime", "lead_time", "variable", "value"],
            "model data",
        )?;

        let tx = conn.unchecked_transaction()?;
        let mut count = 0usize;
        let mut skipped = 0usize;
        for result in rdr.records() {
            let r = result?;
            let station_id = r.get(cols[0]).unwrap_or("").trim();
            let run = r.get(cols[1]).and_then(|s| parse_datetime(s.trim()).ok());
            let lead_time = r.get(cols[2]).and_then(|s| s.trim().parse::<u32>().ok());
            let variable = r.get(cols[3]).unwrap_or("").trim();
            let value = r.get(cols[4]).and_then(|s| s.trim().parse::<f64>().ok());

            let (Some(run), Some(lead_time), Some(value)) = (run, lead_time, value) else {
                skipped += 1;
                continue;
            };
            if station_id.is_empty() || variable.is_empty() || !value.is_finite() {
                skipped += 1;
                continue;
            }
            tx.execute(
                "INSERT INTO model_data (station_id, run_datetime, lead_time, variable, value)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![station_id, format_datetime(&run), lead_time, variable, value],
            )?;
            count += 1;
        }
        tx.commit()?;
        log::info!("loader: Loaded {} model values, skipped {}", count, skipped);
        Ok(count)
    }

    pub fn load_stations_file(&self, path: &Path) -> anyhow::Result<usize> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading station metadata {}", path.display()))?;
        self.load_stations(&data)
    }

    pub fn load_observations_file(&self, path: &Path) -> anyhow::Result<usize> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading observations {}", path.display()))?;
        self.load_observations(&data)
    }

    pub fn load_model_data_file(&self, path: &Path) -> anyhow::Result<usize> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("reading model data {}", path.display()))?;
        self.load_model_data(&data)
    }
}
