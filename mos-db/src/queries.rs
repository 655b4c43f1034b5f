//! Query methods for retrieving station and model data from the database.
//!
//! [`Database::select`] is the generic access path: equality and range
//! filters over a whitelisted table, returning column-name keyed records.
//! The typed queries below are thin conversions of its results.

use crate::Database;
use anyhow::{anyhow, bail};
use chrono::NaiveDateTime;
use mos_core::date_range::HistoryRange;
use mos_core::record::{ModelGridRecord, ObservationRecord};
use mos_core::source::HistorySource;
use mos_core::station::Station;
use mos_utils::dates::{format_datetime, parse_datetime};
use rusqlite::params_from_iter;
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// One selected row keyed by column name.
pub type Record = BTreeMap<String, Value>;

/// A filter on a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter<'a> {
    /// `column = value`
    Eq(&'a str, Value),
    /// `column BETWEEN low AND high`, both ends inclusive.
    Between(&'a str, Value, Value),
}

impl Filter<'_> {
    fn column(&self) -> &str {
        match self {
            Filter::Eq(column, _) | Filter::Between(column, _, _) => column,
        }
    }
}

fn table_columns(table: &str) -> Option<&'static [&'static str]> {
    match table {
        "stations" => Some(&["station_id", "latitude", "longitude"]),
        "observations" => Some(&["station_id", "datetime", "variable", "value"]),
        "model_data" => Some(&["station_id", "run_datetime", "lead_time", "variable", "value"]),
        _ => None,
    }
}

fn datetime_value(dt: &NaiveDateTime) -> Value {
    Value::Text(format_datetime(dt))
}

fn text(record: &Record, column: &str) -> anyhow::Result<String> {
    match record.get(column) {
        Some(Value::Text(s)) => Ok(s.clone()),
        other => Err(anyhow!("column {} is not text: {:?}", column, other)),
    }
}

fn real(record: &Record, column: &str) -> anyhow::Result<f64> {
    match record.get(column) {
        Some(Value::Real(v)) => Ok(*v),
        Some(Value::Integer(v)) => Ok(*v as f64),
        other => Err(anyhow!("column {} is not numeric: {:?}", column, other)),
    }
}

fn integer(record: &Record, column: &str) -> anyhow::Result<i64> {
    match record.get(column) {
        Some(Value::Integer(v)) => Ok(*v),
        other => Err(anyhow!("column {} is not an integer: {:?}", column, other)),
    }
}

fn to_model_record(record: &Record) -> anyhow::Result<ModelGridRecord> {
    Ok(ModelGridRecord {
        station_id: text(record, "station_id")?,
        run_datetime: parse_datetime(&text(record, "run_datetime")?)?,
        lead_time: u32::try_from(integer(record, "lead_time")?)?,
        variable: text(record, "variable")?,
        value: real(record, "value")?,
    })
}

fn to_observation(record: &Record) -> anyhow::Result<ObservationRecord> {
    Ok(ObservationRecord {
        station_id: text(record, "station_id")?,
        datetime: parse_datetime(&text(record, "datetime")?)?,
        variable: text(record, "variable")?,
        value: real(record, "value")?,
    })
}

impl Database {
    // ───────────────────── Generic Select ─────────────────────

    /// Select every column of `table` for rows matching all `filters`.
    ///
    /// Rows come back in load order. Unknown tables or columns are errors.
    pub fn select(&self, table: &str, filters: &[Filter]) -> anyhow::Result<Vec<Record>> {
        let Some(columns) = table_columns(table) else {
            bail!("unknown table {}", table);
        };

        let mut clauses = Vec::with_capacity(filters.len());
        let mut values: Vec<&Value> = Vec::new();
        for filter in filters {
            if !columns.contains(&filter.column()) {
                bail!("unknown column {} in table {}", filter.column(), table);
            }
            match filter {
                Filter::Eq(column, value) => {
                    values.push(value);
                    clauses.push(format!("{} = ?{}", column, values.len()));
                }
                Filter::Between(column, low, high) => {
                    values.push(low);
                    values.push(high);
                    clauses.push(format!(
                        "{} BETWEEN ?{} AND ?{}",
                        column,
                        values.len() - 1,
                        values.len()
                    ));
                }
            }
        }

        let mut sql = format!("SELECT {} FROM {}", columns.join(", "), table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY rowid");

        let conn = self.conn.borrow();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                let mut record = Record::new();
                for (i, column) in columns.iter().enumerate() {
                    record.insert(column.to_string(), row.get::<_, Value>(i)?);
                }
                Ok(record)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("query: select from {} returned {} records", table, rows.len());
        Ok(rows)
    }

    // ───────────────────── Station Queries ─────────────────────

    pub fn query_stations(&self) -> anyhow::Result<Vec<Station>> {
        let stations = self
            .select("stations", &[])?
            .iter()
            .map(|r| {
                Ok(Station {
                    station_id: text(r, "station_id")?,
                    latitude: real(r, "latitude")?,
                    longitude: real(r, "longitude")?,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!("query: query_stations returned {} records", stations.len());
        Ok(stations)
    }

    /// Observations of `variable` with datetime inside `range`.
    pub fn query_station_history(
        &self,
        variable: &str,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ObservationRecord>> {
        let records = self
            .select(
                "observations",
                &[
                    Filter::Eq("variable", Value::Text(variable.to_string())),
                    Filter::Between(
                        "datetime",
                        datetime_value(&range.start),
                        datetime_value(&range.end),
                    ),
                ],
            )?
            .iter()
            .map(to_observation)
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!(
            "query: query_station_history({}) returned {} records",
            variable,
            records.len()
        );
        Ok(records)
    }

    // ───────────────────── Model Queries ─────────────────────

    /// Model values for `lead_time` from runs initialised inside `range`.
    pub fn query_model_history(
        &self,
        lead_time: u32,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ModelGridRecord>> {
        let records = self
            .select(
                "model_data",
                &[
                    Filter::Eq("lead_time", Value::Integer(i64::from(lead_time))),
                    Filter::Between(
                        "run_datetime",
                        datetime_value(&range.start),
                        datetime_value(&range.end),
                    ),
                ],
            )?
            .iter()
            .map(to_model_record)
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!(
            "query: query_model_history(lt {}) returned {} records",
            lead_time,
            records.len()
        );
        Ok(records)
    }

    /// All model values of one run, every lead time.
    pub fn query_model_run(&self, run_datetime: &NaiveDateTime) -> anyhow::Result<Vec<ModelGridRecord>> {
        let records = self
            .select(
                "model_data",
                &[Filter::Eq("run_datetime", datetime_value(run_datetime))],
            )?
            .iter()
            .map(to_model_record)
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!(
            "query: query_model_run({}) returned {} records",
            format_datetime(run_datetime),
            records.len()
        );
        Ok(records)
    }
}

impl HistorySource for Database {
    fn model_history(
        &self,
        lead_time: u32,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ModelGridRecord>> {
        self.query_model_history(lead_time, range)
    }

    fn station_history(
        &self,
        variable: &str,
        range: &HistoryRange,
    ) -> anyhow::Result<Vec<ObservationRecord>> {
        self.query_station_history(variable, range)
    }
}
