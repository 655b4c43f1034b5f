//! SQL schema definitions for the in-memory SQLite database.
//!
//! Datetimes are stored as `YYYY-MM-DD HH:MM:SS` text, which sorts
//! chronologically, so range filters are plain `BETWEEN` comparisons.

/// Returns the full SQL schema as a single batch string.
///
/// - `stations` - station_id, latitude, longitude
/// - `observations` - station_id, datetime, variable, value
/// - `model_data` - station_id, run_datetime, lead_time (hours), variable, value
///
/// Observation and model tables keep duplicate rows as loaded; consumers
/// decide which of them wins.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS stations (
        station_id TEXT PRIMARY KEY,
        latitude REAL NOT NULL,
        longitude REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS observations (
        station_id TEXT NOT NULL,
        datetime TEXT NOT NULL,
        variable TEXT NOT NULL,
        value REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_obs_variable_datetime ON observations(variable, datetime);
    CREATE INDEX IF NOT EXISTS idx_obs_station ON observations(station_id);

    CREATE TABLE IF NOT EXISTS model_data (
        station_id TEXT NOT NULL,
        run_datetime TEXT NOT NULL,
        lead_time INTEGER NOT NULL,
        variable TEXT NOT NULL,
        value REAL NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_model_lead_run ON model_data(lead_time, run_datetime);
    CREATE INDEX IF NOT EXISTS idx_model_run ON model_data(run_datetime);
    CREATE INDEX IF NOT EXISTS idx_model_station ON model_data(station_id);
    "#
}
