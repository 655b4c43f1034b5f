//! Shared utility functions for MOS crates.

/// Date utility functions
pub mod dates {
    use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

    /// Canonical datetime format used in CSV files and SQLite text columns.
    ///
    /// Lexicographic order of strings in this format matches chronological
    /// order, which the range queries rely on.
    pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Alternate ISO 8601 form accepted on input.
    pub const DATETIME_FORMAT_ISO: &str = "%Y-%m-%dT%H:%M:%S";

    /// Format a NaiveDateTime as "YYYY-MM-DD HH:MM:SS"
    pub fn format_datetime(dt: &NaiveDateTime) -> String {
        dt.format(DATETIME_FORMAT).to_string()
    }

    /// Parse a datetime in "YYYY-MM-DD HH:MM:SS" or "YYYY-MM-DDTHH:MM:SS" format.
    ///
    /// A bare "YYYY-MM-DD" date is read as midnight.
    pub fn parse_datetime(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
            return Ok(dt);
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT_ISO) {
            return Ok(dt);
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("invalid datetime '{}': {}", s, e))?;
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid datetime '{}'", s))
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?)
    }

    /// Valid time of a forecast: model run initialisation plus lead time hours.
    pub fn valid_time(run_datetime: &NaiveDateTime, lead_time: u32) -> NaiveDateTime {
        *run_datetime + Duration::hours(i64::from(lead_time))
    }

    /// "YYYYMM" key of the month containing `date`.
    pub fn month_key(date: &NaiveDate) -> String {
        format!("{:04}{:02}", date.year(), date.month())
    }

}
