//! Month-partitioned CSV archive of extracted model values.

use anyhow::Context;
use chrono::NaiveDate;
use mos_core::record::ModelGridRecord;
use mos_utils::dates::{format_datetime, month_key};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Accumulates extracted records run by run and writes one
/// `<dir>/<prefix>_<YYYYMM>.csv` per calendar month.
///
/// Pending records are flushed when a run from a different month arrives,
/// and once more on [`MonthlyWriter::finish`]. Runs are expected in
/// chronological order; a month that comes back after it was written is
/// appended to its existing file.
///
/// Files use the model-data CSV layout read by
/// [`Database::load_model_data`](crate::Database::load_model_data).
#[derive(Debug)]
pub struct MonthlyWriter {
    dir: PathBuf,
    prefix: String,
    pending: Vec<ModelGridRecord>,
    pending_month: Option<String>,
    written: Vec<PathBuf>,
}

impl MonthlyWriter {
    pub fn new(dir: impl Into<PathBuf>, prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.to_string(),
            pending: Vec::new(),
            pending_month: None,
            written: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Add one run's records, flushing the previous month first when
    /// `run_date` starts a new one. Returns the file flushed, if any.
    pub fn push_run(
        &mut self,
        run_date: NaiveDate,
        records: Vec<ModelGridRecord>,
    ) -> anyhow::Result<Option<PathBuf>> {
        let month = month_key(&run_date);
        let flushed = match self.pending_month.take() {
            Some(previous) if previous != month => self.flush(&previous)?,
            _ => None,
        };
        self.pending.extend(records);
        self.pending_month = Some(month);
        Ok(flushed)
    }

    /// Flush whatever is pending and return every file written.
    pub fn finish(mut self) -> anyhow::Result<Vec<PathBuf>> {
        if let Some(month) = self.pending_month.take() {
            self.flush(&month)?;
        }
        Ok(self.written)
    }

    fn flush(&mut self, month: &str) -> anyhow::Result<Option<PathBuf>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.dir.join(format!("{}_{}.csv", self.prefix, month));
        let append = self.written.contains(&path);
        write_records(&path, &self.pending, append)?;
        log::info!(
            "writer: saved {} records to {}",
            self.pending.len(),
            path.display()
        );
        self.pending.clear();
        if !append {
            self.written.push(path.clone());
        }
        Ok(Some(path))
    }
}

fn write_records(path: &Path, records: &[ModelGridRecord], append: bool) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .with_context(|| format!("writing {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    if !append {
        wtr.write_record(["station_id", "run_datetime", "lead_time", "variable", "value"])?;
    }
    for r in records {
        wtr.write_record([
            r.station_id.as_str(),
            format_datetime(&r.run_datetime).as_str(),
            r.lead_time.to_string().as_str(),
            r.variable.as_str(),
            r.value.to_string().as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
