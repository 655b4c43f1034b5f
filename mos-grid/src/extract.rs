//! Station series extraction from one model run.

use crate::grid::{GridCell, ModelGrid};
use chrono::NaiveDateTime;
use mos_core::record::ModelGridRecord;
use mos_core::MosError;
use ndarray::Array2;
use rayon::prelude::*;

/// One decoded 2-D field of a model run: a variable at one lead time.
#[derive(Debug, Clone)]
pub struct GridField {
    pub variable: String,
    pub lead_time: u32,
    pub values: Array2<f64>,
}

/// Fields grouped by variable, in order of first appearance.
fn group_by_variable(fields: &[GridField]) -> Vec<(&str, Vec<&GridField>)> {
    let mut groups: Vec<(&str, Vec<&GridField>)> = Vec::new();
    for field in fields {
        match groups.iter_mut().find(|(v, _)| *v == field.variable) {
            Some((_, group)) => group.push(field),
            None => groups.push((field.variable.as_str(), vec![field])),
        }
    }
    groups
}

fn extract_variable(
    run_datetime: NaiveDateTime,
    variable: &str,
    steps: &[&GridField],
    cells: &[(String, GridCell)],
) -> Vec<ModelGridRecord> {
    let mut records = Vec::with_capacity(cells.len() * steps.len());
    for (station_id, cell) in cells {
        for step in steps {
            let value = step.values[[cell.row, cell.col]];
            if !value.is_finite() {
                log::debug!(
                    "extract: {} lt {} non-finite at station {}, skipped",
                    variable,
                    step.lead_time,
                    station_id
                );
                continue;
            }
            records.push(ModelGridRecord {
                station_id: station_id.clone(),
                run_datetime,
                lead_time: step.lead_time,
                variable: variable.to_string(),
                value,
            });
        }
    }
    records
}

/// Extract every field of a model run at the resolved station cells.
///
/// Variables are extracted in parallel; each task reads the shared
/// fields and cells and produces its own record set. Results are
/// concatenated in variable order, stations then lead times within a
/// variable. Non-finite grid values are dropped.
pub fn extract_run(
    grid: &ModelGrid,
    run_datetime: NaiveDateTime,
    fields: &[GridField],
    cells: &[(String, GridCell)],
) -> Result<Vec<ModelGridRecord>, MosError> {
    for field in fields {
        if field.values.dim() != grid.shape() {
            return Err(MosError::ShapeMismatch {
                grid: grid.id().to_string(),
                detail: format!(
                    "field {} lt {} is {:?}, grid is {:?}",
                    field.variable,
                    field.lead_time,
                    field.values.dim(),
                    grid.shape()
                ),
            });
        }
    }

    let groups = group_by_variable(fields);
    let per_variable: Vec<Vec<ModelGridRecord>> = groups
        .par_iter()
        .map(|(variable, steps)| extract_variable(run_datetime, variable, steps, cells))
        .collect();
    let records: Vec<ModelGridRecord> = per_variable.into_iter().flatten().collect();
    log::info!(
        "extract: run {} -> {} records ({} variables, {} stations)",
        run_datetime,
        records.len(),
        groups.len(),
        cells.len()
    );
    Ok(records)
}
