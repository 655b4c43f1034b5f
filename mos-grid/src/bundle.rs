//! JSON interchange form of one already-decoded model run.
//!
//! ```json
//! {
//!   "grid_id": "cosmo-2i",
//!   "run_datetime": "2024-02-01 00:00:00",
//!   "projection": {"kind": "rotated_pole", "pole_latitude": 47.0, "pole_longitude": -168.0},
//!   "x": [-3.0, -2.975],
//!   "y": [-1.0, -0.975],
//!   "land_sea_mask": [[0.0, 1.0], [1.0, 1.0]],
//!   "fields": [{"variable": "2t", "lead_time": 0, "values": [[280.1, 281.0], [279.5, 280.2]]}]
//! }
//! ```

use crate::extract::GridField;
use crate::grid::ModelGrid;
use crate::projection::Projection;
use anyhow::Context;
use chrono::NaiveDateTime;
use ndarray::Array2;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RawField {
    variable: String,
    lead_time: u32,
    values: Vec<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RawBundle {
    grid_id: String,
    run_datetime: String,
    projection: Projection,
    x: Vec<f64>,
    y: Vec<f64>,
    land_sea_mask: Vec<Vec<f64>>,
    fields: Vec<RawField>,
}

/// A decoded model run: its grid and every field it carries.
#[derive(Debug)]
pub struct GridBundle {
    pub grid: ModelGrid,
    pub run_datetime: NaiveDateTime,
    pub fields: Vec<GridField>,
}

fn to_array(rows: Vec<Vec<f64>>, what: &str) -> anyhow::Result<Array2<f64>> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        anyhow::bail!("{}: rows have different lengths", what);
    }
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Ok(Array2::from_shape_vec((n_rows, n_cols), flat)?)
}

impl GridBundle {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let raw: RawBundle = serde_json::from_str(json)?;
        let run_datetime = mos_utils::dates::parse_datetime(&raw.run_datetime)?;
        let mask = to_array(raw.land_sea_mask, "land_sea_mask")?;
        let grid = ModelGrid::new(&raw.grid_id, raw.projection, raw.x, raw.y, mask)?;
        let fields = raw
            .fields
            .into_iter()
            .map(|f| -> anyhow::Result<GridField> {
                let values = to_array(f.values, &f.variable)?;
                Ok(GridField {
                    variable: f.variable,
                    lead_time: f.lead_time,
                    values,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            grid,
            run_datetime,
            fields,
        })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading grid bundle {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing grid bundle {}", path.display()))
    }
}
