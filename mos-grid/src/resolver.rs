//! Station to grid-cell resolution.
//!
//! Two stages, in this order:
//!
//! 1. Project the station into the grid's native axes and pick the nearest
//!    column on `x` and, independently, the nearest row on `y`.
//! 2. If that cell is not land, replace it with the nearest land cell in
//!    (row, col) index space. Ties keep the first land cell in row-major
//!    order.
//!
//! This is not a 2-D nearest neighbour over all cells and must not be
//! turned into one: a single 2-D search can pick a different cell whenever
//! the per-axis cell is at sea.

use crate::grid::{GridCell, ModelGrid};
use mos_core::station::Station;
use std::collections::HashMap;

/// Index of the value closest to `target`; the first one on ties.
fn nearest_index(axis: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, value) in axis.iter().enumerate() {
        let distance = (value - target).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}

/// Nearest land cell to `cell`, by squared Euclidean distance in index space.
fn nearest_land_cell(grid: &ModelGrid, cell: GridCell) -> GridCell {
    let mut best = grid.land_cells()[0];
    let mut best_distance = u64::MAX;
    for candidate in grid.land_cells() {
        let dr = candidate.row.abs_diff(cell.row) as u64;
        let dc = candidate.col.abs_diff(cell.col) as u64;
        let distance = dr * dr + dc * dc;
        if distance < best_distance {
            best = *candidate;
            best_distance = distance;
        }
    }
    best
}

/// Resolve a geographic coordinate to the land cell of `grid` it reads from.
///
/// Pure: the same inputs always give the same cell, and the cell is
/// always land.
pub fn resolve_coordinate(grid: &ModelGrid, latitude: f64, longitude: f64) -> GridCell {
    let (x, y) = grid.projection().project(latitude, longitude);
    let cell = GridCell {
        row: nearest_index(grid.y(), y),
        col: nearest_index(grid.x(), x),
    };
    if grid.is_land(cell) {
        cell
    } else {
        let corrected = nearest_land_cell(grid, cell);
        log::debug!(
            "grid {}: cell ({}, {}) is not land, using ({}, {})",
            grid.id(),
            cell.row,
            cell.col,
            corrected.row,
            corrected.col
        );
        corrected
    }
}

/// Caches resolved cells per (station, grid) pair.
#[derive(Debug, Default)]
pub struct GridPointResolver {
    cache: HashMap<(String, String), GridCell>,
}

impl GridPointResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell `station` reads its values from in `grid`.
    pub fn resolve(&mut self, station: &Station, grid: &ModelGrid) -> GridCell {
        let key = (station.station_id.clone(), grid.id().to_string());
        *self.cache.entry(key).or_insert_with(|| {
            resolve_coordinate(grid, station.latitude, station.longitude)
        })
    }

    /// Resolve every station, returning `(station_id, cell)` in input order.
    pub fn resolve_all(&mut self, stations: &[Station], grid: &ModelGrid) -> Vec<(String, GridCell)> {
        stations
            .iter()
            .map(|station| (station.station_id.clone(), self.resolve(station, grid)))
            .collect()
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
