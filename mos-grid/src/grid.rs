use crate::projection::Projection;
use mos_core::MosError;
use ndarray::Array2;

/// Land/sea mask values at or above this are land.
pub const LAND: f64 = 1.0;

/// (row, col) position of a cell in a model grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

/// A model grid definition: native axes, projection and land/sea mask.
///
/// Rows follow the `y` axis and columns the `x` axis. Construction fails
/// when the mask shape disagrees with the axes or when the mask has no
/// land cell at all, so every `ModelGrid` can resolve any station.
#[derive(Debug, Clone)]
pub struct ModelGrid {
    id: String,
    projection: Projection,
    x: Vec<f64>,
    y: Vec<f64>,
    land_sea_mask: Array2<f64>,
    land_cells: Vec<GridCell>,
}

impl ModelGrid {
    pub fn new(
        id: &str,
        projection: Projection,
        x: Vec<f64>,
        y: Vec<f64>,
        land_sea_mask: Array2<f64>,
    ) -> Result<Self, MosError> {
        if land_sea_mask.dim() != (y.len(), x.len()) {
            return Err(MosError::ShapeMismatch {
                grid: id.to_string(),
                detail: format!(
                    "mask is {:?} but axes are {} rows x {} cols",
                    land_sea_mask.dim(),
                    y.len(),
                    x.len()
                ),
            });
        }
        // Row-major order: the masked nearest-neighbour search returns the
        // first cell found at minimum distance.
        let land_cells: Vec<GridCell> = land_sea_mask
            .indexed_iter()
            .filter(|(_, value)| **value >= LAND)
            .map(|((row, col), _)| GridCell { row, col })
            .collect();
        if land_cells.is_empty() {
            return Err(MosError::NoLandCells {
                grid: id.to_string(),
            });
        }
        log::debug!(
            "grid {}: {} x {} cells, {} land",
            id,
            y.len(),
            x.len(),
            land_cells.len()
        );
        Ok(Self {
            id: id.to_string(),
            projection,
            x,
            y,
            land_sea_mask,
            land_cells,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.land_sea_mask.dim()
    }

    pub fn mask_value(&self, cell: GridCell) -> f64 {
        self.land_sea_mask[[cell.row, cell.col]]
    }

    pub fn is_land(&self, cell: GridCell) -> bool {
        self.mask_value(cell) >= LAND
    }

    pub fn land_cells(&self) -> &[GridCell] {
        &self.land_cells
    }
}
