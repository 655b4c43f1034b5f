//! Multiple linear regression with greedy forward predictor selection.

use crate::align::TrainingTable;
use crate::backend::ModelBackend;
use crate::ols;
use mos_core::model::{FittedModel, ModelKey};

/// Forward-selected least-squares backend.
#[derive(Debug, Clone)]
pub struct LinearBackend {
    min_samples: usize,
    tolerance: f64,
}

impl LinearBackend {
    pub fn new(min_samples: usize, tolerance: f64) -> Self {
        Self {
            min_samples,
            tolerance,
        }
    }

    /// Greedy forward selection over the columns of `table`.
    ///
    /// Starts from the intercept-only model (R² = 0) and repeatedly adds the
    /// candidate whose refit gives the highest R², as long as it improves
    /// the current score by at least the tolerance. Ties go to the earlier
    /// column. Returns column indices in the order they were added; empty
    /// when no candidate qualifies.
    pub fn forward_select(&self, table: &TrainingTable) -> Vec<usize> {
        let mut selected: Vec<usize> = Vec::new();
        let mut remaining: Vec<usize> = (0..table.columns.len()).collect();
        let mut current = 0.0;

        while !remaining.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (slot, &candidate) in remaining.iter().enumerate() {
                let columns: Vec<&[f64]> = selected
                    .iter()
                    .chain(std::iter::once(&candidate))
                    .map(|&c| table.values[c].as_slice())
                    .collect();
                let Some(fit) = ols::fit(&columns, &table.obs) else {
                    continue;
                };
                if best.map_or(true, |(_, score)| fit.r_squared > score) {
                    best = Some((slot, fit.r_squared));
                }
            }
            match best {
                Some((slot, score)) if score - current >= self.tolerance => {
                    selected.push(remaining.remove(slot));
                    current = score;
                }
                _ => break,
            }
        }
        selected
    }
}

impl ModelBackend for LinearBackend {
    type Model = FittedModel;

    fn name(&self) -> &'static str {
        "linear"
    }

    fn train(&self, key: &ModelKey, table: &TrainingTable) -> Option<FittedModel> {
        if table.is_empty() || table.len() < self.min_samples {
            log::debug!("{key}: {} aligned rows, need {}", table.len(), self.min_samples);
            return None;
        }

        let mut selected = self.forward_select(table);
        if selected.is_empty() {
            log::debug!("{key}: no predictor improves R² by {}", self.tolerance);
            return None;
        }
        selected.sort_unstable();

        let columns: Vec<&[f64]> = selected
            .iter()
            .map(|&c| table.values[c].as_slice())
            .collect();
        let fit = ols::fit(&columns, &table.obs)?;

        Some(FittedModel {
            station_id: key.station_id.clone(),
            lead_time: key.lead_time,
            predictand: key.predictand.clone(),
            predictor_names: selected.iter().map(|&c| table.columns[c].clone()).collect(),
            coefficients: fit.coefficients,
            intercept: fit.intercept,
            fit_score: fit.r_squared,
        })
    }
}
