//! Bagged CART regression trees.
//!
//! Each tree is grown on a bootstrap resample of the training rows with
//! variance-reduction splits over every predictor. Trees are stored as flat
//! node arenas so persisted forests stay shallow JSON.

use crate::align::TrainingTable;
use crate::backend::ModelBackend;
use crate::ols::r_squared;
use mos_core::config::ForestSettings;
use mos_core::model::{ModelKey, StationModel};
use mos_core::MosError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree; `nodes[0]` is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).copied().unwrap_or(f64::NAN);
                    at = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], at: usize) -> usize {
            match &nodes[at] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }
}

/// A fitted random forest for one station, lead time and predictand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub station_id: String,
    pub lead_time: u32,
    pub predictand: String,
    pub predictor_names: Vec<String>,
    pub trees: Vec<Tree>,
    pub fit_score: f64,
}

impl ForestModel {
    /// Check that every tree can be walked without indexing out of bounds
    /// or cycling: children must come after their parent, and split
    /// features must name a predictor.
    pub fn validate(&self) -> Result<(), MosError> {
        let invalid = |reason: String| MosError::InvalidModel {
            station_id: self.station_id.clone(),
            lead_time: self.lead_time,
            predictand: self.predictand.clone(),
            reason,
        };
        if self.predictor_names.is_empty() {
            return Err(invalid("empty predictor list".to_string()));
        }
        if self.trees.is_empty() {
            return Err(invalid("no trees".to_string()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(invalid(format!("tree {} has no nodes", t)));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                let Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } = node
                else {
                    continue;
                };
                if *feature >= self.predictor_names.len() {
                    return Err(invalid(format!(
                        "tree {} node {} feature {} out of range",
                        t, i, feature
                    )));
                }
                let in_order = |child: usize| child > i && child < tree.nodes.len();
                if !in_order(*left) || !in_order(*right) {
                    return Err(invalid(format!("tree {} node {} child out of order", t, i)));
                }
            }
        }
        Ok(())
    }
}

impl StationModel for ForestModel {
    fn key(&self) -> ModelKey {
        ModelKey::new(&self.station_id, self.lead_time, &self.predictand)
    }

    fn predictors(&self) -> &[String] {
        &self.predictor_names
    }

    fn predict(&self, predictor_values: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees
            .iter()
            .map(|tree| tree.predict(predictor_values))
            .sum::<f64>()
            / self.trees.len() as f64
    }

    fn score(&self) -> f64 {
        self.fit_score
    }
}

#[derive(Debug, Clone)]
pub struct ForestBackend {
    min_samples: usize,
    settings: ForestSettings,
}

impl ForestBackend {
    pub fn new(min_samples: usize, settings: ForestSettings) -> Self {
        Self {
            min_samples,
            settings,
        }
    }

    /// RNG seed for one model: the configured seed mixed with the key, so
    /// results do not depend on which worker trains which station.
    fn seed_for(&self, key: &ModelKey) -> u64 {
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in key.to_string().bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        self.settings.seed ^ hash
    }
}

impl ModelBackend for ForestBackend {
    type Model = ForestModel;

    fn name(&self) -> &'static str {
        "random_forest"
    }

    fn train(&self, key: &ModelKey, table: &TrainingTable) -> Option<ForestModel> {
        if table.is_empty() || table.len() < self.min_samples || table.columns.is_empty() {
            log::debug!("{key}: {} aligned rows, need {}", table.len(), self.min_samples);
            return None;
        }

        let rows: Vec<Vec<f64>> = (0..table.len()).map(|r| table.row(r)).collect();
        let mut rng = StdRng::seed_from_u64(self.seed_for(key));
        let builder = TreeBuilder {
            rows: &rows,
            y: &table.obs,
            max_depth: self.settings.max_depth,
            min_leaf: self.settings.min_samples_leaf.max(1),
        };

        let trees: Vec<Tree> = (0..self.settings.trees)
            .map(|_| {
                let sample: Vec<usize> = (0..rows.len())
                    .map(|_| rng.gen_range(0..rows.len()))
                    .collect();
                builder.grow(sample)
            })
            .collect();

        let mut model = ForestModel {
            station_id: key.station_id.clone(),
            lead_time: key.lead_time,
            predictand: key.predictand.clone(),
            predictor_names: table.columns.clone(),
            trees,
            fit_score: 0.0,
        };
        let predicted: Vec<f64> = rows.iter().map(|row| model.predict(row)).collect();
        model.fit_score = r_squared(&table.obs, &predicted);
        Some(model)
    }
}

struct TreeBuilder<'a> {
    rows: &'a [Vec<f64>],
    y: &'a [f64],
    max_depth: Option<usize>,
    min_leaf: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    /// Number of sorted samples going left.
    left_len: usize,
    sse: f64,
}

impl TreeBuilder<'_> {
    fn grow(&self, sample: Vec<usize>) -> Tree {
        let mut nodes = Vec::new();
        self.build(&mut nodes, sample, 0);
        Tree { nodes }
    }

    fn build(&self, nodes: &mut Vec<Node>, sample: Vec<usize>, depth: usize) -> usize {
        let at = nodes.len();
        let mean = sample.iter().map(|&i| self.y[i]).sum::<f64>() / sample.len() as f64;
        nodes.push(Node::Leaf { value: mean });

        let depth_left = self.max_depth.map_or(true, |max| depth < max);
        if !depth_left || sample.len() < 2 * self.min_leaf {
            return at;
        }
        let Some(split) = self.best_split(&sample) else {
            return at;
        };

        let mut ordered = sample;
        ordered.sort_by(|&a, &b| self.rows[a][split.feature].total_cmp(&self.rows[b][split.feature]));
        let right_sample = ordered.split_off(split.left_len);
        let left = self.build(nodes, ordered, depth + 1);
        let right = self.build(nodes, right_sample, depth + 1);
        nodes[at] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        at
    }

    /// Lowest total squared error split over all features, if any split
    /// reduces the node's error.
    fn best_split(&self, sample: &[usize]) -> Option<BestSplit> {
        let n = sample.len();
        let total: f64 = sample.iter().map(|&i| self.y[i]).sum();
        let total_sq: f64 = sample.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let node_sse = total_sq - total * total / n as f64;
        if node_sse <= 1e-12 {
            return None;
        }

        let features = self.rows.first().map_or(0, |r| r.len());
        let mut best: Option<BestSplit> = None;
        let mut ordered = sample.to_vec();
        for feature in 0..features {
            ordered.sort_by(|&a, &b| self.rows[a][feature].total_cmp(&self.rows[b][feature]));
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let yk = self.y[ordered[k]];
                left_sum += yk;
                left_sq += yk * yk;
                let left_len = k + 1;
                let right_len = n - left_len;
                if left_len < self.min_leaf || right_len < self.min_leaf {
                    continue;
                }
                let here = self.rows[ordered[k]][feature];
                let next = self.rows[ordered[k + 1]][feature];
                if here == next {
                    continue;
                }
                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_len as f64)
                    + (right_sq - right_sum * right_sum / right_len as f64);
                if sse < node_sse && best.as_ref().map_or(true, |b| sse < b.sse) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (here + next) / 2.0,
                        left_len,
                        sse,
                    });
                }
            }
        }
        best
    }
}
