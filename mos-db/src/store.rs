//! Persisted model sets.
//!
//! Linear models are stored as CSV with one row per (station, lead time,
//! predictand):
//!
//! ```text
//! station_id,lead_time,predictand,predictors,coefs,intercept,score
//! LUG,6,2t,"[""10u"",""2t""]","[0.41,0.93]",1.02,0.91
//! ```
//!
//! `predictors` and `coefs` are JSON arrays so their order survives. Floats
//! are written in shortest round-trip form, so a reload is bit-identical.
//! Random-forest models are stored as a JSON array of [`ForestModel`].

use anyhow::Context;
use mos_core::model::FittedModel;
use mos_core::MosError;
use mos_model::ForestModel;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Columns every persisted linear model file must carry.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "station_id",
    "lead_time",
    "predictand",
    "predictors",
    "coefs",
    "intercept",
    "score",
];

#[derive(Debug, Serialize, Deserialize)]
struct StoredModel {
    station_id: String,
    lead_time: u32,
    predictand: String,
    predictors: String,
    coefs: String,
    intercept: f64,
    score: f64,
}

impl StoredModel {
    fn from_model(model: &FittedModel) -> anyhow::Result<Self> {
        Ok(Self {
            station_id: model.station_id.clone(),
            lead_time: model.lead_time,
            predictand: model.predictand.clone(),
            predictors: serde_json::to_string(&model.predictor_names)?,
            coefs: serde_json::to_string(&model.coefficients)?,
            intercept: model.intercept,
            score: model.fit_score,
        })
    }

    fn into_model(self) -> anyhow::Result<FittedModel> {
        let invalid = |reason: String| MosError::InvalidModel {
            station_id: self.station_id.clone(),
            lead_time: self.lead_time,
            predictand: self.predictand.clone(),
            reason,
        };
        let predictor_names: Vec<String> = serde_json::from_str(&self.predictors)
            .map_err(|e| invalid(format!("predictors: {}", e)))?;
        let coefficients: Vec<f64> = serde_json::from_str(&self.coefs)
            .map_err(|e| invalid(format!("coefs: {}", e)))?;
        if predictor_names.is_empty() {
            return Err(invalid("empty predictor list".to_string()).into());
        }
        if predictor_names.len() != coefficients.len() {
            return Err(invalid(format!(
                "{} predictors but {} coefficients",
                predictor_names.len(),
                coefficients.len()
            ))
            .into());
        }
        Ok(FittedModel {
            station_id: self.station_id,
            lead_time: self.lead_time,
            predictand: self.predictand,
            predictor_names,
            coefficients,
            intercept: self.intercept,
            fit_score: self.score,
        })
    }
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// A persisted model set at one path.
#[derive(Debug, Clone)]
pub struct ModelStore {
    path: PathBuf,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write linear models, replacing any existing file.
    pub fn save(&self, models: &[FittedModel]) -> anyhow::Result<()> {
        create_parent(&self.path)?;
        let mut wtr = csv::Writer::from_path(&self.path)
            .with_context(|| format!("writing models to {}", self.path.display()))?;
        for model in models {
            wtr.serialize(StoredModel::from_model(model)?)?;
        }
        wtr.flush()?;
        log::info!("store: saved {} models to {}", models.len(), self.path.display());
        Ok(())
    }

    /// Read linear models back in file order.
    ///
    /// Fails with [`MosError::MissingColumns`] when any required column is
    /// absent and [`MosError::InvalidModel`] for a malformed row.
    pub fn load(&self) -> anyhow::Result<Vec<FittedModel>> {
        let mut rdr = csv::Reader::from_path(&self.path)
            .with_context(|| format!("reading models from {}", self.path.display()))?;
        let headers = rdr.headers()?.clone();
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !headers.iter().any(|h| h == **c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(MosError::MissingColumns {
                path: self.path.display().to_string(),
                missing,
            }
            .into());
        }

        let models = rdr
            .deserialize::<StoredModel>()
            .map(|row| row.map_err(anyhow::Error::from).and_then(StoredModel::into_model))
            .collect::<anyhow::Result<Vec<_>>>()?;
        log::info!("store: loaded {} models from {}", models.len(), self.path.display());
        Ok(models)
    }

    /// Write random-forest models as a JSON array.
    pub fn save_forests(&self, models: &[ForestModel]) -> anyhow::Result<()> {
        create_parent(&self.path)?;
        let file = File::create(&self.path)
            .with_context(|| format!("writing models to {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, models)?;
        writer.flush()?;
        log::info!("store: saved {} forests to {}", models.len(), self.path.display());
        Ok(())
    }

    /// Load persisted forests, rejecting any tree that could not be walked
    /// safely with [`MosError::InvalidModel`].
    pub fn load_forests(&self) -> anyhow::Result<Vec<ForestModel>> {
        let file = File::open(&self.path)
            .with_context(|| format!("reading models from {}", self.path.display()))?;
        let models: Vec<ForestModel> = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing forests in {}", self.path.display()))?;
        for model in &models {
            model.validate()?;
        }
        log::info!("store: loaded {} forests from {}", models.len(), self.path.display());
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mos_model::forest::{Node, Tree};

    fn temp_path(name: &str, file: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("mos-store-{}-{}", name, std::process::id()))
            .join(file)
    }

    fn model(station: &str, predictors: &[&str], coefficients: Vec<f64>) -> FittedModel {
        FittedModel {
            station_id: station.to_string(),
            lead_time: 6,
            predictand: "2t".to_string(),
            predictor_names: predictors.iter().map(|p| p.to_string()).collect(),
            coefficients,
            intercept: 1.0 / 3.0,
            fit_score: 0.1 + 0.2,
        }
    }

    #[test]
    fn save_then_load_is_bit_identical() {
        let path = temp_path("roundtrip", "models.csv");
        let store = ModelStore::new(&path);
        let models = vec![
            model("LUG", &["2t", "10u", "tp"], vec![0.1 + 0.2, -2.5e17, 1e-300]),
            model("OTL", &["2t"], vec![f64::MIN_POSITIVE]),
        ];
        store.save(&models).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), 2);
        for (a, b) in models.iter().zip(&loaded) {
            assert_eq!(a.predictor_names, b.predictor_names);
            assert_eq!(a.intercept.to_bits(), b.intercept.to_bits());
            assert_eq!(a.fit_score.to_bits(), b.fit_score.to_bits());
            let bits = |m: &FittedModel| m.coefficients.iter().map(|c| c.to_bits()).collect::<Vec<_>>();
            assert_eq!(bits(a), bits(b));
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_lists_missing_columns() {
        let path = temp_path("missing", "models.csv");
        create_parent(&path).unwrap();
        std::fs::write(&path, "station_id,lead_time,predictand,predictors,intercept\n").unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();
        match err.downcast_ref::<MosError>() {
            Some(MosError::MissingColumns { missing, .. }) => {
                assert_eq!(missing, &vec!["coefs".to_string(), "score".to_string()]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("coefs, score"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_mismatched_coefficients() {
        let path = temp_path("mismatch", "models.csv");
        create_parent(&path).unwrap();
        std::fs::write(
            &path,
            "station_id,lead_time,predictand,predictors,coefs,intercept,score\n\
             LUG,6,2t,\"[\"\"2t\"\",\"\"10u\"\"]\",[0.5],0.0,0.9\n",
        )
        .unwrap();

        let err = ModelStore::new(&path).load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MosError>(),
            Some(MosError::InvalidModel { .. })
        ));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_empty_predictor_list() {
        let path = temp_path("empty", "models.csv");
        create_parent(&path).unwrap();
        std::fs::write(
            &path,
            "station_id,lead_time,predictand,predictors,coefs,intercept,score\n\
             LUG,6,2t,[],[],0.0,0.9\n",
        )
        .unwrap();
        assert!(ModelStore::new(&path).load().is_err());
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn forests_round_trip() {
        let path = temp_path("forest", "forests.json");
        let store = ModelStore::new(&path);
        let forest = ForestModel {
            station_id: "LUG".to_string(),
            lead_time: 12,
            predictand: "2t".to_string(),
            predictor_names: vec!["2t".to_string()],
            trees: vec![Tree {
                nodes: vec![
                    Node::Split {
                        feature: 0,
                        threshold: 0.5,
                        left: 1,
                        right: 2,
                    },
                    Node::Leaf { value: -1.0 / 3.0 },
                    Node::Leaf { value: 2.0 },
                ],
            }],
            fit_score: 0.75,
        };
        store.save_forests(std::slice::from_ref(&forest)).unwrap();
        assert_eq!(store.load_forests().unwrap(), vec![forest]);
        std::fs::remove_file(&path).ok();
    }

    fn load_forest_json(name: &str, predictors: &str, trees: &str) -> anyhow::Result<Vec<ForestModel>> {
        let path = temp_path(name, "forests.json");
        create_parent(&path)?;
        std::fs::write(
            &path,
            format!(
                r#"[{{"station_id":"LUG","lead_time":6,"predictand":"2t","predictor_names":{},"trees":{},"fit_score":0.5}}]"#,
                predictors, trees
            ),
        )?;
        let loaded = ModelStore::new(&path).load_forests();
        std::fs::remove_file(&path).ok();
        loaded
    }

    fn invalid_reason(result: anyhow::Result<Vec<ForestModel>>) -> String {
        let err = result.unwrap_err();
        match err.downcast_ref::<MosError>() {
            Some(MosError::InvalidModel { reason, .. }) => reason.clone(),
            other => panic!("expected InvalidModel, got {:?}", other),
        }
    }

    const SPLIT_TREE: &str = r#"[{"nodes":[{"split":{"feature":0,"threshold":0.5,"left":1,"right":2}},{"leaf":{"value":1.0}},{"leaf":{"value":2.0}}]}]"#;

    #[test]
    fn well_formed_forest_json_loads() {
        let loaded = load_forest_json("forest-ok", r#"["2t"]"#, SPLIT_TREE).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].trees[0].nodes.len(), 3);
    }

    #[test]
    fn load_forests_rejects_empty_predictor_list() {
        let reason = invalid_reason(load_forest_json("forest-nopred", "[]", SPLIT_TREE));
        assert_eq!(reason, "empty predictor list");
    }

    #[test]
    fn load_forests_rejects_forest_without_trees() {
        let reason = invalid_reason(load_forest_json("forest-notrees", r#"["2t"]"#, "[]"));
        assert_eq!(reason, "no trees");
    }

    #[test]
    fn load_forests_rejects_tree_without_nodes() {
        let reason = invalid_reason(load_forest_json(
            "forest-nonodes",
            r#"["2t"]"#,
            r#"[{"nodes":[]}]"#,
        ));
        assert_eq!(reason, "tree 0 has no nodes");
    }

    #[test]
    fn load_forests_rejects_child_index_past_the_end() {
        let reason = invalid_reason(load_forest_json(
            "forest-oob",
            r#"["2t"]"#,
            r#"[{"nodes":[{"split":{"feature":0,"threshold":0.5,"left":5,"right":6}}]}]"#,
        ));
        assert_eq!(reason, "tree 0 node 0 child out of order");
    }

    #[test]
    fn load_forests_rejects_child_pointing_back_to_its_parent() {
        let reason = invalid_reason(load_forest_json(
            "forest-cycle",
            r#"["2t"]"#,
            r#"[{"nodes":[{"split":{"feature":0,"threshold":0.5,"left":0,"right":1}},{"leaf":{"value":1.0}}]}]"#,
        ));
        assert_eq!(reason, "tree 0 node 0 child out of order");
    }

    #[test]
    fn load_forests_rejects_feature_out_of_range() {
        let reason = invalid_reason(load_forest_json(
            "forest-feature",
            r#"["2t"]"#,
            r#"[{"nodes":[{"split":{"feature":3,"threshold":0.5,"left":1,"right":2}},{"leaf":{"value":1.0}},{"leaf":{"value":2.0}}]}]"#,
        ));
        assert_eq!(reason, "tree 0 node 0 feature 3 out of range");
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let store = ModelStore::new("/nonexistent/models.csv");
        assert!(store.load().is_err());
    }
}
