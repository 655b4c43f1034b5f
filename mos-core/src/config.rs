//! Run configuration, loaded once from JSON and validated before any work.

use crate::date_range::HistoryRange;
use crate::error::MosError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

/// Minimum aligned rows a training table needs before a model is fitted.
pub const DEFAULT_MIN_SAMPLES: usize = 850;
/// Minimum raw station records of the predictand before alignment is tried.
pub const DEFAULT_MIN_HISTORY: usize = 365;
/// Minimum R² gain for forward selection to accept another predictor.
pub const DEFAULT_TOLERANCE: f64 = 0.02;
pub const DEFAULT_WORKERS: usize = 6;

/// Top-level configuration of a MOS run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MosConfig {
    /// Lead times (hours) to train and forecast.
    pub lead_times: Vec<u32>,
    /// Variables to train models for.
    pub predictands: Vec<String>,
    /// Candidate predictors; `None` offers every model variable in the aligned table.
    #[serde(default)]
    pub predictors: Option<Vec<String>>,
    /// Station metadata CSV (`station_id,latitude,longitude`).
    pub station_metadata: PathBuf,
    /// Observation CSV files (`station_id,datetime,variable,value`).
    pub observations: Vec<PathBuf>,
    /// Extracted model-grid CSV files (`station_id,run_datetime,lead_time,variable,value`).
    pub model_data: Vec<PathBuf>,
    /// Where fitted models are written by training and read by forecasting.
    pub models_path: PathBuf,
    pub training: TrainingSettings,
    #[serde(default)]
    pub backend: BackendKind,
    #[serde(default)]
    pub forecast_output: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingSettings {
    #[serde(deserialize_with = "de_datetime")]
    pub start: NaiveDateTime,
    #[serde(deserialize_with = "de_datetime")]
    pub end: NaiveDateTime,
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    #[serde(default = "default_min_history")]
    pub min_history: usize,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl TrainingSettings {
    pub fn history_range(&self) -> HistoryRange {
        HistoryRange::new(self.start, self.end)
    }
}

/// Which model backend training uses.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Linear,
    RandomForest(ForestSettings),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForestSettings {
    #[serde(default = "default_trees")]
    pub trees: usize,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for ForestSettings {
    fn default() -> Self {
        Self {
            trees: default_trees(),
            max_depth: None,
            min_samples_leaf: default_min_samples_leaf(),
            seed: default_seed(),
        }
    }
}

fn default_min_samples() -> usize {
    DEFAULT_MIN_SAMPLES
}
fn default_min_history() -> usize {
    DEFAULT_MIN_HISTORY
}
fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE
}
fn default_workers() -> usize {
    DEFAULT_WORKERS
}
fn default_trees() -> usize {
    100
}
fn default_min_samples_leaf() -> usize {
    1
}
fn default_seed() -> u64 {
    42
}

fn de_datetime<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    mos_utils::dates::parse_datetime(&raw).map_err(serde::de::Error::custom)
}

impl MosConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: MosConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), MosError> {
        let fail = |msg: &str| Err(MosError::InvalidConfig(msg.to_string()));
        if self.lead_times.is_empty() {
            return fail("lead_times must not be empty");
        }
        if self.predictands.is_empty() {
            return fail("predictands must not be empty");
        }
        if let Some(predictors) = &self.predictors {
            if predictors.is_empty() {
                return fail("predictors, when given, must not be empty");
            }
        }
        let training = &self.training;
        if training.start >= training.end {
            return fail("training.start must be before training.end");
        }
        if !(training.tolerance > 0.0 && training.tolerance < 1.0) {
            return fail("training.tolerance must be in (0, 1)");
        }
        if training.min_samples == 0 {
            return fail("training.min_samples must be at least 1");
        }
        if training.workers == 0 {
            return fail("training.workers must be at least 1");
        }
        if let BackendKind::RandomForest(forest) = &self.backend {
            if forest.trees == 0 {
                return fail("backend.trees must be at least 1");
            }
            if forest.min_samples_leaf == 0 {
                return fail("backend.min_samples_leaf must be at least 1");
            }
        }
        Ok(())
    }
}

/// Load and validate a configuration file in JSON format.
pub fn load_config(config_file: &Path) -> anyhow::Result<MosConfig> {
    if !config_file.exists() {
        anyhow::bail!("{} does not exist.", config_file.display());
    }
    let json = std::fs::read_to_string(config_file)?;
    let config = MosConfig::from_json(&json)
        .map_err(|e| anyhow::anyhow!("{}: {}", config_file.display(), e))?;
    log::info!(
        "config: {} lead times, predictands {:?}, backend {:?}",
        config.lead_times.len(),
        config.predictands,
        config.backend
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "lead_times": [0, 1, 2],
        "predictands": ["2t"],
        "station_metadata": "stations.csv",
        "observations": ["obs.csv"],
        "model_data": ["model_202301.csv"],
        "models_path": "regressions.csv",
        "training": {"start": "2020-02-01 00:00:00", "end": "2023-02-01"}
    }"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = MosConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.lead_times, vec![0, 1, 2]);
        assert_eq!(config.backend, BackendKind::Linear);
        assert_eq!(config.training.min_samples, 850);
        assert_eq!(config.training.min_history, 365);
        assert!((config.training.tolerance - 0.02).abs() < f64::EPSILON);
        assert_eq!(config.training.workers, 6);
        assert!(config.predictors.is_none());
    }

    #[test]
    fn test_missing_required_key_fails() {
        let json = MINIMAL.replace("\"predictands\": [\"2t\"],", "");
        let err = MosConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("predictands"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let json = MINIMAL.replace("\"lead_times\"", "\"lead_tims\": [], \"lead_times\"");
        assert!(MosConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_forest_backend() {
        let json = MINIMAL.replace(
            "\"training\"",
            "\"backend\": {\"kind\": \"random_forest\", \"trees\": 10}, \"training\"",
        );
        let config = MosConfig::from_json(&json).unwrap();
        match config.backend {
            BackendKind::RandomForest(forest) => {
                assert_eq!(forest.trees, 10);
                assert_eq!(forest.seed, 42);
                assert_eq!(forest.max_depth, None);
            }
            other => panic!("unexpected backend {:?}", other),
        }
    }

    #[test]
    fn test_misspelled_forest_key_rejected() {
        let json = MINIMAL.replace(
            "\"training\"",
            "\"backend\": {\"kind\": \"random_forest\", \"tres\": 10}, \"training\"",
        );
        assert!(MosConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_range() {
        let json = MINIMAL.replace("\"2023-02-01\"", "\"2019-01-01\"");
        let err = MosConfig::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("training.start"));
    }

    #[test]
    fn test_validation_rejects_empty_lead_times() {
        let json = MINIMAL.replace("[0, 1, 2]", "[]");
        assert!(MosConfig::from_json(&json).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/mos.json")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
