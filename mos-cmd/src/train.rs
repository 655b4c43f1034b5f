//! Offline training of station models.

use log::info;
use mos_core::config::{load_config, BackendKind, MosConfig};
use mos_db::store::ModelStore;
use mos_db::Database;
use mos_engine::TrainingPipeline;
use mos_model::{ForestBackend, LinearBackend};
use std::path::Path;

/// Load every configured archive into a fresh in-memory database.
pub fn load_database(config: &MosConfig) -> anyhow::Result<Database> {
    let db = Database::new()?;
    db.load_stations_file(&config.station_metadata)?;
    for path in &config.observations {
        db.load_observations_file(path)?;
    }
    for path in &config.model_data {
        db.load_model_data_file(path)?;
    }
    Ok(db)
}

/// Train models for every configured lead time and predictand and write
/// them to `models_path`.
pub fn run_train(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let db = load_database(&config)?;
    let stations = db.query_stations()?;
    let store = ModelStore::new(&config.models_path);
    let training = &config.training;

    match &config.backend {
        BackendKind::Linear => {
            let backend = LinearBackend::new(training.min_samples, training.tolerance);
            let pipeline = TrainingPipeline::new(backend, training, config.predictors.clone());
            let output = pipeline.run(&db, &stations, &config.lead_times, &config.predictands)?;
            store.save(&output.models)?;
            info!("Training complete. {} models", output.models.len());
        }
        BackendKind::RandomForest(settings) => {
            let backend = ForestBackend::new(training.min_samples, settings.clone());
            let pipeline = TrainingPipeline::new(backend, training, config.predictors.clone());
            let output = pipeline.run(&db, &stations, &config.lead_times, &config.predictands)?;
            store.save_forests(&output.models)?;
            info!("Training complete. {} forests", output.models.len());
        }
    }
    Ok(())
}
