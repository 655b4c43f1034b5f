//! Daily forecast batch over persisted models.

use anyhow::Context;
use log::info;
use mos_core::config::{load_config, BackendKind};
use mos_core::date_range::DateRange;
use mos_core::forecast::ForecastRecord;
use mos_core::model::StationModel;
use mos_core::station::Station;
use mos_db::store::ModelStore;
use mos_db::Database;
use mos_engine::ForecastEngine;
use mos_utils::dates::{format_datetime, parse_date};
use std::path::Path;

/// Forecast the 00 UTC run of every day in `days`, skipping days without
/// model data.
pub fn forecast_days<M: StationModel>(
    engine: &ForecastEngine<M>,
    db: &Database,
    station_ids: &[String],
    predictand: &str,
    lead_times: &[u32],
    days: DateRange,
) -> anyhow::Result<Vec<ForecastRecord>> {
    let mut records = Vec::new();
    for day in days {
        let run = day
            .and_hms_opt(0, 0, 0)
            .with_context(|| format!("invalid run date {}", day))?;
        let run_data = db.query_model_run(&run)?;
        if run_data.is_empty() {
            info!("No model data for {}, skipped", day);
            continue;
        }
        records.extend(engine.forecast_hourly(station_ids, &run_data, predictand, lead_times)?);
    }
    Ok(records)
}

/// Write forecasts as `run_datetime,station_id,lead_time,forecast`; a
/// missing forecast is an empty field.
pub fn write_forecasts(path: &Path, records: &[ForecastRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("writing forecasts to {}", path.display()))?;
    wtr.write_record(["run_datetime", "station_id", "lead_time", "forecast"])?;
    for r in records {
        wtr.write_record([
            format_datetime(&r.run_datetime),
            r.station_id.clone(),
            r.lead_time.to_string(),
            r.forecast.map(|v| v.to_string()).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn run_forecast(
    config_path: &Path,
    predictand: &str,
    start: &str,
    end: &str,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let output = output
        .or(config.forecast_output.as_deref())
        .context("no output path: pass --output or set forecast_output")?;
    let days = DateRange(parse_date(start)?, parse_date(end)?);

    let stations_data = std::fs::read_to_string(&config.station_metadata)
        .with_context(|| format!("reading {}", config.station_metadata.display()))?;
    let station_ids = Station::ids(&Station::parse_station_csv(&stations_data)?);

    let db = Database::new()?;
    for path in &config.model_data {
        db.load_model_data_file(path)?;
    }

    let store = ModelStore::new(&config.models_path);
    let records = match &config.backend {
        BackendKind::Linear => {
            let engine = ForecastEngine::new(store.load()?);
            forecast_days(&engine, &db, &station_ids, predictand, &config.lead_times, days)?
        }
        BackendKind::RandomForest(_) => {
            let engine = ForecastEngine::new(store.load_forests()?);
            forecast_days(&engine, &db, &station_ids, predictand, &config.lead_times, days)?
        }
    };

    write_forecasts(output, &records)?;
    let missing = records.iter().filter(|r| r.is_missing()).count();
    info!(
        "Forecast complete. {} records ({} missing) written to {}",
        records.len(),
        missing,
        output.display()
    );
    Ok(())
}
