//! Online evaluation of persisted station models against one model run.

use chrono::NaiveDateTime;
use mos_core::forecast::ForecastRecord;
use mos_core::model::{ModelKey, StationModel};
use mos_core::record::{group_by_station, ModelGridRecord};
use mos_core::MosError;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Model run data validated for a single-lead-time forecast.
struct RunSlice<'a> {
    run_datetime: NaiveDateTime,
    lead_time: u32,
    by_station: HashMap<&'a str, Vec<&'a ModelGridRecord>>,
}

pub struct ForecastEngine<M> {
    models: HashMap<ModelKey, M>,
    stations: HashSet<String>,
    predictands: BTreeSet<String>,
}

impl<M: StationModel> ForecastEngine<M> {
    /// Index `models` by key. A repeated key keeps the first model.
    pub fn new(models: Vec<M>) -> Self {
        let mut index = HashMap::with_capacity(models.len());
        let mut stations = HashSet::new();
        let mut predictands = BTreeSet::new();
        for model in models {
            let key = model.key();
            if index.contains_key(&key) {
                log::warn!("duplicate model {key}, keeping the first");
                continue;
            }
            stations.insert(key.station_id.clone());
            predictands.insert(key.predictand.clone());
            index.insert(key, model);
        }
        log::info!("forecast engine loaded {} models", index.len());
        Self {
            models: index,
            stations,
            predictands,
        }
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn model(&self, key: &ModelKey) -> Option<&M> {
        self.models.get(key)
    }

    fn check_predictand(&self, predictand: &str) -> Result<(), MosError> {
        if self.predictands.contains(predictand) {
            Ok(())
        } else {
            Err(MosError::UnknownPredictand {
                predictand: predictand.to_string(),
                available: self.predictands.iter().cloned().collect(),
            })
        }
    }

    fn slice<'a>(&self, run_data: &'a [ModelGridRecord]) -> Result<RunSlice<'a>, MosError> {
        let first = run_data.first().ok_or(MosError::EmptyRunData)?;
        let lead_times: BTreeSet<u32> = run_data.iter().map(|r| r.lead_time).collect();
        if lead_times.len() > 1 {
            return Err(MosError::TooManyLeadTimes(lead_times.into_iter().collect()));
        }
        Ok(RunSlice {
            run_datetime: first.run_datetime,
            lead_time: first.lead_time,
            by_station: group_by_station(run_data),
        })
    }

    fn evaluate(&self, station_id: &str, run: &RunSlice, predictand: &str) -> Result<f64, MosError> {
        if !self.stations.contains(station_id) {
            return Err(MosError::StationNotInModels(station_id.to_string()));
        }
        let Some(rows) = run.by_station.get(station_id) else {
            return Err(MosError::StationNotInRunData(station_id.to_string()));
        };
        let key = ModelKey::new(station_id, run.lead_time, predictand);
        let model = self.models.get(&key).ok_or_else(|| MosError::NoModel {
            station_id: station_id.to_string(),
            lead_time: run.lead_time,
            predictand: predictand.to_string(),
        })?;

        let values = model
            .predictors()
            .iter()
            .map(|variable| {
                rows.iter()
                    .find(|r| &r.variable == variable)
                    .map(|r| r.value)
                    .ok_or_else(|| MosError::MissingPredictor {
                        station_id: station_id.to_string(),
                        variable: variable.clone(),
                    })
            })
            .collect::<Result<Vec<f64>, MosError>>()?;
        Ok(model.predict(&values))
    }

    /// Forecast one station from run data holding exactly one lead time.
    pub fn forecast_point(
        &self,
        station_id: &str,
        run_data: &[ModelGridRecord],
        predictand: &str,
    ) -> Result<f64, MosError> {
        let run = self.slice(run_data)?;
        self.check_predictand(predictand)?;
        self.evaluate(station_id, &run, predictand)
    }

    /// Forecast every station in `station_ids`, in order, one record each.
    ///
    /// Stations without a model or without run data get a missing-value
    /// record. Malformed run data, an unknown predictand and missing
    /// predictor values are errors.
    pub fn forecast_points(
        &self,
        station_ids: &[String],
        run_data: &[ModelGridRecord],
        predictand: &str,
    ) -> Result<Vec<ForecastRecord>, MosError> {
        let run = self.slice(run_data)?;
        self.check_predictand(predictand)?;

        let mut records = Vec::with_capacity(station_ids.len());
        for station_id in station_ids {
            let forecast = match self.evaluate(station_id, &run, predictand) {
                Ok(value) => Some(value),
                Err(err) if err.is_station_sparsity() => {
                    log::warn!("{}, forecast set to missing", err);
                    None
                }
                Err(err) => return Err(err),
            };
            records.push(ForecastRecord {
                run_datetime: run.run_datetime,
                station_id: station_id.clone(),
                lead_time: run.lead_time,
                forecast,
            });
        }
        Ok(records)
    }

    /// Forecast every configured lead time of one model run.
    ///
    /// `run_data` may span lead times; it is sliced per lead time and passed
    /// to [`ForecastEngine::forecast_points`]. A lead time with no data
    /// yields missing-value records for every station.
    pub fn forecast_hourly(
        &self,
        station_ids: &[String],
        run_data: &[ModelGridRecord],
        predictand: &str,
        lead_times: &[u32],
    ) -> Result<Vec<ForecastRecord>, MosError> {
        let run_datetime = run_data.first().ok_or(MosError::EmptyRunData)?.run_datetime;
        self.check_predictand(predictand)?;

        let mut records = Vec::with_capacity(station_ids.len() * lead_times.len());
        for &lead_time in lead_times {
            let slice: Vec<ModelGridRecord> = run_data
                .iter()
                .filter(|r| r.lead_time == lead_time)
                .cloned()
                .collect();
            if slice.is_empty() {
                log::warn!("no model data for lead time {}, forecasts set to missing", lead_time);
                records.extend(station_ids.iter().map(|id| ForecastRecord {
                    run_datetime,
                    station_id: id.clone(),
                    lead_time,
                    forecast: None,
                }));
                continue;
            }
            records.extend(self.forecast_points(station_ids, &slice, predictand)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mos_core::model::FittedModel;

    fn run() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn model(station: &str, lead_time: u32, intercept: f64) -> FittedModel {
        FittedModel {
            station_id: station.to_string(),
            lead_time,
            predictand: "2t".to_string(),
            predictor_names: vec!["2t".to_string(), "10u".to_string()],
            coefficients: vec![0.5, 2.0],
            intercept,
            fit_score: 0.9,
        }
    }

    fn record(station: &str, lead_time: u32, variable: &str, value: f64) -> ModelGridRecord {
        ModelGridRecord {
            station_id: station.to_string(),
            run_datetime: run(),
            lead_time,
            variable: variable.to_string(),
            value,
        }
    }

    fn run_data(lead_time: u32, stations: &[&str]) -> Vec<ModelGridRecord> {
        stations
            .iter()
            .flat_map(|s| {
                vec![
                    record(s, lead_time, "2t", 10.0),
                    record(s, lead_time, "10u", 1.0),
                ]
            })
            .collect()
    }

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_forecast_point_evaluates_linear_model() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0)]);
        let value = engine
            .forecast_point("S1", &run_data(6, &["S1"]), "2t")
            .unwrap();
        assert_eq!(value, 0.5 * 10.0 + 2.0 * 1.0 + 1.0);
    }

    #[test]
    fn test_station_without_model_gets_missing_value() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0), model("S3", 6, 3.0)]);
        let records = engine
            .forecast_points(&ids(&["S1", "S2", "S3"]), &run_data(6, &["S1", "S2", "S3"]), "2t")
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].forecast, Some(8.0));
        assert!(records[1].is_missing());
        assert_eq!(records[1].station_id, "S2");
        assert_eq!(records[2].forecast, Some(10.0));
        assert!(records.iter().all(|r| r.lead_time == 6 && r.run_datetime == run()));
    }

    #[test]
    fn test_two_lead_times_are_rejected() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0)]);
        let mut data = run_data(6, &["S1"]);
        data.extend(run_data(12, &["S1"]));

        let err = engine
            .forecast_points(&ids(&["S1"]), &data, "2t")
            .unwrap_err();
        assert_eq!(err, MosError::TooManyLeadTimes(vec![6, 12]));
        assert!(err.to_string().contains("too many lead times"));
        assert!(engine.forecast_point("S1", &data, "2t").is_err());
    }

    #[test]
    fn test_empty_run_data_is_rejected() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0)]);
        assert_eq!(
            engine.forecast_points(&ids(&["S1"]), &[], "2t").unwrap_err(),
            MosError::EmptyRunData
        );
    }

    #[test]
    fn test_unknown_predictand_lists_available() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0)]);
        let err = engine
            .forecast_points(&ids(&["S1"]), &run_data(6, &["S1"]), "tp")
            .unwrap_err();
        assert_eq!(
            err,
            MosError::UnknownPredictand {
                predictand: "tp".to_string(),
                available: vec!["2t".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_predictor_propagates() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0)]);
        let data = vec![record("S1", 6, "2t", 10.0)];
        let err = engine
            .forecast_points(&ids(&["S1"]), &data, "2t")
            .unwrap_err();
        assert_eq!(
            err,
            MosError::MissingPredictor {
                station_id: "S1".to_string(),
                variable: "10u".to_string(),
            }
        );
    }

    #[test]
    fn test_station_sparsity_variants_become_missing() {
        // S1 has a model for lead 12 only; S2 has no run data.
        let engine = ForecastEngine::new(vec![model("S1", 12, 1.0), model("S2", 6, 1.0)]);
        let records = engine
            .forecast_points(&ids(&["S1", "S2"]), &run_data(6, &["S1"]), "2t")
            .unwrap();
        assert!(records.iter().all(ForecastRecord::is_missing));

        assert!(matches!(
            engine.forecast_point("S1", &run_data(6, &["S1"]), "2t"),
            Err(MosError::NoModel { lead_time: 6, .. })
        ));
        assert!(matches!(
            engine.forecast_point("S2", &run_data(6, &["S1"]), "2t"),
            Err(MosError::StationNotInRunData(_))
        ));
    }

    #[test]
    fn test_duplicate_models_keep_the_first() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0), model("S1", 6, 100.0)]);
        assert_eq!(engine.len(), 1);
        let value = engine
            .forecast_point("S1", &run_data(6, &["S1"]), "2t")
            .unwrap();
        assert_eq!(value, 8.0);
    }

    #[test]
    fn test_first_matching_predictor_value_is_used() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 0.0)]);
        let mut data = run_data(6, &["S1"]);
        data.push(record("S1", 6, "2t", 1000.0));
        assert_eq!(engine.forecast_point("S1", &data, "2t").unwrap(), 7.0);
    }

    #[test]
    fn test_forecast_hourly_covers_every_lead_time() {
        let engine = ForecastEngine::new(vec![model("S1", 6, 1.0), model("S1", 12, 2.0)]);
        let mut data = run_data(6, &["S1"]);
        data.extend(run_data(12, &["S1"]));

        let records = engine
            .forecast_hourly(&ids(&["S1", "S2"]), &data, "2t", &[6, 12, 18])
            .unwrap();
        assert_eq!(records.len(), 6);
        let values: Vec<Option<f64>> = records.iter().map(|r| r.forecast).collect();
        assert_eq!(values, vec![Some(8.0), None, Some(9.0), None, None, None]);
        let leads: Vec<u32> = records.iter().map(|r| r.lead_time).collect();
        assert_eq!(leads, vec![6, 6, 12, 12, 18, 18]);
    }
}
