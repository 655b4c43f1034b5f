use mos_core::config::TrainingSettings;
use mos_core::model::{ModelKey, StationModel};
use mos_core::record::{group_by_station, ModelGridRecord, ObservationRecord};
use mos_core::source::HistorySource;
use mos_core::station::Station;
use mos_model::{FeatureAligner, ModelBackend};
use rayon::prelude::*;

/// Stations tried and models produced for one (lead time, predictand).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingSummary {
    pub lead_time: u32,
    pub predictand: String,
    pub stations_tried: usize,
    pub models_produced: usize,
}

#[derive(Debug)]
pub struct TrainingOutput<M> {
    /// Fitted models, ordered by lead time, then predictand, then station.
    pub models: Vec<M>,
    pub summaries: Vec<TrainingSummary>,
}

/// Trains one model per (station, lead time, predictand).
///
/// Stations whose raw predictand history is shorter than `min_history`
/// records, or whose aligned table is rejected by the aligner or backend,
/// are left out of the output entirely.
pub struct TrainingPipeline<B> {
    backend: B,
    aligner: FeatureAligner,
    settings: TrainingSettings,
    predictors: Option<Vec<String>>,
}

impl<B: ModelBackend> TrainingPipeline<B> {
    pub fn new(backend: B, settings: &TrainingSettings, predictors: Option<Vec<String>>) -> Self {
        Self {
            backend,
            aligner: FeatureAligner::new(settings.min_samples),
            settings: settings.clone(),
            predictors,
        }
    }

    pub fn run(
        &self,
        source: &dyn HistorySource,
        stations: &[Station],
        lead_times: &[u32],
        predictands: &[String],
    ) -> anyhow::Result<TrainingOutput<B::Model>> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.workers.max(1))
            .build()?;
        let range = self.settings.history_range();
        log::info!(
            "training {} models for {} stations, lead times {:?}, predictands {:?}",
            self.backend.name(),
            stations.len(),
            lead_times,
            predictands
        );

        let mut models = Vec::new();
        let mut summaries = Vec::new();
        for &lead_time in lead_times {
            let model_history = source.model_history(lead_time, &range)?;
            let model_by_station = group_by_station(&model_history);

            for predictand in predictands {
                let station_history = source.station_history(predictand, &range)?;
                let obs_by_station = group_by_station(&station_history);

                let fitted: Vec<B::Model> = pool.install(|| {
                    stations
                        .par_iter()
                        .filter_map(|station| {
                            let key = ModelKey::new(&station.station_id, lead_time, predictand);
                            let id = station.station_id.as_str();
                            self.train_station(
                                &key,
                                obs_by_station.get(id).map(Vec::as_slice).unwrap_or(&[]),
                                model_by_station.get(id).map(Vec::as_slice).unwrap_or(&[]),
                            )
                        })
                        .collect()
                });

                let summary = TrainingSummary {
                    lead_time,
                    predictand: predictand.clone(),
                    stations_tried: stations.len(),
                    models_produced: fitted.len(),
                };
                log::info!(
                    "lead time {} / {}: {} models from {} stations",
                    lead_time,
                    predictand,
                    summary.models_produced,
                    summary.stations_tried
                );
                models.extend(fitted);
                summaries.push(summary);
            }
        }
        Ok(TrainingOutput { models, summaries })
    }

    fn train_station(
        &self,
        key: &ModelKey,
        station_history: &[&ObservationRecord],
        model_history: &[&ModelGridRecord],
    ) -> Option<B::Model> {
        if station_history.len() < self.settings.min_history {
            log::debug!(
                "{key}: skipped, {} raw records, need {}",
                station_history.len(),
                self.settings.min_history
            );
            return None;
        }
        let Some(table) = self.aligner.align(
            &key.station_id,
            station_history,
            model_history,
            &key.predictand,
            self.predictors.as_deref(),
        ) else {
            log::debug!("{key}: skipped, too few aligned rows");
            return None;
        };
        let model = self.backend.train(key, &table)?;
        log::debug!("{key}: fitted, score {:.3}", model.score());
        Some(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use mos_core::date_range::HistoryRange;
    use mos_core::model::FittedModel;
    use mos_model::{ForestBackend, LinearBackend};
    use std::cell::Cell;

    struct CountingSource {
        models: Vec<ModelGridRecord>,
        observations: Vec<ObservationRecord>,
        model_calls: Cell<usize>,
        station_calls: Cell<usize>,
    }

    impl HistorySource for CountingSource {
        fn model_history(
            &self,
            lead_time: u32,
            range: &HistoryRange,
        ) -> anyhow::Result<Vec<ModelGridRecord>> {
            self.model_calls.set(self.model_calls.get() + 1);
            Ok(self
                .models
                .iter()
                .filter(|r| r.lead_time == lead_time && range.contains(&r.run_datetime))
                .cloned()
                .collect())
        }

        fn station_history(
            &self,
            variable: &str,
            range: &HistoryRange,
        ) -> anyhow::Result<Vec<ObservationRecord>> {
            self.station_calls.set(self.station_calls.get() + 1);
            Ok(self
                .observations
                .iter()
                .filter(|r| r.variable == variable && range.contains(&r.datetime))
                .cloned()
                .collect())
        }
    }

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// `days` daily runs with lead time 6 and matching 06 UTC observations.
    fn station_data(
        station: &str,
        days: usize,
        source: &mut CountingSource,
    ) {
        for d in 0..days {
            let run = start() + TimeDelta::days(d as i64);
            let signal = 8.0 * (d as f64 / 30.0).sin();
            let wobble = ((d * 37) % 11) as f64 / 10.0 - 0.5;
            source.models.push(ModelGridRecord {
                station_id: station.to_string(),
                run_datetime: run,
                lead_time: 6,
                variable: "2t".to_string(),
                value: signal,
            });
            source.models.push(ModelGridRecord {
                station_id: station.to_string(),
                run_datetime: run,
                lead_time: 6,
                variable: "10u".to_string(),
                value: wobble,
            });
            source.observations.push(ObservationRecord {
                station_id: station.to_string(),
                datetime: run + TimeDelta::hours(6),
                variable: "2t".to_string(),
                value: 1.5 + 0.8 * signal,
            });
        }
    }

    fn source() -> CountingSource {
        let mut source = CountingSource {
            models: Vec::new(),
            observations: Vec::new(),
            model_calls: Cell::new(0),
            station_calls: Cell::new(0),
        };
        station_data("FULL", 900, &mut source);
        station_data("SHORT", 300, &mut source);
        station_data("SPARSE", 400, &mut source);
        source
    }

    fn settings() -> TrainingSettings {
        TrainingSettings {
            start: start(),
            end: start() + TimeDelta::days(2000),
            min_samples: 850,
            min_history: 365,
            tolerance: 0.02,
            workers: 2,
        }
    }

    fn stations() -> Vec<Station> {
        ["FULL", "SHORT", "SPARSE", "ABSENT"]
            .iter()
            .map(|id| Station {
                station_id: id.to_string(),
                latitude: 46.0,
                longitude: 9.0,
            })
            .collect()
    }

    #[test]
    fn test_only_stations_passing_both_gates_get_models() {
        let source = source();
        let pipeline = TrainingPipeline::new(LinearBackend::new(850, 0.02), &settings(), None);
        let output = pipeline
            .run(&source, &stations(), &[6], &["2t".to_string()])
            .unwrap();

        assert_eq!(output.models.len(), 1);
        let model: &FittedModel = &output.models[0];
        assert_eq!(model.station_id, "FULL");
        assert_eq!(model.lead_time, 6);
        assert_eq!(model.predictor_names, vec!["2t".to_string()]);
        assert!((model.coefficients[0] - 0.8).abs() < 1e-9);
        assert!((model.intercept - 1.5).abs() < 1e-9);
        assert_eq!(
            output.summaries,
            vec![TrainingSummary {
                lead_time: 6,
                predictand: "2t".to_string(),
                stations_tried: 4,
                models_produced: 1,
            }]
        );
    }

    #[test]
    fn test_model_history_per_lead_time_station_history_per_pair() {
        let source = source();
        let pipeline = TrainingPipeline::new(LinearBackend::new(850, 0.02), &settings(), None);
        let predictands = vec!["2t".to_string(), "tp".to_string()];
        let output = pipeline
            .run(&source, &stations(), &[6, 12], &predictands)
            .unwrap();

        assert_eq!(source.model_calls.get(), 2);
        assert_eq!(source.station_calls.get(), 4);
        assert_eq!(output.summaries.len(), 4);
        let produced: Vec<usize> = output.summaries.iter().map(|s| s.models_produced).collect();
        assert_eq!(produced, vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_min_history_gate_is_inclusive() {
        let mut settings = settings();
        settings.min_history = 900;
        let source = source();
        let pipeline = TrainingPipeline::new(LinearBackend::new(850, 0.02), &settings, None);
        let output = pipeline
            .run(&source, &stations(), &[6], &["2t".to_string()])
            .unwrap();
        assert_eq!(output.models.len(), 1);

        settings.min_history = 901;
        let pipeline = TrainingPipeline::new(LinearBackend::new(850, 0.02), &settings, None);
        let output = pipeline
            .run(&source, &stations(), &[6], &["2t".to_string()])
            .unwrap();
        assert!(output.models.is_empty());
    }

    #[test]
    fn test_predictor_restriction_reaches_the_backend() {
        let source = source();
        let pipeline = TrainingPipeline::new(
            LinearBackend::new(850, 0.02),
            &settings(),
            Some(vec!["10u".to_string()]),
        );
        let output = pipeline
            .run(&source, &stations(), &[6], &["2t".to_string()])
            .unwrap();
        // 10u carries no signal, so nothing qualifies.
        assert!(output.models.is_empty());
    }

    #[test]
    fn test_forest_backend_plugs_into_the_same_pipeline() {
        let source = source();
        let backend = ForestBackend::new(
            850,
            mos_core::config::ForestSettings {
                trees: 3,
                max_depth: Some(6),
                min_samples_leaf: 5,
                seed: 1,
            },
        );
        let pipeline = TrainingPipeline::new(backend, &settings(), None);
        let output = pipeline
            .run(&source, &stations(), &[6], &["2t".to_string()])
            .unwrap();
        assert_eq!(output.models.len(), 1);
        assert_eq!(output.models[0].key(), ModelKey::new("FULL", 6, "2t"));
        assert!(output.models[0].score() > 0.9);
    }
}
