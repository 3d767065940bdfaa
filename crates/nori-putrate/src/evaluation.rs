//! Experiment evaluation, single and batched.
//!
//! Every experiment is independent, so a batch is evaluated in parallel with
//! rayon. Results come back in input order, one per experiment; a failing
//! experiment does not affect the others.
use crate::amplification::LevelStats;
use crate::config::ModelConfig;
use crate::envelope::{CalibrationGrid, EnvelopeQuery};
use crate::error::Result;
use crate::estimator::{EstimateInput, PredictionResult, PutRateEstimator};
use crate::phase::PhaseContext;
use crate::scoring::{Scorer, SeriesScore};
use crate::stall::{StallCounters, StallProfile};
use crate::trace::{validate_trace, ThroughputSample, TraceReport};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A self-contained experiment description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,

    /// Key into [`ModelConfig::workloads`]
    pub workload: String,

    pub envelope: EnvelopeQuery,

    pub level_stats: Vec<LevelStats>,

    /// Phase context for the headline prediction
    pub phase_context: PhaseContext,

    /// Explicit stall profile; takes precedence over `stall_counters`
    #[serde(default)]
    pub stall: Option<StallProfile>,

    /// Cumulative stall counters; combined with `stall_impact`
    #[serde(default)]
    pub stall_counters: Option<StallCounters>,

    /// Throughput retained while stalled, for counter-derived profiles
    /// (falls back to the configured default impact factor)
    #[serde(default)]
    pub stall_impact: Option<f64>,

    /// Measured throughput values scored against the headline prediction
    #[serde(default)]
    pub measured: Vec<f64>,

    /// Measured throughput trace, scored sample by sample
    #[serde(default)]
    pub trace: Vec<ThroughputSample>,
}

/// Everything produced for one experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    pub name: String,
    pub prediction: PredictionResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<SeriesScore>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceReport>,
}

/// Estimator and scorer built from one [`ModelConfig`].
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: ModelConfig,
    estimator: PutRateEstimator,
    scorer: Scorer,
}

impl Evaluator {
    pub fn new(grid: CalibrationGrid, config: ModelConfig) -> Result<Self> {
        let estimator = PutRateEstimator::new(grid, &config)?;
        let scorer = Scorer::new(config.accuracy)?;
        Ok(Self {
            config,
            estimator,
            scorer,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn estimator(&self) -> &PutRateEstimator {
        &self.estimator
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    /// Resolves the stall profile for `experiment`.
    fn stall_profile(&self, experiment: &Experiment) -> Result<StallProfile> {
        match (&experiment.stall, &experiment.stall_counters) {
            (Some(profile), _) => Ok(*profile),
            (None, Some(counters)) => {
                let impact = experiment
                    .stall_impact
                    .unwrap_or(self.config.stall.impact_factor);
                let profile = StallProfile::from_counters(counters, impact)?;
                if profile.stall_probability > 0.0 && profile.impact_factor >= 1.0 {
                    tracing::warn!(
                        experiment = %experiment.name,
                        stall_probability = profile.stall_probability,
                        "stall counters ignored: impact_factor is 1.0, set stall_impact"
                    );
                }
                Ok(profile)
            }
            (None, None) => Ok(self.config.stall),
        }
    }

    /// Predicts, then scores against `measured` and `trace` when present.
    pub fn evaluate(&self, experiment: &Experiment) -> Result<ExperimentOutcome> {
        let input = EstimateInput {
            envelope: experiment.envelope,
            level_stats: &experiment.level_stats,
            phase_context: experiment.phase_context,
            stall: self.stall_profile(experiment)?,
            workload_base_efficiency: self.config.workload_efficiency(&experiment.workload)?,
        };

        let prediction = self.estimator.estimate(&input)?;

        let series = if experiment.measured.is_empty() {
            None
        } else {
            Some(self.scorer.score_series(&prediction, &experiment.measured)?)
        };

        let trace = if experiment.trace.is_empty() {
            None
        } else {
            Some(validate_trace(
                &self.estimator,
                &self.scorer,
                &input,
                &experiment.trace,
            )?)
        };

        tracing::debug!(
            experiment = %experiment.name,
            predicted_throughput = prediction.predicted_throughput,
            "experiment evaluated"
        );

        Ok(ExperimentOutcome {
            name: experiment.name.clone(),
            prediction,
            series,
            trace,
        })
    }

    /// Evaluates every experiment in parallel; output order matches input.
    pub fn evaluate_batch(&self, experiments: &[Experiment]) -> Vec<Result<ExperimentOutcome>> {
        experiments.par_iter().map(|e| self.evaluate(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::CalibrationPoint;
    use crate::error::Error;

    fn evaluator() -> Evaluator {
        let grid = CalibrationGrid::from_points(vec![CalibrationPoint {
            read_ratio: 0.0,
            queue_depth: 16,
            concurrency: 1,
            block_size: 4096,
            read_bw: 0.0,
            write_bw: 1000.0,
        }])
        .unwrap();
        let mut config = ModelConfig::default();
        config.workloads.insert("random_write".to_string(), 0.1);
        config.stall.impact_factor = 0.5;
        Evaluator::new(grid, config).unwrap()
    }

    fn experiment(name: &str) -> Experiment {
        Experiment {
            name: name.to_string(),
            workload: "random_write".to_string(),
            envelope: EnvelopeQuery {
                read_ratio: 0.0,
                queue_depth: 16,
                concurrency: 1,
                block_size: 4096,
            },
            level_stats: vec![LevelStats {
                level: 0,
                flush_bytes: 100.0,
                compaction_write_bytes: 0.0,
                compaction_read_bytes: 0.0,
                file_count: 1,
            }],
            phase_context: PhaseContext::DiskUtilization(0.1),
            stall: None,
            stall_counters: None,
            stall_impact: None,
            measured: Vec::new(),
            trace: Vec::new(),
        }
    }

    #[test]
    fn test_evaluate_prediction_only() {
        let outcome = evaluator().evaluate(&experiment("a")).unwrap();
        // 1000 * 1.0 (initial) * 1.0 (WA 1) * 1.0 (no stall) * 0.1
        assert!((outcome.prediction.predicted_throughput - 100.0).abs() < 1e-9);
        assert!(outcome.series.is_none());
        assert!(outcome.trace.is_none());
    }

    #[test]
    fn test_stall_counters_use_default_impact() {
        let mut e = experiment("counters");
        e.stall_counters = Some(StallCounters {
            stalled_secs: 50.0,
            observation_secs: 100.0,
            stall_events: 5,
        });
        let outcome = evaluator().evaluate(&e).unwrap();
        // 0.5 * 1.0 + 0.5 * 0.5 = 0.75
        assert!((outcome.prediction.component_breakdown.stall_factor - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_stall_impact_overrides_default() {
        let grid = CalibrationGrid::from_points(vec![CalibrationPoint {
            read_ratio: 0.0,
            queue_depth: 16,
            concurrency: 1,
            block_size: 4096,
            read_bw: 0.0,
            write_bw: 1000.0,
        }])
        .unwrap();
        let mut config = ModelConfig::default();
        config.workloads.insert("random_write".to_string(), 0.1);
        let evaluator = Evaluator::new(grid, config).unwrap();

        let mut e = experiment("impact");
        e.stall_counters = Some(StallCounters {
            stalled_secs: 50.0,
            observation_secs: 100.0,
            stall_events: 5,
        });

        // Default impact 1.0 leaves the counters without effect.
        let outcome = evaluator.evaluate(&e).unwrap();
        assert_eq!(outcome.prediction.component_breakdown.stall_factor, 1.0);

        e.stall_impact = Some(0.5);
        let outcome = evaluator.evaluate(&e).unwrap();
        assert!((outcome.prediction.component_breakdown.stall_factor - 0.75).abs() < 1e-12);

        e.stall_impact = Some(1.5);
        assert!(matches!(evaluator.evaluate(&e), Err(Error::InvalidProfile(_))));
    }

    #[test]
    fn test_explicit_stall_wins() {
        let mut e = experiment("explicit");
        e.stall = Some(StallProfile::default());
        e.stall_counters = Some(StallCounters {
            stalled_secs: 50.0,
            observation_secs: 100.0,
            stall_events: 5,
        });
        let outcome = evaluator().evaluate(&e).unwrap();
        assert_eq!(outcome.prediction.component_breakdown.stall_factor, 1.0);
    }

    #[test]
    fn test_evaluate_with_measurements() {
        let mut e = experiment("measured");
        e.measured = vec![100.0, 125.0];
        e.trace = vec![ThroughputSample {
            elapsed_secs: 10.0,
            disk_utilization: Some(0.1),
            throughput: 80.0,
        }];
        let outcome = evaluator().evaluate(&e).unwrap();
        let series = outcome.series.unwrap();
        assert_eq!(series.points.len(), 2);
        assert!((series.aggregate.max_relative_error_pct - 20.0).abs() < 1e-9);
        assert!((outcome.trace.unwrap().aggregate.mean_relative_error_pct - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_workload() {
        let mut e = experiment("unknown");
        e.workload = "scan".to_string();
        assert!(matches!(evaluator().evaluate(&e), Err(Error::Config(_))));
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let mut bad = experiment("bad");
        bad.measured = vec![0.0];
        let experiments = vec![experiment("first"), bad, experiment("third")];

        let results = evaluator().evaluate_batch(&experiments);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "first");
        assert!(matches!(results[1], Err(Error::DivisionByZero(_))));
        assert_eq!(results[2].as_ref().unwrap().name, "third");
    }
}
