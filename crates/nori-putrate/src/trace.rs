//! Validation of predictions against a measured throughput trace.
//!
//! Each sample of the trace is classified through a [`PhaseTracker`], so a
//! sample taken after utilization dips (e.g. once a compaction reclaims
//! space) is still predicted with the furthest phase reached.
use crate::error::{Error, Result};
use crate::estimator::{EstimateInput, PredictionResult, PutRateEstimator};
use crate::phase::{Phase, PhaseContext, PhaseTracker};
use crate::scoring::{ErrorAggregate, Scorer, ValidationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One measured throughput point of a benchmark trace.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThroughputSample {
    pub elapsed_secs: f64,
    /// Device fill fraction when known; preferred over elapsed time for
    /// phase classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_utilization: Option<f64>,
    pub throughput: f64,
}

impl ThroughputSample {
    pub fn phase_context(&self) -> PhaseContext {
        match self.disk_utilization {
            Some(u) => PhaseContext::DiskUtilization(u),
            None => PhaseContext::ElapsedSecs(self.elapsed_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracePoint {
    pub sample: ThroughputSample,
    pub prediction: PredictionResult,
    pub validation: ValidationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceReport {
    pub points: Vec<TracePoint>,
    pub aggregate: ErrorAggregate,
    pub per_phase: BTreeMap<Phase, ErrorAggregate>,
}

/// Predicts and scores every sample of `samples` in order.
///
/// `input.phase_context` is ignored; each sample supplies its own.
pub fn validate_trace(
    estimator: &PutRateEstimator,
    scorer: &Scorer,
    input: &EstimateInput<'_>,
    samples: &[ThroughputSample],
) -> Result<TraceReport> {
    if samples.is_empty() {
        return Err(Error::Validation("throughput trace is empty".to_string()));
    }

    let mut tracker = PhaseTracker::new();
    let mut points = Vec::with_capacity(samples.len());

    for sample in samples {
        let context = sample.phase_context();
        let classified = tracker.observe(estimator.phases(), context)?;
        let sample_input = EstimateInput {
            phase_context: context,
            ..*input
        };
        let prediction = estimator.estimate_in_phase(&sample_input, classified)?;
        let validation = scorer.score(&prediction, sample.throughput)?;
        points.push(TracePoint {
            sample: *sample,
            prediction,
            validation,
        });
    }

    let thresholds = scorer.thresholds();
    let all: Vec<ValidationResult> = points.iter().map(|p| p.validation).collect();
    let aggregate = ErrorAggregate::from_results(&all, thresholds)
        .ok_or_else(|| Error::Validation("throughput trace is empty".to_string()))?;

    let mut by_phase: BTreeMap<Phase, Vec<ValidationResult>> = BTreeMap::new();
    for p in &points {
        by_phase.entry(p.prediction.phase).or_default().push(p.validation);
    }
    let per_phase = by_phase
        .into_iter()
        .filter_map(|(phase, results)| {
            ErrorAggregate::from_results(&results, thresholds).map(|agg| (phase, agg))
        })
        .collect();

    tracing::debug!(
        samples = points.len(),
        mean_relative_error_pct = aggregate.mean_relative_error_pct,
        "trace validated"
    );

    Ok(TraceReport {
        points,
        aggregate,
        per_phase,
    })
}
