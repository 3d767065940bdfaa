//! Put-rate estimator.
//!
//! Composes the device envelope, compaction accounting, phase model and
//! stall model into one predicted throughput:
//!
//! ```text
//! predicted = envelope_bw
//!           × phase_factor
//!           × amplification_factor      (1 / (1 + weighted WA penalty))
//!           × stall_factor
//!           × workload_base_efficiency
//! ```
//!
//! Every factor is kept in [`ComponentBreakdown`] so a bad prediction can be
//! traced to the component responsible. Sub-component errors propagate
//! unchanged.
use crate::amplification::{amplification, LevelStats};
use crate::config::{AmplificationConfig, ModelConfig};
use crate::envelope::{CalibrationGrid, DeviceEnvelope, EnvelopeQuery, GridAxis};
use crate::error::{Error, Result};
use crate::phase::{ClassifiedPhase, Phase, PhaseContext, PhaseModel};
use crate::stall::{stall_factor, StallProfile};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inputs for one estimate.
#[derive(Debug, Clone, Copy)]
pub struct EstimateInput<'a> {
    pub envelope: EnvelopeQuery,
    pub level_stats: &'a [LevelStats],
    pub phase_context: PhaseContext,
    pub stall: StallProfile,
    /// Calibrated per-workload constant in (0, 1].
    pub workload_base_efficiency: f64,
}

/// A multiplicative factor of the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Phase,
    Amplification,
    Stall,
    Workload,
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Factor::Phase => "phase",
            Factor::Amplification => "amplification",
            Factor::Stall => "stall",
            Factor::Workload => "workload",
        };
        f.write_str(name)
    }
}

/// Every term of the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentBreakdown {
    /// Device bandwidth used, calibrated or degraded (bytes/sec).
    pub envelope_bw: f64,
    pub phase_factor: f64,
    pub amplification_factor: f64,
    pub stall_factor: f64,
    pub workload_efficiency: f64,
}

impl ComponentBreakdown {
    /// Product of all terms.
    pub fn product(&self) -> f64 {
        self.envelope_bw
            * self.phase_factor
            * self.amplification_factor
            * self.stall_factor
            * self.workload_efficiency
    }

    /// The smallest fractional factor, i.e. the one removing the most
    /// throughput. Earlier factors win ties.
    pub fn limiting_factor(&self) -> (Factor, f64) {
        let factors = [
            (Factor::Phase, self.phase_factor),
            (Factor::Amplification, self.amplification_factor),
            (Factor::Stall, self.stall_factor),
            (Factor::Workload, self.workload_efficiency),
        ];
        factors
            .into_iter()
            .fold((Factor::Phase, f64::INFINITY), |best, candidate| {
                if candidate.1 < best.1 {
                    candidate
                } else {
                    best
                }
            })
    }
}

/// Where `envelope_bw` came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeSource {
    /// Interpolated from the calibration grid.
    Calibrated,
    /// The active phase's observed bandwidth snapshot.
    Degraded,
}

/// One prediction and its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_throughput: f64,
    pub component_breakdown: ComponentBreakdown,
    pub phase: Phase,
    pub envelope_source: EnvelopeSource,
    /// WA fed into the amplification factor.
    pub aggregate_wa: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_level: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clamped_axes: Vec<GridAxis>,
}

/// Deterministic put-rate estimator.
#[derive(Debug, Clone)]
pub struct PutRateEstimator {
    envelope: DeviceEnvelope,
    phases: PhaseModel,
    amplification: AmplificationConfig,
}

impl PutRateEstimator {
    /// Builds an estimator from a calibration grid and a validated config.
    pub fn new(grid: CalibrationGrid, config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            envelope: DeviceEnvelope::new(grid, config.envelope.saturation),
            phases: PhaseModel::new(config.phases.clone())?,
            amplification: config.amplification,
        })
    }

    pub fn envelope(&self) -> &DeviceEnvelope {
        &self.envelope
    }

    pub fn phases(&self) -> &PhaseModel {
        &self.phases
    }

    /// Predicts throughput, classifying the phase from `input.phase_context`.
    pub fn estimate(&self, input: &EstimateInput<'_>) -> Result<PredictionResult> {
        self.compose(input, None)
    }

    /// Predicts throughput for an already classified phase (e.g. one held
    /// by a [`PhaseTracker`](crate::phase::PhaseTracker)).
    pub fn estimate_in_phase(
        &self,
        input: &EstimateInput<'_>,
        classified: ClassifiedPhase,
    ) -> Result<PredictionResult> {
        check_classified(&classified)?;
        self.compose(input, Some(classified))
    }

    /// Envelope, amplification, phase, stall, in that order; the first
    /// failing component is the one reported.
    fn compose(
        &self,
        input: &EstimateInput<'_>,
        classified: Option<ClassifiedPhase>,
    ) -> Result<PredictionResult> {
        let w = input.workload_base_efficiency;
        if !w.is_finite() || w <= 0.0 || w > 1.0 {
            return Err(Error::Validation(format!(
                "workload_base_efficiency {} outside (0.0, 1.0]",
                w
            )));
        }

        let bandwidth = self.envelope.bandwidth(&input.envelope)?;
        let summary = amplification(input.level_stats)?;
        let amplification_factor = self.amplification.factor(&summary);
        let classified = match classified {
            Some(classified) => classified,
            None => self.phases.classify(input.phase_context)?,
        };
        let stall = stall_factor(&input.stall)?;

        let (envelope_bw, envelope_source) = match classified.degraded_bandwidth {
            Some(snapshot) => (
                snapshot.mixed(input.envelope.read_ratio),
                EnvelopeSource::Degraded,
            ),
            None => (bandwidth.mixed_bw, EnvelopeSource::Calibrated),
        };

        let component_breakdown = ComponentBreakdown {
            envelope_bw,
            phase_factor: classified.efficiency_factor,
            amplification_factor,
            stall_factor: stall,
            workload_efficiency: w,
        };
        let predicted_throughput = component_breakdown.product();

        tracing::debug!(
            predicted_throughput,
            envelope_bw,
            phase = %classified.phase,
            phase_factor = classified.efficiency_factor,
            amplification_factor,
            stall_factor = stall,
            workload_efficiency = w,
            "put-rate estimate"
        );

        Ok(PredictionResult {
            predicted_throughput,
            component_breakdown,
            phase: classified.phase,
            envelope_source,
            aggregate_wa: summary.wa(self.amplification.aggregation),
            dominant_level: summary.dominant_level,
            clamped_axes: bandwidth.clamped,
        })
    }
}

fn check_classified(classified: &ClassifiedPhase) -> Result<()> {
    let e = classified.efficiency_factor;
    if !e.is_finite() || e <= 0.0 || e > 1.0 {
        return Err(Error::Validation(format!(
            "{} phase efficiency_factor {} outside (0.0, 1.0]",
            classified.phase, e
        )));
    }
    if let Some(snapshot) = &classified.degraded_bandwidth {
        let ok = |bw: f64| bw.is_finite() && bw >= 0.0;
        if !ok(snapshot.read_bw) || !ok(snapshot.write_bw) {
            return Err(Error::Validation(format!(
                "{} phase degraded bandwidth must be finite and >= 0",
                classified.phase
            )));
        }
    }
    Ok(())
}
