//! nori-putrate: steady-state put-rate prediction for LSM storage engines.
//!
//! Estimates the sustainable write throughput of an LSM engine from raw
//! device characteristics and observed compaction behavior, then grades the
//! estimate against measured benchmark throughput.
//!
//! # Pipeline
//!
//! ```text
//! CalibrationGrid ──> DeviceEnvelope ──┐
//! LevelStats ──────> amplification ────┤
//! PhaseContext ────> PhaseModel ───────┼──> PutRateEstimator ──> PredictionResult
//! StallProfile ────> stall_factor ─────┤                              │
//! workload efficiency ─────────────────┘                              ↓
//!                                          measured throughput ──> Scorer ──> ValidationResult
//! ```
//!
//! Every component is a pure function over immutable inputs. There is no
//! I/O and no shared mutable state; batches are evaluated in parallel with
//! no locking.
//!
//! # Example
//!
//! ```
//! use nori_putrate::{
//!     CalibrationGrid, CalibrationPoint, EnvelopeQuery, EstimateInput, LevelStats, ModelConfig,
//!     PhaseContext, PutRateEstimator, Scorer, StallProfile,
//! };
//!
//! # fn main() -> nori_putrate::Result<()> {
//! let grid = CalibrationGrid::from_points(vec![CalibrationPoint {
//!     read_ratio: 0.0,
//!     queue_depth: 16,
//!     concurrency: 1,
//!     block_size: 4096,
//!     read_bw: 0.0,
//!     write_bw: 1500.0,
//! }])?;
//! let estimator = PutRateEstimator::new(grid, &ModelConfig::default())?;
//!
//! let levels = [LevelStats {
//!     level: 0,
//!     flush_bytes: 1.0e9,
//!     compaction_write_bytes: 1.0e9,
//!     compaction_read_bytes: 0.0,
//!     file_count: 4,
//! }];
//! let prediction = estimator.estimate(&EstimateInput {
//!     envelope: EnvelopeQuery { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096 },
//!     level_stats: &levels,
//!     phase_context: PhaseContext::DiskUtilization(0.9),
//!     stall: StallProfile::default(),
//!     workload_base_efficiency: 1.0,
//! })?;
//! assert_eq!(prediction.predicted_throughput, 375.0);
//!
//! let validation = Scorer::default().score(&prediction, 400.0)?;
//! assert_eq!(validation.relative_error_pct, 6.25);
//! # Ok(())
//! # }
//! ```

pub mod amplification;
pub mod config;
pub mod envelope;
pub mod error;
pub mod estimator;
pub mod evaluation;
pub mod phase;
pub mod scoring;
pub mod stall;
pub mod trace;

pub use amplification::{amplification, AmplificationSummary, LevelAmplification, LevelStats, WaAggregation};
pub use config::{AmplificationConfig, EnvelopeConfig, ModelConfig};
pub use envelope::{
    mixed_bandwidth, BandwidthSnapshot, CalibrationGrid, CalibrationPoint, DeviceEnvelope,
    EnvelopeBandwidth, EnvelopeQuery, GridAxis, SaturationPolicy,
};
pub use error::{Error, Result};
pub use estimator::{
    ComponentBreakdown, EnvelopeSource, EstimateInput, Factor, PredictionResult, PutRateEstimator,
};
pub use evaluation::{Evaluator, Experiment, ExperimentOutcome};
pub use phase::{
    ClassifiedPhase, Phase, PhaseConfig, PhaseContext, PhaseModel, PhaseProfile, PhaseThresholds,
    PhaseTracker,
};
pub use scoring::{
    AccuracyClass, AccuracyThresholds, ErrorAggregate, Scorer, SeriesScore, ValidationResult,
};
pub use stall::{stall_factor, StallCounters, StallProfile};
pub use trace::{validate_trace, ThroughputSample, TracePoint, TraceReport};
