//! Phase classification and degradation factors.
//!
//! An experiment moves through three ordered phases as the device fills up
//! or time passes:
//!
//! ```text
//! initial  ──(value >= transitional_at)──>  transitional  ──(value > stable_at)──>  stable
//! ```
//!
//! The classifier is stateless. Forward-only progression for a monitored
//! session is the caller's job; [`PhaseTracker`] does that bookkeeping.
//!
//! Each phase carries an efficiency factor in (0, 1] and may carry an
//! observed device bandwidth snapshot that replaces the calibrated envelope
//! while the phase is active.
use crate::envelope::BandwidthSnapshot;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifetime stage of an experiment. Ordered: `Initial < Transitional < Stable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initial,
    Transitional,
    Stable,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initial => "initial",
            Phase::Transitional => "transitional",
            Phase::Stable => "stable",
        };
        f.write_str(name)
    }
}

/// The quantity a phase is classified from.
///
/// Serialized as a one-key map, e.g. `{ disk_utilization: 0.8 }` or
/// `{ elapsed_secs: 1200 }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PhaseContextRepr", into = "PhaseContextRepr")]
pub enum PhaseContext {
    /// Seconds since the experiment started.
    ElapsedSecs(f64),
    /// Fraction of device capacity in use, in [0, 1].
    DiskUtilization(f64),
}

/// Wire form of [`PhaseContext`]: exactly one field is set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
#[doc(hidden)]
pub struct PhaseContextRepr {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elapsed_secs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    disk_utilization: Option<f64>,
}

impl TryFrom<PhaseContextRepr> for PhaseContext {
    type Error = Error;

    fn try_from(repr: PhaseContextRepr) -> Result<Self> {
        match (repr.elapsed_secs, repr.disk_utilization) {
            (Some(secs), None) => Ok(PhaseContext::ElapsedSecs(secs)),
            (None, Some(u)) => Ok(PhaseContext::DiskUtilization(u)),
            (Some(_), Some(_)) => Err(Error::Validation(
                "phase context sets both elapsed_secs and disk_utilization".to_string(),
            )),
            (None, None) => Err(Error::Validation(
                "phase context needs elapsed_secs or disk_utilization".to_string(),
            )),
        }
    }
}

impl From<PhaseContext> for PhaseContextRepr {
    fn from(context: PhaseContext) -> Self {
        match context {
            PhaseContext::ElapsedSecs(secs) => Self {
                elapsed_secs: Some(secs),
                ..Self::default()
            },
            PhaseContext::DiskUtilization(u) => Self {
                disk_utilization: Some(u),
                ..Self::default()
            },
        }
    }
}

/// Boundaries between phases on one scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Values at or above this are at least transitional.
    pub transitional_at: f64,
    /// Values strictly above this are stable.
    pub stable_at: f64,
}

impl PhaseThresholds {
    fn classify(&self, value: f64) -> Phase {
        if value < self.transitional_at {
            Phase::Initial
        } else if value <= self.stable_at {
            Phase::Transitional
        } else {
            Phase::Stable
        }
    }

    fn validate(&self, scale: &str, upper_bound: Option<f64>) -> Result<()> {
        let (t, s) = (self.transitional_at, self.stable_at);
        if !t.is_finite() || !s.is_finite() || t < 0.0 || t > s {
            return Err(Error::Config(format!(
                "{} thresholds must satisfy 0 <= transitional_at ({}) <= stable_at ({})",
                scale, t, s
            )));
        }
        if let Some(bound) = upper_bound {
            if s > bound {
                return Err(Error::Config(format!(
                    "{} stable_at ({}) must be <= {}",
                    scale, s, bound
                )));
            }
        }
        Ok(())
    }
}

/// Per-phase efficiency and optional observed bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseProfile {
    /// Multiplicative throughput factor in (0, 1].
    pub efficiency_factor: f64,
    /// Observed device bandwidth substituted for the calibrated envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_bandwidth: Option<BandwidthSnapshot>,
}

impl PhaseProfile {
    pub fn new(efficiency_factor: f64) -> Self {
        Self {
            efficiency_factor,
            degraded_bandwidth: None,
        }
    }

    fn validate(&self, phase: Phase) -> Result<()> {
        let e = self.efficiency_factor;
        if !e.is_finite() || e <= 0.0 || e > 1.0 {
            return Err(Error::Config(format!(
                "{} efficiency_factor ({}) must be in (0.0, 1.0]",
                phase, e
            )));
        }
        if let Some(snapshot) = &self.degraded_bandwidth {
            let ok = |bw: f64| bw.is_finite() && bw >= 0.0;
            if !ok(snapshot.read_bw) || !ok(snapshot.write_bw) {
                return Err(Error::Config(format!(
                    "{} degraded_bandwidth must be finite and >= 0",
                    phase
                )));
            }
        }
        Ok(())
    }
}

/// Phase classifier configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Thresholds on disk utilization (fractions, default 0.30 / 0.70).
    pub utilization: PhaseThresholds,
    /// Thresholds on elapsed seconds (default 600 / 1800).
    pub elapsed_secs: PhaseThresholds,
    pub initial: PhaseProfile,
    pub transitional: PhaseProfile,
    pub stable: PhaseProfile,
    /// Interpolate efficiency linearly across phase boundaries instead of
    /// stepping.
    pub interpolate_efficiency: bool,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            utilization: PhaseThresholds {
                transitional_at: 0.30,
                stable_at: 0.70,
            },
            elapsed_secs: PhaseThresholds {
                transitional_at: 600.0,
                stable_at: 1800.0,
            },
            initial: PhaseProfile::new(1.0),
            transitional: PhaseProfile::new(0.75),
            stable: PhaseProfile::new(0.5),
            interpolate_efficiency: false,
        }
    }
}

impl PhaseConfig {
    pub fn validate(&self) -> Result<()> {
        self.utilization.validate("utilization", Some(1.0))?;
        self.elapsed_secs.validate("elapsed_secs", None)?;
        self.initial.validate(Phase::Initial)?;
        self.transitional.validate(Phase::Transitional)?;
        self.stable.validate(Phase::Stable)?;
        Ok(())
    }

    /// Returns the configured profile for `phase`.
    pub fn profile(&self, phase: Phase) -> &PhaseProfile {
        match phase {
            Phase::Initial => &self.initial,
            Phase::Transitional => &self.transitional,
            Phase::Stable => &self.stable,
        }
    }
}

/// Outcome of classifying one context.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPhase {
    pub phase: Phase,
    pub efficiency_factor: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_bandwidth: Option<BandwidthSnapshot>,
}

/// Stateless phase classifier.
#[derive(Debug, Clone)]
pub struct PhaseModel {
    config: PhaseConfig,
}

impl PhaseModel {
    pub fn new(config: PhaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Classifies `context` into a phase with its efficiency factor.
    pub fn classify(&self, context: PhaseContext) -> Result<ClassifiedPhase> {
        let (value, thresholds) = match context {
            PhaseContext::DiskUtilization(u) => {
                if !u.is_finite() || !(0.0..=1.0).contains(&u) {
                    return Err(Error::Validation(format!(
                        "disk utilization {} outside [0.0, 1.0]",
                        u
                    )));
                }
                (u, &self.config.utilization)
            }
            PhaseContext::ElapsedSecs(secs) => {
                if !secs.is_finite() || secs < 0.0 {
                    return Err(Error::Validation(format!(
                        "elapsed seconds must be finite and >= 0, got {}",
                        secs
                    )));
                }
                (secs, &self.config.elapsed_secs)
            }
        };

        let phase = thresholds.classify(value);
        let profile = self.config.profile(phase);
        let efficiency_factor = if self.config.interpolate_efficiency {
            self.interpolated_efficiency(value, thresholds)
        } else {
            profile.efficiency_factor
        };

        Ok(ClassifiedPhase {
            phase,
            efficiency_factor,
            degraded_bandwidth: profile.degraded_bandwidth,
        })
    }

    /// Piecewise-linear efficiency through three anchors: the initial factor
    /// at `transitional_at`, the transitional factor at the band midpoint,
    /// and the stable factor at `stable_at`. Flat outside the anchors.
    fn interpolated_efficiency(&self, value: f64, thresholds: &PhaseThresholds) -> f64 {
        let (t, s) = (thresholds.transitional_at, thresholds.stable_at);
        let mid = (t + s) / 2.0;
        let anchors = [
            (t, self.config.initial.efficiency_factor),
            (mid, self.config.transitional.efficiency_factor),
            (s, self.config.stable.efficiency_factor),
        ];

        if value <= anchors[0].0 {
            return anchors[0].1;
        }
        for pair in anchors.windows(2) {
            let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
            if value <= x1 {
                if x1 <= x0 {
                    return y1;
                }
                return y0 + (y1 - y0) * (value - x0) / (x1 - x0);
            }
        }
        anchors[2].1
    }
}

/// Caller-side tracker that keeps a monitored session's phase moving
/// forward only.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    furthest: Option<ClassifiedPhase>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifies `context`; if the result is earlier than a phase already
    /// seen, the furthest phase is returned instead.
    pub fn observe(&mut self, model: &PhaseModel, context: PhaseContext) -> Result<ClassifiedPhase> {
        let classified = model.classify(context)?;

        match self.furthest {
            Some(furthest) if classified.phase < furthest.phase => {
                tracing::debug!(
                    classified = %classified.phase,
                    holding = %furthest.phase,
                    "phase regression suppressed"
                );
                Ok(furthest)
            }
            _ => {
                self.furthest = Some(classified);
                Ok(classified)
            }
        }
    }

    /// Furthest phase observed so far.
    pub fn current(&self) -> Option<Phase> {
        self.furthest.map(|c| c.phase)
    }

    pub fn reset(&mut self) {
        self.furthest = None;
    }
}
