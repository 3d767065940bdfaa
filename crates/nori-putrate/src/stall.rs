//! Write-stall efficiency model.
//!
//! A stall is a bounded blend between "no effect" and "full effect", never a
//! raw fraction applied to throughput:
//!
//! ```text
//! stall_factor = (1 - p) * 1.0 + p * impact
//! ```
//!
//! where `p` is the probability that a write lands in a stall and `impact`
//! is the fraction of throughput that survives during one.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Stall policy input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StallProfile {
    /// Probability a write is issued during a stall, in [0, 1].
    pub stall_probability: f64,
    /// Mean stall length in seconds. Informational; not part of the factor.
    #[serde(default)]
    pub mean_stall_secs: f64,
    /// Throughput retained while stalled, in [0, 1].
    pub impact_factor: f64,
}

impl Default for StallProfile {
    /// No stalls.
    fn default() -> Self {
        Self {
            stall_probability: 0.0,
            mean_stall_secs: 0.0,
            impact_factor: 1.0,
        }
    }
}

/// Cumulative stall counters as reported by an engine's statistics dump.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StallCounters {
    /// Total time writes were stalled.
    pub stalled_secs: f64,
    /// Length of the observation window.
    pub observation_secs: f64,
    /// Number of distinct stall episodes.
    pub stall_events: u64,
}

impl StallProfile {
    /// Derives a profile from cumulative stall counters.
    pub fn from_counters(counters: &StallCounters, impact_factor: f64) -> Result<Self> {
        let StallCounters {
            stalled_secs,
            observation_secs,
            stall_events,
        } = *counters;

        if !observation_secs.is_finite() || observation_secs <= 0.0 {
            return Err(Error::InvalidProfile(format!(
                "observation window must be > 0 seconds, got {}",
                observation_secs
            )));
        }
        if !stalled_secs.is_finite() || stalled_secs < 0.0 || stalled_secs > observation_secs {
            return Err(Error::InvalidProfile(format!(
                "stalled time {}s outside observation window [0, {}]s",
                stalled_secs, observation_secs
            )));
        }

        let mean_stall_secs = if stall_events == 0 {
            0.0
        } else {
            stalled_secs / stall_events as f64
        };

        let profile = Self {
            stall_probability: stalled_secs / observation_secs,
            mean_stall_secs,
            impact_factor,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Checks field ranges. A profile whose factor would be zero (certain
    /// stall with total suppression) is rejected.
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);

        if !in_unit(self.stall_probability) {
            return Err(Error::InvalidProfile(format!(
                "stall_probability {} outside [0.0, 1.0]",
                self.stall_probability
            )));
        }
        if !in_unit(self.impact_factor) {
            return Err(Error::InvalidProfile(format!(
                "impact_factor {} outside [0.0, 1.0]",
                self.impact_factor
            )));
        }
        if !self.mean_stall_secs.is_finite() || self.mean_stall_secs < 0.0 {
            return Err(Error::InvalidProfile(format!(
                "mean_stall_secs must be finite and >= 0, got {}",
                self.mean_stall_secs
            )));
        }
        if self.blended() <= 0.0 {
            return Err(Error::InvalidProfile(
                "certain stall with zero impact_factor suppresses all writes".to_string(),
            ));
        }
        Ok(())
    }

    /// `(1 - p) + p * impact`, arranged as `1 - p * (1 - impact)` so the
    /// result cannot round above 1.
    fn blended(&self) -> f64 {
        1.0 - self.stall_probability * (1.0 - self.impact_factor)
    }
}

/// Returns the availability multiplier in (0, 1] for `profile`.
pub fn stall_factor(profile: &StallProfile) -> Result<f64> {
    profile.validate()?;
    Ok(profile.blended())
}
