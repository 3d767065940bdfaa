use crate::amplification::{AmplificationSummary, WaAggregation};
use crate::envelope::SaturationPolicy;
use crate::error::{Error, Result};
use crate::phase::PhaseConfig;
use crate::scoring::AccuracyThresholds;
use crate::stall::StallProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Put-rate model configuration.
///
/// One immutable value passed explicitly to every component; nothing in the
/// engine reads process-wide state.
///
/// Example YAML:
/// ```yaml
/// envelope:
///   saturation: clamp
/// phases:
///   utilization: { transitional_at: 0.3, stable_at: 0.7 }
///   stable: { efficiency_factor: 0.5 }
/// amplification:
///   wa_weight: 1.0
///   aggregation: volume_weighted
/// stall:
///   stall_probability: 0.2
///   impact_factor: 0.5
/// workloads:
///   random_write: 0.02
///   sequential_write: 0.08
/// accuracy:
///   excellent_pct: 10.0
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Envelope query behavior
    pub envelope: EnvelopeConfig,

    /// Phase thresholds and per-phase efficiency
    pub phases: PhaseConfig,

    /// Amplification penalty weights
    pub amplification: AmplificationConfig,

    /// Stall profile used when an experiment does not supply one
    pub stall: StallProfile,

    /// Base efficiency per workload type, each in (0.0, 1.0]
    pub workloads: BTreeMap<String, f64>,

    /// Accuracy class cutoffs
    pub accuracy: AccuracyThresholds,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Out-of-range query handling (default: clamp)
    pub saturation: SaturationPolicy,
}

/// Weights for the amplification penalty.
///
/// ```text
/// penalty = wa_weight * (WA - 1) + ra_weight * RA
/// factor  = 1 / (1 + penalty)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplificationConfig {
    /// Weight of write amplification above 1.0 (default: 1.0)
    pub wa_weight: f64,

    /// Weight of read amplification (default: 0.0)
    pub ra_weight: f64,

    /// Per-level WA aggregation (default: volume_weighted)
    pub aggregation: WaAggregation,
}

impl Default for AmplificationConfig {
    fn default() -> Self {
        Self {
            wa_weight: 1.0,
            ra_weight: 0.0,
            aggregation: WaAggregation::VolumeWeighted,
        }
    }
}

impl AmplificationConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, w) in [("wa_weight", self.wa_weight), ("ra_weight", self.ra_weight)] {
            if !w.is_finite() || w < 0.0 {
                return Err(Error::Config(format!(
                    "amplification {} must be finite and >= 0, got {}",
                    name, w
                )));
            }
        }
        Ok(())
    }

    /// Weighted penalty for `summary`; never negative.
    pub fn penalty(&self, summary: &AmplificationSummary) -> f64 {
        let wa = summary.wa(self.aggregation);
        self.wa_weight * (wa - 1.0).max(0.0) + self.ra_weight * summary.aggregate_ra
    }

    /// Amplification-adjusted efficiency in (0, 1].
    pub fn factor(&self, summary: &AmplificationSummary) -> f64 {
        1.0 / (1.0 + self.penalty(summary))
    }
}

impl ModelConfig {
    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        self.phases.validate()?;
        self.amplification.validate()?;

        self.stall
            .validate()
            .map_err(|e| Error::Config(format!("default stall profile: {}", e)))?;

        for (name, efficiency) in &self.workloads {
            if !efficiency.is_finite() || *efficiency <= 0.0 || *efficiency > 1.0 {
                return Err(Error::Config(format!(
                    "workload {} base efficiency ({}) must be in (0.0, 1.0]",
                    name, efficiency
                )));
            }
        }

        self.accuracy.validate()?;
        Ok(())
    }

    /// Returns the base efficiency configured for `workload`.
    pub fn workload_efficiency(&self, workload: &str) -> Result<f64> {
        self.workloads
            .get(workload)
            .copied()
            .ok_or_else(|| Error::Config(format!("unknown workload: {}", workload)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amplification::{amplification, LevelStats};

    #[test]
    fn test_default_config_validates() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.envelope.saturation, SaturationPolicy::Clamp);
        assert!(config.workloads.is_empty());
    }

    #[test]
    fn test_invalid_workload_efficiency() {
        let mut config = ModelConfig::default();
        config.workloads.insert("random_write".to_string(), 1.5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_default_stall() {
        let mut config = ModelConfig::default();
        config.stall.stall_probability = 2.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = ModelConfig::default();
        config.amplification.wa_weight = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_workload_lookup() {
        let mut config = ModelConfig::default();
        config.workloads.insert("random_write".to_string(), 0.02);
        assert_eq!(config.workload_efficiency("random_write").unwrap(), 0.02);
        assert!(config.workload_efficiency("scan").is_err());
    }

    #[test]
    fn test_amplification_factor() {
        let summary = amplification(&[LevelStats {
            level: 0,
            flush_bytes: 100.0,
            compaction_write_bytes: 100.0,
            compaction_read_bytes: 300.0,
            file_count: 4,
        }])
        .unwrap();

        let config = AmplificationConfig::default();
        assert_eq!(config.penalty(&summary), 1.0);
        assert_eq!(config.factor(&summary), 0.5);

        let with_reads = AmplificationConfig {
            ra_weight: 0.5,
            ..AmplificationConfig::default()
        };
        // 1.0 * (2 - 1) + 0.5 * 3 = 2.5
        assert_eq!(with_reads.penalty(&summary), 2.5);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "workloads:\n  random_write: 0.02\nphases:\n  stable:\n    efficiency_factor: 0.4\n";
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.phases.stable.efficiency_factor, 0.4);
        assert_eq!(config.phases.utilization.stable_at, 0.70);
        assert_eq!(config.amplification.wa_weight, 1.0);
        assert_eq!(config.accuracy.excellent_pct, 10.0);
    }
}
