//! Evaluation file configuration.
//!
//! Loads and validates an evaluation file from YAML: the model
//! configuration, the device calibration grid, and the experiments to run.

use nori_putrate::{CalibrationGrid, Experiment, ModelConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Evaluation file.
///
/// Example YAML:
/// ```yaml
/// model:
///   phases:
///     stable: { efficiency_factor: 0.5 }
///   workloads:
///     random_write: 0.02
/// calibration:
///   - { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096, read_bw: 0.0, write_bw: 1.5e9 }
///   - { read_ratio: 1.0, queue_depth: 16, concurrency: 1, block_size: 4096, read_bw: 3.2e9, write_bw: 0.0 }
/// experiments:
///   - name: fillrandom
///     workload: random_write
///     envelope: { read_ratio: 0.0, queue_depth: 16, concurrency: 1, block_size: 4096 }
///     level_stats:
///       - { level: 0, flush_bytes: 4.0e10, compaction_write_bytes: 4.0e10, compaction_read_bytes: 3.5e10 }
///     phase_context: { disk_utilization: 0.8 }
///     measured: [7.1e6, 6.8e6]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Device calibration points (must form a dense grid)
    pub calibration: CalibrationGrid,

    /// Experiments to evaluate
    #[serde(default)]
    pub experiments: Vec<Experiment>,
}

impl EvalConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: EvalConfig = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("Failed to parse YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model
            .validate()
            .map_err(|e| ConfigError::InvalidField(format!("model: {}", e)))?;

        let mut names = HashSet::new();
        for experiment in &self.experiments {
            if experiment.name.is_empty() {
                return Err(ConfigError::InvalidField(
                    "experiment name cannot be empty".to_string(),
                ));
            }

            if !names.insert(experiment.name.as_str()) {
                return Err(ConfigError::InvalidField(format!(
                    "duplicate experiment name: {}",
                    experiment.name
                )));
            }

            if !self.model.workloads.contains_key(&experiment.workload) {
                return Err(ConfigError::InvalidField(format!(
                    "experiment {} references unknown workload {}",
                    experiment.name, experiment.workload
                )));
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}
