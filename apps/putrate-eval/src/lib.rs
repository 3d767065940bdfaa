//! Batch evaluation front end for the put-rate model.

pub mod config;
pub mod report;

pub use config::{ConfigError, EvalConfig};
pub use report::{ExperimentReport, RunReport, RunSummary};
