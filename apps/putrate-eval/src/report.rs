//! Run report handed to the reporting collaborator as JSON.

use nori_putrate::{AccuracyClass, ExperimentOutcome, Result as ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExperimentOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Experiments per accuracy class of their measured-series aggregate.
    pub by_class: BTreeMap<AccuracyClass, usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub summary: RunSummary,
    pub experiments: Vec<ExperimentReport>,
}

impl RunReport {
    /// Pairs experiment names with their batch results (same order).
    pub fn from_results<'a>(
        names: impl IntoIterator<Item = &'a str>,
        results: Vec<ModelResult<ExperimentOutcome>>,
    ) -> Self {
        let mut summary = RunSummary::default();
        let mut experiments = Vec::with_capacity(results.len());

        for (name, result) in names.into_iter().zip(results) {
            summary.total += 1;
            match result {
                Ok(outcome) => {
                    summary.succeeded += 1;
                    if let Some(series) = &outcome.series {
                        *summary.by_class.entry(series.aggregate.accuracy_class).or_default() += 1;
                    }
                    experiments.push(ExperimentReport {
                        name: name.to_string(),
                        outcome: Some(outcome),
                        error: None,
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    experiments.push(ExperimentReport {
                        name: name.to_string(),
                        outcome: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        Self {
            summary,
            experiments,
        }
    }
}
