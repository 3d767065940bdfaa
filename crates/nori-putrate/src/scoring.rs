//! Prediction scoring against measured throughput.
//!
//! ```text
//! relative_error_pct = |predicted - measured| / measured * 100
//! ```
//!
//! Accuracy classes use one canonical, configurable mapping:
//!
//! | relative error | class     |
//! |----------------|-----------|
//! | <= 10%         | excellent |
//! | <= 20%         | good      |
//! | <= 50%         | fair      |
//! | otherwise      | poor      |
use crate::error::{Error, Result};
use crate::estimator::PredictionResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Accuracy grade of a single prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccuracyClass {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl fmt::Display for AccuracyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccuracyClass::Excellent => "excellent",
            AccuracyClass::Good => "good",
            AccuracyClass::Fair => "fair",
            AccuracyClass::Poor => "poor",
        };
        f.write_str(name)
    }
}

/// Inclusive upper bounds (percent) for each accuracy class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyThresholds {
    pub excellent_pct: f64,
    pub good_pct: f64,
    pub fair_pct: f64,
}

impl Default for AccuracyThresholds {
    fn default() -> Self {
        Self {
            excellent_pct: 10.0,
            good_pct: 20.0,
            fair_pct: 50.0,
        }
    }
}

impl AccuracyThresholds {
    pub fn validate(&self) -> Result<()> {
        let (e, g, f) = (self.excellent_pct, self.good_pct, self.fair_pct);
        if !(e.is_finite() && g.is_finite() && f.is_finite()) || e < 0.0 || e > g || g > f {
            return Err(Error::Config(format!(
                "accuracy thresholds must satisfy 0 <= excellent ({}) <= good ({}) <= fair ({})",
                e, g, f
            )));
        }
        Ok(())
    }

    pub fn classify(&self, relative_error_pct: f64) -> AccuracyClass {
        if relative_error_pct <= self.excellent_pct {
            AccuracyClass::Excellent
        } else if relative_error_pct <= self.good_pct {
            AccuracyClass::Good
        } else if relative_error_pct <= self.fair_pct {
            AccuracyClass::Fair
        } else {
            AccuracyClass::Poor
        }
    }
}

/// Prediction vs. one measured value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub predicted: f64,
    pub actual: f64,
    pub absolute_error: f64,
    pub relative_error_pct: f64,
    pub accuracy_class: AccuracyClass,
}

impl ValidationResult {
    /// Positive when the prediction overshoots the measurement.
    pub fn signed_error_pct(&self) -> f64 {
        (self.predicted - self.actual) * 100.0 / self.actual
    }
}

/// Reduction over several [`ValidationResult`]s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorAggregate {
    pub count: usize,
    pub mean_relative_error_pct: f64,
    pub min_relative_error_pct: f64,
    pub max_relative_error_pct: f64,
    /// Mean of signed errors; positive means the model over-predicts.
    pub mean_signed_error_pct: f64,
    /// Class of the mean relative error.
    pub accuracy_class: AccuracyClass,
}

impl ErrorAggregate {
    /// Reduces `results`; `None` when empty.
    pub fn from_results(results: &[ValidationResult], thresholds: &AccuracyThresholds) -> Option<Self> {
        if results.is_empty() {
            return None;
        }

        let count = results.len();
        let mut sum = 0.0;
        let mut signed_sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for r in results {
            sum += r.relative_error_pct;
            signed_sum += r.signed_error_pct();
            min = min.min(r.relative_error_pct);
            max = max.max(r.relative_error_pct);
        }

        let mean = sum / count as f64;
        Some(Self {
            count,
            mean_relative_error_pct: mean,
            min_relative_error_pct: min,
            max_relative_error_pct: max,
            mean_signed_error_pct: signed_sum / count as f64,
            accuracy_class: thresholds.classify(mean),
        })
    }
}

/// Per-point results plus their aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesScore {
    pub points: Vec<ValidationResult>,
    pub aggregate: ErrorAggregate,
}

/// Grades predictions against measurements.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    thresholds: AccuracyThresholds,
}

impl Scorer {
    pub fn new(thresholds: AccuracyThresholds) -> Result<Self> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &AccuracyThresholds {
        &self.thresholds
    }

    /// Scores a prediction against one measured throughput.
    pub fn score(&self, prediction: &PredictionResult, measured: f64) -> Result<ValidationResult> {
        self.score_value(prediction.predicted_throughput, measured)
    }

    /// Scores a raw predicted value against one measured throughput.
    pub fn score_value(&self, predicted: f64, measured: f64) -> Result<ValidationResult> {
        if measured == 0.0 {
            return Err(Error::DivisionByZero(
                "relative error is undefined for a measured throughput of 0".to_string(),
            ));
        }
        if !measured.is_finite() || measured < 0.0 {
            return Err(Error::Validation(format!(
                "measured throughput must be finite and > 0, got {}",
                measured
            )));
        }
        if !predicted.is_finite() {
            return Err(Error::Validation(format!(
                "predicted throughput must be finite, got {}",
                predicted
            )));
        }

        let absolute_error = (predicted - measured).abs();
        let relative_error_pct = absolute_error * 100.0 / measured;

        Ok(ValidationResult {
            predicted,
            actual: measured,
            absolute_error,
            relative_error_pct,
            accuracy_class: self.thresholds.classify(relative_error_pct),
        })
    }

    /// Scores one prediction against every value of a measured series.
    pub fn score_series(&self, prediction: &PredictionResult, measured: &[f64]) -> Result<SeriesScore> {
        let points = measured
            .iter()
            .map(|m| self.score(prediction, *m))
            .collect::<Result<Vec<_>>>()?;

        let aggregate = ErrorAggregate::from_results(&points, &self.thresholds)
            .ok_or_else(|| Error::Validation("measured series is empty".to_string()))?;

        Ok(SeriesScore { points, aggregate })
    }
}
