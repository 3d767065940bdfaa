//! Per-level compaction accounting.
//!
//! Turns the byte counters an LSM engine reports per level into write and
//! read amplification:
//!
//! ```text
//! WA_L = (flush_bytes_L + compaction_write_bytes_L) / flush_bytes_L
//! RA_L = compaction_read_bytes_L / flush_bytes_L
//! ```
//!
//! Aggregates divide summed numerators by summed flush bytes, so levels are
//! weighted by the volume they actually moved. The naive mean of per-level
//! ratios is kept alongside for comparison.
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Byte counters for one LSM level over an observation window.
///
/// Counters are `f64` because compaction statistics are commonly reported
/// in fractional GB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: u32,
    pub flush_bytes: f64,
    pub compaction_write_bytes: f64,
    pub compaction_read_bytes: f64,
    #[serde(default)]
    pub file_count: u64,
}

impl LevelStats {
    /// Compaction I/O (read + write) attributed to this level.
    pub fn compaction_io_bytes(&self) -> f64 {
        self.compaction_write_bytes + self.compaction_read_bytes
    }

    fn validate(&self) -> Result<()> {
        let counters = [
            ("flush_bytes", self.flush_bytes),
            ("compaction_write_bytes", self.compaction_write_bytes),
            ("compaction_read_bytes", self.compaction_read_bytes),
        ];
        for (name, value) in counters {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Validation(format!(
                    "L{} {} must be finite and >= 0, got {}",
                    self.level, name, value
                )));
            }
        }
        Ok(())
    }
}

/// How the estimator collapses per-level WA into one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaAggregation {
    /// Sum of numerators over sum of flush bytes.
    #[default]
    VolumeWeighted,
    /// Plain mean of per-level WA over levels with flush activity.
    LevelMean,
}

/// Amplification of a single level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelAmplification {
    pub level: u32,
    pub wa: f64,
    pub ra: f64,
    /// No bytes were flushed into this level; `wa` is pinned to 1.0 and
    /// `ra` to 0.0.
    pub no_activity: bool,
}

/// Derived amplification view of a set of [`LevelStats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmplificationSummary {
    pub per_level: Vec<LevelAmplification>,
    pub aggregate_wa: f64,
    pub aggregate_ra: f64,
    pub unweighted_mean_wa: f64,
    /// Level with the largest share of compaction I/O; `None` when no level
    /// did any compaction I/O.
    pub dominant_level: Option<u32>,
    /// Share of total compaction I/O carried by `dominant_level`.
    pub dominant_share: f64,
    /// No level had any flush activity.
    pub no_activity: bool,
}

impl AmplificationSummary {
    /// Aggregate WA under the requested convention.
    pub fn wa(&self, aggregation: WaAggregation) -> f64 {
        match aggregation {
            WaAggregation::VolumeWeighted => self.aggregate_wa,
            WaAggregation::LevelMean => self.unweighted_mean_wa,
        }
    }
}

/// Computes per-level and aggregate amplification.
///
/// Levels may arrive in any order but must form the dense sequence
/// `0..n`. Negative or non-finite counters are rejected before any
/// arithmetic.
pub fn amplification(level_stats: &[LevelStats]) -> Result<AmplificationSummary> {
    if level_stats.is_empty() {
        return Err(Error::Validation("level stats are empty".to_string()));
    }

    for stats in level_stats {
        stats.validate()?;
    }

    let mut levels: Vec<&LevelStats> = level_stats.iter().collect();
    levels.sort_by_key(|s| s.level);
    for (expected, stats) in levels.iter().enumerate() {
        if stats.level as usize != expected {
            return Err(Error::Validation(format!(
                "levels must be dense from L0: expected L{}, found L{}",
                expected, stats.level
            )));
        }
    }

    let mut per_level = Vec::with_capacity(levels.len());
    let mut flush_total = 0.0;
    let mut written_total = 0.0;
    let mut read_total = 0.0;
    let mut io_total = 0.0;
    let mut active_wa_sum = 0.0;
    let mut active_levels = 0usize;

    for stats in &levels {
        let level = if stats.flush_bytes > 0.0 {
            let wa = (stats.flush_bytes + stats.compaction_write_bytes) / stats.flush_bytes;
            active_wa_sum += wa;
            active_levels += 1;
            LevelAmplification {
                level: stats.level,
                wa,
                ra: stats.compaction_read_bytes / stats.flush_bytes,
                no_activity: false,
            }
        } else {
            LevelAmplification {
                level: stats.level,
                wa: 1.0,
                ra: 0.0,
                no_activity: true,
            }
        };
        per_level.push(level);

        flush_total += stats.flush_bytes;
        written_total += stats.flush_bytes + stats.compaction_write_bytes;
        read_total += stats.compaction_read_bytes;
        io_total += stats.compaction_io_bytes();
    }

    let no_activity = flush_total <= 0.0;
    let (aggregate_wa, aggregate_ra) = if no_activity {
        (1.0, 0.0)
    } else {
        (written_total / flush_total, read_total / flush_total)
    };

    let unweighted_mean_wa = if active_levels == 0 {
        1.0
    } else {
        active_wa_sum / active_levels as f64
    };

    // Strict comparison keeps the lowest level on ties.
    let mut dominant: Option<(u32, f64)> = None;
    if io_total > 0.0 {
        for stats in &levels {
            let share = stats.compaction_io_bytes() / io_total;
            if dominant.map_or(true, |(_, best)| share > best) {
                dominant = Some((stats.level, share));
            }
        }
    }

    Ok(AmplificationSummary {
        per_level,
        aggregate_wa,
        aggregate_ra,
        unweighted_mean_wa,
        dominant_level: dominant.map(|(level, _)| level),
        dominant_share: dominant.map_or(0.0, |(_, share)| share),
        no_activity,
    })
}
