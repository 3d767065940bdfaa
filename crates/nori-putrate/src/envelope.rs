//! Device envelope: achievable bandwidth as a function of access pattern.
//!
//! A [`CalibrationGrid`] holds measured read and write bandwidth over four
//! axes (read ratio, queue depth, concurrency, block size). Queries between
//! measured values are answered by multilinear interpolation over all four
//! axes; queries exactly on a measured point reproduce that point bit for
//! bit.
//!
//! # Saturation
//!
//! The grid never extrapolates. A query outside an axis range is either
//! clamped to the nearest boundary ([`SaturationPolicy::Clamp`], reported in
//! [`EnvelopeBandwidth::clamped`]) or rejected with
//! [`Error::CalibrationGap`] ([`SaturationPolicy::Reject`]).
//!
//! # Mixed workloads
//!
//! Reads and writes contend for the same device queue, so the blended
//! bandwidth is the I/O-share weighted harmonic mean:
//!
//! ```text
//! mixed_bw = 1 / (read_share / read_bw + write_share / write_bw)
//! ```
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One axis of the calibration grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridAxis {
    ReadRatio,
    QueueDepth,
    Concurrency,
    BlockSize,
}

impl GridAxis {
    /// Axes in grid storage order.
    pub const ALL: [GridAxis; 4] = [
        GridAxis::ReadRatio,
        GridAxis::QueueDepth,
        GridAxis::Concurrency,
        GridAxis::BlockSize,
    ];

    fn index(self) -> usize {
        match self {
            GridAxis::ReadRatio => 0,
            GridAxis::QueueDepth => 1,
            GridAxis::Concurrency => 2,
            GridAxis::BlockSize => 3,
        }
    }
}

impl fmt::Display for GridAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GridAxis::ReadRatio => "read_ratio",
            GridAxis::QueueDepth => "queue_depth",
            GridAxis::Concurrency => "concurrency",
            GridAxis::BlockSize => "block_size",
        };
        f.write_str(name)
    }
}

/// What to do with a query outside the measured axis range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaturationPolicy {
    /// Snap to the nearest boundary value and report the axis.
    #[default]
    Clamp,
    /// Fail with [`Error::CalibrationGap`].
    Reject,
}

/// A single measured calibration point (bandwidth in bytes/sec).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub read_ratio: f64,
    pub queue_depth: u32,
    pub concurrency: u32,
    pub block_size: u64,
    pub read_bw: f64,
    pub write_bw: f64,
}

/// Dense, immutable 4-axis bandwidth grid.
///
/// Serialized as the flat list of [`CalibrationPoint`]s it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CalibrationPoint>", into = "Vec<CalibrationPoint>")]
pub struct CalibrationGrid {
    /// Sorted distinct values per axis, in [`GridAxis::ALL`] order.
    axes: [Vec<f64>; 4],
    read_bw: Vec<f64>,
    write_bw: Vec<f64>,
}

impl CalibrationGrid {
    /// Builds a grid from measured points.
    ///
    /// Every combination of the distinct axis values must be measured
    /// exactly once.
    pub fn from_points(points: Vec<CalibrationPoint>) -> Result<Self> {
        if points.is_empty() {
            return Err(Error::Config("calibration grid has no points".to_string()));
        }

        for p in &points {
            if !p.read_ratio.is_finite() || !(0.0..=1.0).contains(&p.read_ratio) {
                return Err(Error::Config(format!(
                    "calibration read_ratio {} outside [0.0, 1.0]",
                    p.read_ratio
                )));
            }
            if !p.read_bw.is_finite() || p.read_bw < 0.0 || !p.write_bw.is_finite() || p.write_bw < 0.0
            {
                return Err(Error::Config(format!(
                    "calibration bandwidth must be finite and >= 0 (read_bw={}, write_bw={})",
                    p.read_bw, p.write_bw
                )));
            }
        }

        let axes = GridAxis::ALL.map(|axis| {
            let mut values: Vec<f64> = points.iter().map(|p| coordinate(p, axis)).collect();
            values.sort_by(f64::total_cmp);
            values.dedup();
            values
        });

        let cells: usize = axes.iter().map(Vec::len).product();
        let mut read_bw = vec![0.0; cells];
        let mut write_bw = vec![0.0; cells];
        let mut filled = vec![false; cells];

        let mut grid = Self {
            axes,
            read_bw: Vec::new(),
            write_bw: Vec::new(),
        };

        for p in &points {
            let idx = GridAxis::ALL.map(|axis| {
                let values = &grid.axes[axis.index()];
                values.partition_point(|v| *v < coordinate(p, axis))
            });
            let flat = grid.flat_index(idx);
            if filled[flat] {
                return Err(Error::Config(format!(
                    "duplicate calibration point at read_ratio={}, queue_depth={}, concurrency={}, block_size={}",
                    p.read_ratio, p.queue_depth, p.concurrency, p.block_size
                )));
            }
            filled[flat] = true;
            read_bw[flat] = p.read_bw;
            write_bw[flat] = p.write_bw;
        }

        if let Some(missing) = filled.iter().position(|f| !f) {
            let idx = grid.unflatten(missing);
            return Err(Error::Config(format!(
                "calibration grid is sparse: no point at read_ratio={}, queue_depth={}, concurrency={}, block_size={}",
                grid.axes[0][idx[0]], grid.axes[1][idx[1]], grid.axes[2][idx[2]], grid.axes[3][idx[3]]
            )));
        }

        grid.read_bw = read_bw;
        grid.write_bw = write_bw;
        Ok(grid)
    }

    /// Sorted distinct values measured on `axis`.
    pub fn axis_values(&self, axis: GridAxis) -> &[f64] {
        &self.axes[axis.index()]
    }

    /// Number of distinct values per axis, in [`GridAxis::ALL`] order.
    pub fn dimensions(&self) -> [usize; 4] {
        [
            self.axes[0].len(),
            self.axes[1].len(),
            self.axes[2].len(),
            self.axes[3].len(),
        ]
    }

    /// Number of measured points.
    pub fn len(&self) -> usize {
        self.read_bw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_bw.is_empty()
    }

    /// All measured points in storage order.
    pub fn points(&self) -> Vec<CalibrationPoint> {
        (0..self.len())
            .map(|flat| {
                let idx = self.unflatten(flat);
                CalibrationPoint {
                    read_ratio: self.axes[0][idx[0]],
                    queue_depth: self.axes[1][idx[1]] as u32,
                    concurrency: self.axes[2][idx[2]] as u32,
                    block_size: self.axes[3][idx[3]] as u64,
                    read_bw: self.read_bw[flat],
                    write_bw: self.write_bw[flat],
                }
            })
            .collect()
    }

    fn flat_index(&self, idx: [usize; 4]) -> usize {
        ((idx[0] * self.axes[1].len() + idx[1]) * self.axes[2].len() + idx[2]) * self.axes[3].len()
            + idx[3]
    }

    fn unflatten(&self, mut flat: usize) -> [usize; 4] {
        let mut idx = [0usize; 4];
        for axis in (0..4).rev() {
            let len = self.axes[axis].len();
            idx[axis] = flat % len;
            flat /= len;
        }
        idx
    }

    /// Multilinear interpolation of (read_bw, write_bw) over the 16 corners
    /// of the enclosing hypercube. Zero-weight corners are skipped so that
    /// on-grid queries return the stored values unchanged.
    fn interpolate(&self, brackets: &[Bracket; 4]) -> (f64, f64) {
        let mut read = 0.0;
        let mut write = 0.0;

        for corner in 0..16u32 {
            let mut weight = 1.0;
            let mut idx = [0usize; 4];

            for (axis, b) in brackets.iter().enumerate() {
                if (corner >> axis) & 1 == 1 {
                    weight *= b.t;
                    idx[axis] = b.hi;
                } else {
                    weight *= 1.0 - b.t;
                    idx[axis] = b.lo;
                }
            }

            if weight == 0.0 {
                continue;
            }

            let flat = self.flat_index(idx);
            read += weight * self.read_bw[flat];
            write += weight * self.write_bw[flat];
        }

        (read, write)
    }
}

impl TryFrom<Vec<CalibrationPoint>> for CalibrationGrid {
    type Error = Error;

    fn try_from(points: Vec<CalibrationPoint>) -> Result<Self> {
        Self::from_points(points)
    }
}

impl From<CalibrationGrid> for Vec<CalibrationPoint> {
    fn from(grid: CalibrationGrid) -> Self {
        grid.points()
    }
}

fn coordinate(p: &CalibrationPoint, axis: GridAxis) -> f64 {
    match axis {
        GridAxis::ReadRatio => p.read_ratio,
        GridAxis::QueueDepth => p.queue_depth as f64,
        GridAxis::Concurrency => p.concurrency as f64,
        GridAxis::BlockSize => p.block_size as f64,
    }
}

/// Interpolation bracket on one axis: value = lerp(values[lo], values[hi], t).
#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: usize,
    hi: usize,
    t: f64,
}

impl Bracket {
    /// `v` must already lie within `[values[0], values[last]]`.
    fn locate(values: &[f64], v: f64) -> Self {
        let upper = values.partition_point(|x| *x <= v);
        if upper == 0 {
            return Bracket { lo: 0, hi: 0, t: 0.0 };
        }
        let lo = upper - 1;
        if values[lo] == v || upper == values.len() {
            return Bracket { lo, hi: lo, t: 0.0 };
        }
        let hi = upper;
        let t = (v - values[lo]) / (values[hi] - values[lo]);
        Bracket { lo, hi, t }
    }
}

/// An envelope query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeQuery {
    /// Share of I/Os that are reads, in [0, 1].
    pub read_ratio: f64,
    pub queue_depth: u32,
    pub concurrency: u32,
    pub block_size: u64,
}

/// Interpolated bandwidth for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeBandwidth {
    pub read_bw: f64,
    pub write_bw: f64,
    /// Harmonic blend of `read_bw` and `write_bw` at the query's read ratio.
    pub mixed_bw: f64,
    /// Axes whose query value was snapped to the grid boundary.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clamped: Vec<GridAxis>,
}

/// An observed (not modeled) device bandwidth, e.g. measured on a
/// well-aged device late in an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandwidthSnapshot {
    pub read_bw: f64,
    pub write_bw: f64,
}

impl BandwidthSnapshot {
    /// Blended bandwidth of this snapshot for the given read share.
    pub fn mixed(&self, read_share: f64) -> f64 {
        mixed_bandwidth(read_share, self.read_bw, self.write_bw)
    }
}

/// I/O-share weighted harmonic mean of read and write bandwidth.
///
/// Degenerates to `write_bw` at `read_share <= 0` and `read_bw` at
/// `read_share >= 1`. A zero bandwidth carrying a positive share yields 0.
pub fn mixed_bandwidth(read_share: f64, read_bw: f64, write_bw: f64) -> f64 {
    if read_share <= 0.0 {
        return write_bw;
    }
    if read_share >= 1.0 {
        return read_bw;
    }
    if read_bw <= 0.0 || write_bw <= 0.0 {
        return 0.0;
    }
    1.0 / (read_share / read_bw + (1.0 - read_share) / write_bw)
}

/// Interpolating view over a [`CalibrationGrid`].
#[derive(Debug, Clone)]
pub struct DeviceEnvelope {
    grid: CalibrationGrid,
    saturation: SaturationPolicy,
}

impl DeviceEnvelope {
    pub fn new(grid: CalibrationGrid, saturation: SaturationPolicy) -> Self {
        Self { grid, saturation }
    }

    pub fn grid(&self) -> &CalibrationGrid {
        &self.grid
    }

    pub fn saturation(&self) -> SaturationPolicy {
        self.saturation
    }

    /// Returns interpolated read, write and mixed bandwidth for `query`.
    pub fn bandwidth(&self, query: &EnvelopeQuery) -> Result<EnvelopeBandwidth> {
        if !query.read_ratio.is_finite() || !(0.0..=1.0).contains(&query.read_ratio) {
            return Err(Error::Validation(format!(
                "read_ratio {} outside [0.0, 1.0]",
                query.read_ratio
            )));
        }

        let mut clamped = Vec::new();
        let coords = [
            query.read_ratio,
            query.queue_depth as f64,
            query.concurrency as f64,
            query.block_size as f64,
        ];

        let mut resolved = coords;
        let mut brackets = [Bracket { lo: 0, hi: 0, t: 0.0 }; 4];
        for axis in GridAxis::ALL {
            let v = self.resolve(axis, coords[axis.index()], &mut clamped)?;
            resolved[axis.index()] = v;
            brackets[axis.index()] = Bracket::locate(self.grid.axis_values(axis), v);
        }

        // Blend at the snapped read ratio so a clamped query stays on the boundary.
        let (read_bw, write_bw) = self.grid.interpolate(&brackets);
        let read_share = resolved[GridAxis::ReadRatio.index()];
        let mixed_bw = mixed_bandwidth(read_share, read_bw, write_bw);

        tracing::trace!(
            read_ratio = query.read_ratio,
            queue_depth = query.queue_depth,
            concurrency = query.concurrency,
            block_size = query.block_size,
            read_bw,
            write_bw,
            mixed_bw,
            "envelope query"
        );

        Ok(EnvelopeBandwidth {
            read_bw,
            write_bw,
            mixed_bw,
            clamped,
        })
    }

    /// Applies the saturation policy to one coordinate.
    fn resolve(&self, axis: GridAxis, v: f64, clamped: &mut Vec<GridAxis>) -> Result<f64> {
        let values = self.grid.axis_values(axis);
        let (min, max) = (values[0], values[values.len() - 1]);

        if v >= min && v <= max {
            return Ok(v);
        }

        match self.saturation {
            SaturationPolicy::Reject => Err(Error::CalibrationGap {
                axis,
                value: v,
                min,
                max,
            }),
            SaturationPolicy::Clamp => {
                let snapped = v.clamp(min, max);
                tracing::debug!(%axis, value = v, snapped, "envelope query clamped to grid boundary");
                clamped.push(axis);
                Ok(snapped)
            }
        }
    }
}
