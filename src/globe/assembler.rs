use rayon::iter::{IntoParallelIterator, ParallelIterator};
use serde::Serialize;

use super::column::{build_column, Column, COLUMN_INDICES, INDICES_PER_COLUMN, VERTICES_PER_COLUMN};
use crate::config::SceneConfig;
use crate::pipeline::CancelToken;
use crate::raster::{is_valid_value, Raster};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ScanError {
    #[error("Scan was cancelled")]
    Cancelled,

    #[error("Scene needs {0} vertices which exceeds the 32 bit index range")]
    TooManyVertices(usize),
}

/// The geographic rectangle covered by one sampled cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl GeoCell {
    /// The cell at (`col`, `row`) spanning `stride` raster cells, clamped to the raster.
    pub fn new(raster: &Raster, col: usize, row: usize, stride: usize) -> Self {
        let (width, height) = raster.dimensions();
        let next_col = col.saturating_add(stride).min(width);
        let next_row = row.saturating_add(stride).min(height);

        GeoCell {
            min_latitude: raster.latitude(next_row),
            min_longitude: raster.longitude(col),
            max_latitude: raster.latitude(row),
            max_longitude: raster.longitude(next_col),
        }
    }
}

/// What the scan saw, for reporting only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    pub sampled: usize,
    pub skipped: usize,
    pub columns: usize,
    pub max_value: Option<f32>,
}

impl ScanStats {
    fn record(&mut self, value: f32) {
        self.sampled += 1;
        if !is_valid_value(value) {
            self.skipped += 1;
            return;
        }
        self.columns += 1;
        if self.max_value.map_or(true, |max| value > max) {
            self.max_value = Some(value);
        }
    }

    fn merge(mut self, other: ScanStats) -> ScanStats {
        self.sampled += other.sampled;
        self.skipped += other.skipped;
        self.columns += other.columns;
        self.max_value = match (self.max_value, other.max_value) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        self
    }
}

/// Merged geometry of all columns of one raster pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneBuffers {
    /// xyz triples, eight per column. Narrowed to `f32` after projection, so
    /// a floor vertex may sit up to a couple of `f32::EPSILON` (relative)
    /// below the base radius.
    pub positions: Vec<f32>,
    /// Triangle list into `positions`, 36 per column.
    pub indices: Vec<u32>,
}

impl SceneBuffers {
    pub fn column_count(&self) -> usize {
        self.positions.len() / (VERTICES_PER_COLUMN * 3)
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    fn push(&mut self, column: &Column) {
        let base = self.vertex_count() as u32;
        for v in column.vertices.iter() {
            self.positions.extend_from_slice(&[v.x as f32, v.y as f32, v.z as f32]);
        }
        self.indices.extend(COLUMN_INDICES.iter().map(|i| base + i));
    }

    fn append(&mut self, other: SceneBuffers) {
        let base = self.vertex_count() as u32;
        self.positions.extend(other.positions);
        self.indices.extend(other.indices.into_iter().map(|i| base + i));
    }

    /// Positions resolved through the index buffer, three vertices per triangle.
    pub fn expanded_positions(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.indices.len() * 3);
        for &i in self.indices.iter() {
            let at = i as usize * 3;
            out.extend_from_slice(&self.positions[at..at + 3]);
        }
        out
    }
}

pub fn column_height(value: f32, height_scale: f64) -> f64 {
    (value as f64).sqrt() / height_scale
}

/// How many of `len` cells are sampled at `stride`. Always includes cell 0.
fn sample_count(len: usize, stride: usize) -> usize {
    if len == 0 {
        0
    } else {
        (len - 1) / stride + 1
    }
}

/// Sampled rows of the stripe starting at `col`, with their values.
fn stripe_cells(raster: &Raster, col: usize, stride: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
    let (_, height) = raster.dimensions();
    (0..height).step_by(stride).map(move |row| (row, raster.value(col, row)))
}

/// What `assemble` would report for this stride, without building geometry.
pub fn scan_stats(raster: &Raster, stride: usize) -> ScanStats {
    let (width, _) = raster.dimensions();
    let stride = stride.max(1);

    (0..width).step_by(stride).fold(ScanStats::default(), |mut stats, col| {
        stripe_cells(raster, col, stride).for_each(|(_, value)| stats.record(value));
        stats
    })
}

/// Samples every `stride`-th column and row of the raster and builds one
/// column per cell holding data.
///
/// Columns are emitted column-major, the same order regardless of how the
/// work is split across threads. Nothing is returned if `cancel` fires.
pub fn assemble(raster: &Raster, config: &SceneConfig, cancel: &CancelToken) -> Result<(SceneBuffers, ScanStats), ScanError> {
    let (width, height) = raster.dimensions();
    let stride = config.stride.max(1);

    let sampled_rows = sample_count(height, stride);
    let sampled_cols = sample_count(width, stride);
    let worst_case = sampled_rows
        .saturating_mul(sampled_cols)
        .saturating_mul(VERTICES_PER_COLUMN);
    if worst_case > u32::MAX as usize {
        return Err(ScanError::TooManyVertices(worst_case));
    }

    let stripes: Vec<Result<(SceneBuffers, ScanStats), ScanError>> = (0..sampled_cols)
        .into_par_iter()
        .map(|stripe| {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            Ok(scan_stripe(raster, config, stripe * stride, stride))
        })
        .collect();

    let mut buffers = SceneBuffers::default();
    let mut stats = ScanStats::default();

    for stripe in stripes {
        let (stripe_buffers, stripe_stats) = stripe?;
        buffers.append(stripe_buffers);
        stats = stats.merge(stripe_stats);
    }

    debug_assert_eq!(buffers.indices.len(), stats.columns * INDICES_PER_COLUMN);
    tracing::info!(
        columns = stats.columns,
        skipped = stats.skipped,
        max_value = ?stats.max_value,
        "assembled globe columns"
    );

    Ok((buffers, stats))
}

fn scan_stripe(raster: &Raster, config: &SceneConfig, col: usize, stride: usize) -> (SceneBuffers, ScanStats) {
    let mut buffers = SceneBuffers::default();
    let mut stats = ScanStats::default();

    for (row, value) in stripe_cells(raster, col, stride) {
        stats.record(value);
        if !is_valid_value(value) {
            continue;
        }

        let cell = GeoCell::new(raster, col, row, stride);
        let column = build_column(
            config.radius,
            column_height(value, config.height_scale),
            cell.min_latitude,
            cell.min_longitude,
            cell.max_latitude,
            cell.max_longitude,
        );
        buffers.push(&column);
    }

    (buffers, stats)
}
