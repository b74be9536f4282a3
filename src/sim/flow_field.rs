//! Flow fields: a regular grid of direction vectors covering the world.
//!
//! Each cell covers a `res x res` square starting at the origin. Lookups
//! outside the grid clamp to the border cells.

use noise::{NoiseFn, Perlin};
use std::f64::consts::TAU;

use crate::util::math::map_range;
use crate::util::vec2::Vec2;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlowFieldError {
    #[error("Flow field needs at least one cell, got {cols}x{rows}")]
    EmptyGrid { cols: usize, rows: usize },
    #[error("Invalid cell resolution {0}: must be finite and greater than zero")]
    InvalidResolution(f64),
}

/// Smooth pseudo-noise used to seed flow-field angles.
///
/// Must be deterministic per coordinate and return values in `[0, 1]`.
pub trait NoiseSource {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64;
}

impl<F> NoiseSource for F
where
    F: Fn(f64, f64, f64) -> f64,
{
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self(x, y, z)
    }
}

/// Seeded Perlin noise remapped from `[-1, 1]` into `[0, 1]`
pub struct PerlinNoise {
    noise: Perlin,
}

impl PerlinNoise {
    pub fn new(seed: u32) -> Self {
        Self {
            noise: Perlin::new(seed),
        }
    }
}

impl NoiseSource for PerlinNoise {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        ((self.noise.get([x, y, z]) + 1.0) * 0.5).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    cols: usize,
    rows: usize,
    res: f64,
    /// Row-major, `rows * cols` entries
    vectors: Vec<Vec2>,
}

impl FlowField {
    /// Create a field of zero vectors
    pub fn new(cols: usize, rows: usize, res: f64) -> Result<Self, FlowFieldError> {
        if cols == 0 || rows == 0 {
            return Err(FlowFieldError::EmptyGrid { cols, rows });
        }
        if !(res.is_finite() && res > 0.0) {
            return Err(FlowFieldError::InvalidResolution(res));
        }
        Ok(Self {
            cols,
            rows,
            res,
            vectors: vec![Vec2::ZERO; cols * rows],
        })
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn res(&self) -> f64 {
        self.res
    }

    /// World-space extent covered by the grid
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(self.cols as f64 * self.res, self.rows as f64 * self.res)
    }

    #[inline]
    fn offset(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    /// Clamp a world coordinate to a cell index in `[0, count)`
    #[inline]
    fn cell_index(&self, coord: f64, count: usize) -> usize {
        let cell = (coord / self.res).floor();
        if cell <= 0.0 || cell.is_nan() {
            0
        } else {
            (cell as usize).min(count - 1)
        }
    }

    /// Vector of the cell under `pos`, clamped to the border cells.
    /// Returns a copy; the grid is never exposed mutably.
    pub fn lookup(&self, pos: Vec2) -> Vec2 {
        let col = self.cell_index(pos.x, self.cols);
        let row = self.cell_index(pos.y, self.rows);
        self.vectors[self.offset(col, row)]
    }

    pub fn get(&self, col: usize, row: usize) -> Option<Vec2> {
        if col < self.cols && row < self.rows {
            Some(self.vectors[self.offset(col, row)])
        } else {
            None
        }
    }

    /// Returns false when the cell is out of range
    pub fn set(&mut self, col: usize, row: usize, value: Vec2) -> bool {
        if col < self.cols && row < self.rows {
            let offset = self.offset(col, row);
            self.vectors[offset] = value;
            true
        } else {
            false
        }
    }

    /// Set every cell from a function of the cell's world coordinates
    pub fn fill<F>(&mut self, mut generator: F)
    where
        F: FnMut(f64, f64) -> Vec2,
    {
        for row in 0..self.rows {
            for col in 0..self.cols {
                let value = generator(col as f64 * self.res, row as f64 * self.res);
                let offset = self.offset(col, row);
                self.vectors[offset] = value;
            }
        }
    }

    pub fn fill_uniform(&mut self, value: Vec2) {
        self.vectors.fill(value);
    }

    /// Copy the overlapping region of another field, cell by cell
    pub fn copy_from(&mut self, other: &FlowField) {
        for row in 0..self.rows.min(other.rows) {
            for col in 0..self.cols.min(other.cols) {
                let offset = self.offset(col, row);
                self.vectors[offset] = other.vectors[other.offset(col, row)];
            }
        }
    }

    /// Unit vectors whose angles come from a smooth noise source.
    ///
    /// Cell `(col, row)` samples `noise(col / scale_x, row / scale_y, z_offset)`
    /// and maps it onto `[0, 2π * rotations]`. A zero `scale_y` reuses
    /// `scale_x` and zero `rotations` means one full turn.
    pub fn fill_with_noise_angles<N>(
        &mut self,
        noise: &N,
        scale_x: f64,
        scale_y: f64,
        rotations: f64,
        z_offset: f64,
    ) where
        N: NoiseSource + ?Sized,
    {
        let scale_y = if scale_y == 0.0 { scale_x } else { scale_y };
        let rotations = if rotations == 0.0 { 1.0 } else { rotations };
        let max_angle = TAU * rotations;

        for row in 0..self.rows {
            for col in 0..self.cols {
                let n = noise.sample(col as f64 / scale_x, row as f64 / scale_y, z_offset);
                let angle = map_range(n, 0.0, 1.0, 0.0, max_angle);
                let offset = self.offset(col, row);
                self.vectors[offset] = Vec2::from_angle(angle);
            }
        }
    }

    /// Iterate `(col, row, vector)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, Vec2)> + '_ {
        self.vectors
            .iter()
            .enumerate()
            .map(move |(i, v)| (i % self.cols, i / self.cols, *v))
    }
}
