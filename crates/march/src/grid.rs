//! Dense voxel field with trilinear reconstruction.
//!
//! The grid stores one RGBA cell per lattice point over an axis-aligned
//! bound. Sampling between lattice points interpolates color and density
//! trilinearly; sampling outside the bound is transparent.

use glam::Vec3;
use thiserror::Error;

use crate::sample::VoxelSample;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("cell count {got} does not match {nx}x{ny}x{nz} lattice")]
    ShapeMismatch {
        got: usize,
        nx: usize,
        ny: usize,
        nz: usize,
    },
    #[error("grid needs at least two lattice points per axis")]
    DegenerateAxis,
    #[error("grid bound is empty or inverted")]
    EmptyBound,
}

/// A dense 3D density/color field.
pub struct DensityGrid {
    dims: [usize; 3],
    min: Vec3,
    max: Vec3,
    /// Lattice values in x-fastest order: `cells[(z * ny + y) * nx + x]`.
    cells: Vec<[f32; 4]>,
}

impl DensityGrid {
    /// Build a grid from raw lattice values.
    ///
    /// # Errors
    ///
    /// Fails when the cell count does not match the lattice dimensions, an
    /// axis has fewer than two lattice points, or the bound is inverted.
    pub fn new(dims: [usize; 3], min: Vec3, max: Vec3, cells: Vec<[f32; 4]>) -> Result<Self, GridError> {
        let [nx, ny, nz] = dims;
        if nx < 2 || ny < 2 || nz < 2 {
            return Err(GridError::DegenerateAxis);
        }
        if !(min.x < max.x && min.y < max.y && min.z < max.z) {
            return Err(GridError::EmptyBound);
        }
        if cells.len() != nx * ny * nz {
            return Err(GridError::ShapeMismatch {
                got: cells.len(),
                nx,
                ny,
                nz,
            });
        }
        Ok(Self { dims, min, max, cells })
    }

    /// Bake any sampling function onto the lattice.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DensityGrid::new`], minus the shape mismatch.
    pub fn bake<F>(dims: [usize; 3], min: Vec3, max: Vec3, lookup: F) -> Result<Self, GridError>
    where
        F: Fn(Vec3) -> VoxelSample,
    {
        let [nx, ny, nz] = dims;
        if nx < 2 || ny < 2 || nz < 2 {
            return Err(GridError::DegenerateAxis);
        }
        if !(min.x < max.x && min.y < max.y && min.z < max.z) {
            return Err(GridError::EmptyBound);
        }

        let extent = max - min;
        let mut cells = Vec::with_capacity(nx * ny * nz);
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    #[allow(clippy::cast_precision_loss)]
                    let frac = Vec3::new(
                        x as f32 / (nx - 1) as f32,
                        y as f32 / (ny - 1) as f32,
                        z as f32 / (nz - 1) as f32,
                    );
                    let sample = lookup(min + frac * extent);
                    cells.push([sample.color.x, sample.color.y, sample.color.z, sample.alpha]);
                }
            }
        }
        Ok(Self { dims, min, max, cells })
    }

    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    fn cell(&self, x: usize, y: usize, z: usize) -> [f32; 4] {
        let [nx, ny, _] = self.dims;
        self.cells[(z * ny + y) * nx + x]
    }

    /// Trilinear lookup. Total: positions outside the bound are transparent.
    #[must_use]
    pub fn sample(&self, position: Vec3) -> VoxelSample {
        if position.x < self.min.x
            || position.y < self.min.y
            || position.z < self.min.z
            || position.x > self.max.x
            || position.y > self.max.y
            || position.z > self.max.z
        {
            return VoxelSample::TRANSPARENT;
        }

        let [nx, ny, nz] = self.dims;
        #[allow(clippy::cast_precision_loss)]
        let lattice = (position - self.min) / (self.max - self.min)
            * Vec3::new((nx - 1) as f32, (ny - 1) as f32, (nz - 1) as f32);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x0, y0, z0) = (
            (lattice.x.floor() as usize).min(nx - 2),
            (lattice.y.floor() as usize).min(ny - 2),
            (lattice.z.floor() as usize).min(nz - 2),
        );
        #[allow(clippy::cast_precision_loss)]
        let f = lattice - Vec3::new(x0 as f32, y0 as f32, z0 as f32);

        let mut value = [0.0f32; 4];
        for (corner, weight) in [
            ((0, 0, 0), (1.0 - f.x) * (1.0 - f.y) * (1.0 - f.z)),
            ((1, 0, 0), f.x * (1.0 - f.y) * (1.0 - f.z)),
            ((0, 1, 0), (1.0 - f.x) * f.y * (1.0 - f.z)),
            ((1, 1, 0), f.x * f.y * (1.0 - f.z)),
            ((0, 0, 1), (1.0 - f.x) * (1.0 - f.y) * f.z),
            ((1, 0, 1), f.x * (1.0 - f.y) * f.z),
            ((0, 1, 1), (1.0 - f.x) * f.y * f.z),
            ((1, 1, 1), f.x * f.y * f.z),
        ] {
            let cell = self.cell(x0 + corner.0, y0 + corner.1, z0 + corner.2);
            for (acc, component) in value.iter_mut().zip(cell) {
                *acc += weight * component;
            }
        }

        VoxelSample {
            color: Vec3::new(value[0], value[1], value[2]),
            alpha: value[3],
        }
    }
}
