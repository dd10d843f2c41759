//! Scalar volumes
//!
//! A [`Volume`] is a regular 3D grid of `f32` scalars with physical spacing and
//! origin, indexed `[x, y, z]`. It is populated once by a reader and treated as
//! read-only by the slicing and reconstruction code.

use crate::point::{Bounds, Point3d, Vector3d};
use crate::{Error, Result};
use ndarray::Array3;

/// Interpolation used when sampling a volume at a continuous position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Round to the closest voxel; required for categorical label volumes
    NearestNeighbor,
    /// Trilinear interpolation of the eight surrounding voxels
    #[default]
    Linear,
}

/// Tolerance, in voxel units, for treating a position on the outer face as inside
const BORDER_TOLERANCE: f64 = 1e-6;

/// 3D scalar grid with spacing and origin
#[derive(Debug, Clone)]
pub struct Volume {
    data: Array3<f32>,
    spacing: [f64; 3],
    origin: Point3d,
}

impl Volume {
    /// Create a zero-filled volume
    pub fn new(dimensions: [usize; 3], spacing: [f64; 3], origin: Point3d) -> Result<Self> {
        let data = Array3::zeros((dimensions[0], dimensions[1], dimensions[2]));
        Self::from_array(data, spacing, origin)
    }

    /// Wrap an existing `[x, y, z]` array
    pub fn from_array(data: Array3<f32>, spacing: [f64; 3], origin: Point3d) -> Result<Self> {
        if data.shape().iter().any(|&n| n == 0) {
            return Err(Error::InvalidData(format!(
                "Volume dimensions must be positive, got {:?}",
                data.shape()
            )));
        }
        if spacing.iter().any(|&s| !(s > 0.0) || !s.is_finite()) {
            return Err(Error::InvalidData(format!(
                "Volume spacing must be strictly positive, got {:?}",
                spacing
            )));
        }
        Ok(Self {
            data,
            spacing,
            origin,
        })
    }

    /// Build a volume from scalars stored with x varying fastest
    pub fn from_x_fastest(
        dimensions: [usize; 3],
        spacing: [f64; 3],
        origin: Point3d,
        scalars: Vec<f32>,
    ) -> Result<Self> {
        use ndarray::ShapeBuilder;

        let shape = (dimensions[0], dimensions[1], dimensions[2]).f();
        let data = Array3::from_shape_vec(shape, scalars)
            .map_err(|e| Error::InvalidData(format!("Volume scalar count mismatch: {}", e)))?;
        Self::from_array(data, spacing, origin)
    }

    /// Voxel counts `[nx, ny, nz]`
    pub fn dimensions(&self) -> [usize; 3] {
        let s = self.data.shape();
        [s[0], s[1], s[2]]
    }

    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    pub fn origin(&self) -> Point3d {
        self.origin
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// Minimum and maximum scalar values
    pub fn scalar_range(&self) -> (f32, f32) {
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    /// Get scalar value at grid coordinates (with bounds checking)
    pub fn value(&self, x: usize, y: usize, z: usize) -> Option<f32> {
        self.data.get((x, y, z)).copied()
    }

    /// Set scalar value at grid coordinates
    pub fn set_value(&mut self, x: usize, y: usize, z: usize, value: f32) -> Result<()> {
        let dims = self.dimensions();
        match self.data.get_mut((x, y, z)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::InvalidData(format!(
                "Grid coordinates ({}, {}, {}) out of bounds for dimensions {:?}",
                x, y, z, dims
            ))),
        }
    }

    /// Set every voxel in the inclusive index box `min..=max` to `value`
    pub fn fill_box(&mut self, min: [usize; 3], max: [usize; 3], value: f32) -> Result<()> {
        for x in min[0]..=max[0] {
            for y in min[1]..=max[1] {
                for z in min[2]..=max[2] {
                    self.set_value(x, y, z, value)?;
                }
            }
        }
        Ok(())
    }

    /// Physical position of a voxel center
    pub fn index_to_world(&self, x: usize, y: usize, z: usize) -> Point3d {
        Point3d::new(
            self.origin.x + x as f64 * self.spacing[0],
            self.origin.y + y as f64 * self.spacing[1],
            self.origin.z + z as f64 * self.spacing[2],
        )
    }

    /// Continuous voxel index of a physical position
    pub fn world_to_index(&self, position: &Point3d) -> Vector3d {
        Vector3d::new(
            (position.x - self.origin.x) / self.spacing[0],
            (position.y - self.origin.y) / self.spacing[1],
            (position.z - self.origin.z) / self.spacing[2],
        )
    }

    /// Physical bounds spanned by the voxel centers
    pub fn bounds(&self) -> Bounds {
        let dims = self.dimensions();
        let max = self.index_to_world(dims[0] - 1, dims[1] - 1, dims[2] - 1);
        Bounds([
            self.origin.x,
            max.x,
            self.origin.y,
            max.y,
            self.origin.z,
            max.z,
        ])
    }

    /// Sample the volume at a physical position; `None` outside the grid
    pub fn sample(&self, position: &Point3d, interpolation: Interpolation) -> Option<f32> {
        let index = self.world_to_index(position);
        match interpolation {
            Interpolation::NearestNeighbor => self.sample_nearest(&index),
            Interpolation::Linear => self.sample_linear(&index),
        }
    }

    fn sample_nearest(&self, index: &Vector3d) -> Option<f32> {
        let dims = self.dimensions();
        let mut voxel = [0usize; 3];
        for axis in 0..3 {
            let rounded = (index[axis] + 0.5).floor();
            if rounded < 0.0 || rounded > (dims[axis] - 1) as f64 {
                return None;
            }
            voxel[axis] = rounded as usize;
        }
        self.value(voxel[0], voxel[1], voxel[2])
    }

    fn sample_linear(&self, index: &Vector3d) -> Option<f32> {
        let dims = self.dimensions();
        let mut base = [0usize; 3];
        let mut frac = [0f64; 3];
        for axis in 0..3 {
            let c = index[axis];
            let last = (dims[axis] - 1) as f64;
            if c < -BORDER_TOLERANCE || c > last + BORDER_TOLERANCE {
                return None;
            }
            let c = c.clamp(0.0, last);
            let i0 = (c.floor() as usize).min(dims[axis].saturating_sub(2));
            base[axis] = i0;
            frac[axis] = c - i0 as f64;
        }

        let at = |dx: usize, dy: usize, dz: usize| -> f64 {
            let x = (base[0] + dx).min(dims[0] - 1);
            let y = (base[1] + dy).min(dims[1] - 1);
            let z = (base[2] + dz).min(dims[2] - 1);
            self.data[(x, y, z)] as f64
        };

        let [fx, fy, fz] = frac;
        let v00 = at(0, 0, 0) * (1.0 - fx) + at(1, 0, 0) * fx;
        let v10 = at(0, 1, 0) * (1.0 - fx) + at(1, 1, 0) * fx;
        let v01 = at(0, 0, 1) * (1.0 - fx) + at(1, 0, 1) * fx;
        let v11 = at(0, 1, 1) * (1.0 - fx) + at(1, 1, 1) * fx;

        let v0 = v00 * (1.0 - fy) + v10 * fy;
        let v1 = v01 * (1.0 - fy) + v11 * fy;

        Some((v0 * (1.0 - fz) + v1 * fz) as f32)
    }
}
