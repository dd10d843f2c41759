//! Slice transform engine
//!
//! Turns an anatomical plane and a signed slice offset into the reslicing
//! plane (direction cosines and origin) and the placement transform that
//! positions the resulting 2D image in the scene. Offsets are relative to the
//! volume center; the coronal plane counts them in the opposite direction.

use atlasview_core::{Error, Matrix3, Point3d, Result, Transform3D};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Anatomical slicing plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlicePlane {
    /// XY plane, stepping along Z
    Axial,
    /// XZ plane, stepping along Y
    Coronal,
    /// YZ plane, stepping along X
    Sagittal,
}

impl SlicePlane {
    pub const ALL: [SlicePlane; 3] = [SlicePlane::Axial, SlicePlane::Coronal, SlicePlane::Sagittal];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlicePlane::Axial => "axial",
            SlicePlane::Coronal => "coronal",
            SlicePlane::Sagittal => "sagittal",
        }
    }

    /// Reslice axes as `(x axis, y axis, z axis)` triples, row-major
    pub fn direction_cosines(&self) -> [f64; 9] {
        match self {
            SlicePlane::Axial => [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            SlicePlane::Coronal => [-1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0],
            SlicePlane::Sagittal => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        }
    }

    /// Volume axis the plane steps along
    pub fn normal_axis(&self) -> usize {
        match self {
            SlicePlane::Axial => 2,
            SlicePlane::Coronal => 1,
            SlicePlane::Sagittal => 0,
        }
    }

    /// Absolute voxel index along the normal axis for a signed offset
    pub fn absolute_index(&self, slice: i64, dimensions: [usize; 3]) -> i64 {
        let half = dimensions[self.normal_axis()] as i64 / 2;
        match self {
            SlicePlane::Coronal => -slice + half,
            SlicePlane::Axial | SlicePlane::Sagittal => slice + half,
        }
    }
}

impl FromStr for SlicePlane {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "axial" | "xy" => Ok(SlicePlane::Axial),
            "coronal" | "xz" => Ok(SlicePlane::Coronal),
            "sagittal" | "yz" => Ok(SlicePlane::Sagittal),
            other => Err(Error::InvalidData(format!("Unknown slice plane '{}'", other))),
        }
    }
}

impl fmt::Display for SlicePlane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to resample one plane and place its image
#[derive(Debug, Clone, PartialEq)]
pub struct SliceGeometry {
    pub plane: SlicePlane,
    /// Signed offset relative to the volume center
    pub slice: i64,
    pub absolute_index: i64,
    /// `absolute_index * spacing` along the plane's normal axis
    pub coordinate: f64,
    pub direction_cosines: [f64; 9],
    /// Reslice origin; only the normal-axis coordinate is non-zero
    pub origin: Point3d,
    pub placement: Transform3D,
}

impl SliceGeometry {
    /// Compute the plane definition for a slice offset
    pub fn compute(
        plane: SlicePlane,
        slice: i64,
        dimensions: [usize; 3],
        spacing: [f64; 3],
    ) -> Self {
        let axis = plane.normal_axis();
        let absolute_index = plane.absolute_index(slice, dimensions);
        let coordinate = absolute_index as f64 * spacing[axis];

        let mut origin = Point3d::origin();
        origin[axis] = coordinate;

        let placement = match plane {
            SlicePlane::Axial => Transform3D::identity().scale(1.0, -1.0, -1.0),
            SlicePlane::Coronal => Transform3D::identity()
                .scale(1.0, -1.0, -1.0)
                .rotate_x(90.0)
                .rotate_z(180.0),
            SlicePlane::Sagittal => Transform3D::identity()
                .scale(1.0, -1.0, -1.0)
                .rotate_y(-90.0)
                .rotate_z(90.0),
        }
        .translate(0.0, 0.0, -coordinate);

        log::debug!(
            "{} slice {}: index {}, coordinate {}",
            plane,
            slice,
            absolute_index,
            coordinate
        );

        Self {
            plane,
            slice,
            absolute_index,
            coordinate,
            direction_cosines: plane.direction_cosines(),
            origin,
            placement,
        }
    }

    /// Reslice axes with the x, y and z axis vectors as columns
    pub fn axes(&self) -> Matrix3<f64> {
        let c = &self.direction_cosines;
        Matrix3::new(c[0], c[3], c[6], c[1], c[4], c[7], c[2], c[5], c[8])
    }
}
