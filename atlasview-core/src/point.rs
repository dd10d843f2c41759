//! Point types and axis-aligned bounds

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// Axis-aligned bounds stored as `[xmin, xmax, ymin, ymax, zmin, zmax]`.
///
/// Empty geometry yields all-zero bounds so that extents and volume are zero
/// rather than infinite.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds(pub [f64; 6]);

impl Bounds {
    /// Bounds of a point set; zero bounds when the set is empty
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point3f>,
    {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::default();
        };

        let mut b = [
            first.x as f64,
            first.x as f64,
            first.y as f64,
            first.y as f64,
            first.z as f64,
            first.z as f64,
        ];
        for p in iter {
            for (axis, value) in [p.x, p.y, p.z].into_iter().enumerate() {
                let value = value as f64;
                b[2 * axis] = b[2 * axis].min(value);
                b[2 * axis + 1] = b[2 * axis + 1].max(value);
            }
        }
        Self(b)
    }

    pub fn min(&self) -> Point3d {
        Point3d::new(self.0[0], self.0[2], self.0[4])
    }

    pub fn max(&self) -> Point3d {
        Point3d::new(self.0[1], self.0[3], self.0[5])
    }

    /// Extent along each axis (`max - min`)
    pub fn extents(&self) -> Vector3d {
        Vector3d::new(
            self.0[1] - self.0[0],
            self.0[3] - self.0[2],
            self.0[5] - self.0[4],
        )
    }

    pub fn center(&self) -> Point3d {
        Point3d::new(
            (self.0[0] + self.0[1]) / 2.0,
            (self.0[2] + self.0[3]) / 2.0,
            (self.0[4] + self.0[5]) / 2.0,
        )
    }

    /// Product of the three extents
    pub fn volume(&self) -> f64 {
        let e = self.extents();
        e.x * e.y * e.z
    }

    /// Smallest bounds containing both `self` and `other`
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds([
            self.0[0].min(other.0[0]),
            self.0[1].max(other.0[1]),
            self.0[2].min(other.0[2]),
            self.0[3].max(other.0[3]),
            self.0[4].min(other.0[4]),
            self.0[5].max(other.0[5]),
        ])
    }

    /// The eight corner points
    pub fn corners(&self) -> [Point3d; 8] {
        let [x0, x1, y0, y1, z0, z1] = self.0;
        [
            Point3d::new(x0, y0, z0),
            Point3d::new(x1, y0, z0),
            Point3d::new(x0, y1, z0),
            Point3d::new(x1, y1, z0),
            Point3d::new(x0, y0, z1),
            Point3d::new(x1, y0, z1),
            Point3d::new(x0, y1, z1),
            Point3d::new(x1, y1, z1),
        ]
    }
}
