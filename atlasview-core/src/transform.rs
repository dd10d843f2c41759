//! 3D transformation utilities
//!
//! [`Transform3D`] concatenates in pre-multiply order: every builder call
//! (`scale`, `rotate_x`, `translate`, ...) right-multiplies the current matrix,
//! so the operation added last is the first one applied to a point. A transform
//! built as `identity().scale(..).rotate_x(..).translate(..)` therefore
//! translates a point in its own local frame, rotates it, then scales it.

use crate::point::{Point3d, Point3f, Vector3d, Vector3f};
use nalgebra::{Isometry3, Matrix3, Matrix4, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D homogeneous transformation in double precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f64>,
}

impl Transform3D {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a transformation from a raw homogeneous matrix
    pub fn from_matrix(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }

    /// Create a transformation from a 3x3 linear part with no translation
    pub fn from_linear(linear: Matrix3<f64>) -> Self {
        Self {
            matrix: linear.to_homogeneous(),
        }
    }

    /// Create a translation transformation
    pub fn translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_translation(&Vector3::new(x, y, z)),
        }
    }

    /// Create a non-uniform scaling transformation
    pub fn scaling(x: f64, y: f64, z: f64) -> Self {
        Self {
            matrix: Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z)),
        }
    }

    /// Rotation about the X axis by `degrees`
    pub fn rotation_x(degrees: f64) -> Self {
        Self::axis_rotation(Vector3::x_axis(), degrees)
    }

    /// Rotation about the Y axis by `degrees`
    pub fn rotation_y(degrees: f64) -> Self {
        Self::axis_rotation(Vector3::y_axis(), degrees)
    }

    /// Rotation about the Z axis by `degrees`
    pub fn rotation_z(degrees: f64) -> Self {
        Self::axis_rotation(Vector3::z_axis(), degrees)
    }

    fn axis_rotation(axis: nalgebra::Unit<Vector3<f64>>, degrees: f64) -> Self {
        Self {
            matrix: Rotation3::from_axis_angle(&axis, degrees.to_radians()).to_homogeneous(),
        }
    }

    /// Concatenate `other` after the current stages (pre-multiply)
    pub fn concatenate(&mut self, other: &Transform3D) {
        self.matrix *= other.matrix;
    }

    /// Append a scale stage
    pub fn scale(mut self, x: f64, y: f64, z: f64) -> Self {
        self.concatenate(&Self::scaling(x, y, z));
        self
    }

    /// Append a rotation about X
    pub fn rotate_x(mut self, degrees: f64) -> Self {
        self.concatenate(&Self::rotation_x(degrees));
        self
    }

    /// Append a rotation about Y
    pub fn rotate_y(mut self, degrees: f64) -> Self {
        self.concatenate(&Self::rotation_y(degrees));
        self
    }

    /// Append a rotation about Z
    pub fn rotate_z(mut self, degrees: f64) -> Self {
        self.concatenate(&Self::rotation_z(degrees));
        self
    }

    /// Append a translation stage
    pub fn translate(mut self, x: f64, y: f64, z: f64) -> Self {
        self.concatenate(&Self::translation(x, y, z));
        self
    }

    /// Upper-left 3x3 block
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Apply the transformation to a double precision point
    pub fn transform_point_d(&self, point: &Point3d) -> Point3d {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3d::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3f) -> Point3f {
        self.transform_point_d(&point.cast::<f64>()).cast::<f32>()
    }

    /// Apply the linear part of the transformation to a vector
    pub fn transform_vector(&self, vector: &Vector3d) -> Vector3d {
        self.linear() * vector
    }

    /// Transform a surface normal with the inverse transpose of the linear part.
    ///
    /// Singular transforms (e.g. the all-zero scale) fall back to the linear part.
    pub fn transform_normal(&self, normal: &Vector3f) -> Vector3f {
        let linear = self.linear();
        let n = normal.cast::<f64>();
        let mapped = match linear.try_inverse() {
            Some(inv) => inv.transpose() * n,
            None => linear * n,
        };
        mapped.cast::<f32>()
    }

    /// Compose this transformation with another (`self * other`)
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse transformation
    pub fn inverse(self) -> Option<Self> {
        self.matrix
            .try_inverse()
            .map(|inv_matrix| Self { matrix: inv_matrix })
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f64) -> bool {
        let identity = Matrix4::identity();
        (self.matrix - identity).norm() < epsilon
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for Transform3D {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f64>> for Transform3D {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

impl From<Isometry3<f64>> for Transform3D {
    fn from(isometry: Isometry3<f64>) -> Self {
        Self {
            matrix: isometry.to_homogeneous(),
        }
    }
}
