//! Camera utilities for the atlas scene

use atlasview_core::{Bounds, Point3d, Vector3d};
use nalgebra::{Matrix4, Perspective3, Rotation3, Unit};

/// Near/far ratio floor used when fitting the clipping range
pub const NEAR_CLIPPING_TOLERANCE: f64 = 0.001;

/// Fraction of the depth range added on both sides of the clipping range
pub const CLIPPING_RANGE_EXPANSION: f64 = 0.005;

/// A perspective camera looking at a focal point
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Point3d,
    pub focal_point: Point3d,
    pub up: Vector3d,
    /// Vertical view angle in degrees
    pub view_angle: f64,
    pub aspect_ratio: f64,
    pub near: f64,
    pub far: f64,
}

impl Camera {
    /// Create a new camera
    pub fn new(position: Point3d, focal_point: Point3d, up: Vector3d) -> Self {
        Self {
            position,
            focal_point,
            up,
            ..Self::default()
        }
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f64> {
        Matrix4::look_at_rh(&self.position, &self.focal_point, &self.up)
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f64> {
        let perspective = Perspective3::new(
            self.aspect_ratio,
            self.view_angle.to_radians(),
            self.near,
            self.far,
        );
        perspective.into_inner()
    }

    /// Unit vector from the position towards the focal point
    pub fn direction_of_projection(&self) -> Vector3d {
        (self.focal_point - self.position)
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| -Vector3d::z())
    }

    /// Distance between position and focal point
    pub fn distance(&self) -> f64 {
        (self.focal_point - self.position).norm()
    }

    /// Move position and focal point together along the view direction
    pub fn move_forward(&mut self, distance: f64) {
        let offset = self.direction_of_projection() * distance;
        self.position += offset;
        self.focal_point += offset;
    }

    /// Shift position and focal point by the same offset
    pub fn pan(&mut self, offset: Vector3d) {
        self.position += offset;
        self.focal_point += offset;
    }

    /// Move towards the focal point; factors above 1 move closer
    pub fn dolly(&mut self, factor: f64) {
        if factor <= 0.0 {
            return;
        }
        let distance = self.distance() / factor;
        self.position = self.focal_point - self.direction_of_projection() * distance;
    }

    /// Rotate the camera around the focal point.
    ///
    /// `azimuth` turns about the view-up vector, `elevation` about the axis
    /// perpendicular to view-up and the view direction. Both in degrees.
    pub fn orbit(&mut self, azimuth: f64, elevation: f64) {
        let offset = self.position - self.focal_point;
        let up = Unit::new_normalize(self.up);
        let yaw = Rotation3::from_axis_angle(&up, azimuth.to_radians());
        let offset = yaw * offset;

        let offset = match Unit::try_new(offset.cross(&self.up), f64::EPSILON) {
            Some(right) => {
                let pitch = Rotation3::from_axis_angle(&right, elevation.to_radians());
                self.up = pitch * self.up;
                pitch * offset
            }
            None => offset,
        };
        self.position = self.focal_point + offset;
    }

    /// Place the camera on the focal point's `-view_direction` side at the
    /// current distance
    pub fn look_along(&mut self, view_direction: Vector3d, up: Vector3d) {
        let distance = self.distance();
        let direction = view_direction
            .try_normalize(f64::EPSILON)
            .unwrap_or_else(|| -Vector3d::z());
        self.position = self.focal_point - direction * distance;
        self.up = up;
    }

    /// Center the view on `bounds` so the whole box fits the view angle
    pub fn reset(&mut self, bounds: &Bounds) {
        let center = bounds.center();
        let radius = (bounds.extents().norm() / 2.0).max(0.5);
        let half_angle = (self.view_angle / 2.0).to_radians();
        let distance = radius / half_angle.sin();

        let direction = self.direction_of_projection();
        self.focal_point = center;
        self.position = center - direction * distance;
        self.reset_clipping_range(bounds);
    }

    /// Fit near and far planes to `bounds` along the view direction
    pub fn reset_clipping_range(&mut self, bounds: &Bounds) {
        let (near, far) = clipping_range(self.position, self.direction_of_projection(), bounds);
        self.near = near;
        self.far = far;
    }
}

/// Near/far distances enclosing every corner of `bounds`.
///
/// Depths behind the camera are cut at zero. The range is widened slightly and
/// the near plane never drops below [`NEAR_CLIPPING_TOLERANCE`] of the far plane.
pub fn clipping_range(position: Point3d, direction: Vector3d, bounds: &Bounds) -> (f64, f64) {
    let mut near = f64::INFINITY;
    let mut far = f64::NEG_INFINITY;
    for corner in bounds.corners() {
        let depth = (corner - position).dot(&direction);
        near = near.min(depth);
        far = far.max(depth);
    }

    near = near.max(0.0);
    let span = far - near;
    near = 0.99 * near - span * CLIPPING_RANGE_EXPANSION;
    far = 1.01 * far + span * CLIPPING_RANGE_EXPANSION;

    if near >= far {
        near = 0.01 * far;
    }
    if near < NEAR_CLIPPING_TOLERANCE * far {
        near = NEAR_CLIPPING_TOLERANCE * far;
    }
    (near, far)
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3d::new(0.0, 0.0, 1.0),
            focal_point: Point3d::origin(),
            up: Vector3d::y(),
            view_angle: 30.0,
            aspect_ratio: 1400.0 / 1000.0,
            near: 0.01,
            far: 1000.01,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box_at(z: f64) -> Bounds {
        Bounds([-1.0, 1.0, -1.0, 1.0, z - 1.0, z + 1.0])
    }

    #[test]
    fn test_clipping_range_encloses_bounds() {
        // camera at z=10 looking down -z at a box spanning z in [-1, 1]
        let camera = Camera::new(Point3d::new(0.0, 0.0, 10.0), Point3d::origin(), Vector3d::y());
        let (near, far) = clipping_range(
            camera.position,
            camera.direction_of_projection(),
            &unit_box_at(0.0),
        );
        assert!(near < 9.0);
        assert!(far > 11.0);
        assert_relative_eq!(near, 0.99 * 9.0 - 2.0 * CLIPPING_RANGE_EXPANSION);
        assert_relative_eq!(far, 1.01 * 11.0 + 2.0 * CLIPPING_RANGE_EXPANSION);
    }

    #[test]
    fn test_clipping_range_near_floor() {
        // camera inside the box
        let mut camera = Camera::new(Point3d::origin(), Point3d::new(0.0, 0.0, -1.0), Vector3d::y());
        camera.reset_clipping_range(&Bounds([-5.0, 5.0, -5.0, 5.0, -500.0, 5.0]));
        assert!(camera.near > 0.0);
        assert_relative_eq!(camera.near, NEAR_CLIPPING_TOLERANCE * camera.far);
    }

    #[test]
    fn test_reset_frames_bounds() {
        let mut camera = Camera::default();
        let bounds = Bounds([10.0, 20.0, 10.0, 20.0, 10.0, 20.0]);
        camera.reset(&bounds);
        assert_eq!(camera.focal_point, Point3d::new(15.0, 15.0, 15.0));
        assert!(camera.distance() > bounds.extents().norm() / 2.0);
        // the nearest and farthest faces sit 5 units from the focal point
        assert!(camera.near < camera.distance() - 5.0);
        assert!(camera.far > camera.distance() + 5.0);
    }

    #[test]
    fn test_dolly_and_look_along() {
        let mut camera = Camera::new(Point3d::new(0.0, 0.0, 10.0), Point3d::origin(), Vector3d::y());
        camera.dolly(0.5);
        assert_relative_eq!(camera.distance(), 20.0);

        camera.look_along(Vector3d::y(), Vector3d::z());
        assert_relative_eq!(camera.position, Point3d::new(0.0, -20.0, 0.0), epsilon = 1e-9);
        assert_eq!(camera.up, Vector3d::z());
    }

    #[test]
    fn test_orbit_keeps_distance() {
        let mut camera = Camera::new(Point3d::new(0.0, 0.0, 10.0), Point3d::origin(), Vector3d::y());
        camera.orbit(90.0, 0.0);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(camera.position, Point3d::new(10.0, 0.0, 0.0), epsilon = 1e-9);

        camera.orbit(0.0, 45.0);
        assert_relative_eq!(camera.distance(), 10.0, epsilon = 1e-9);
    }
}
