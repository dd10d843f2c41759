//! Renderable actors handed to a [`Renderer`](crate::traits::Renderer)

use crate::image::SliceImage;
use crate::mesh::TriangleMesh;
use crate::point::{Bounds, Point3d};
use crate::transform::Transform3D;
use serde::{Deserialize, Serialize};

/// Identifier assigned by the renderer when an actor is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

/// How a surface is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Representation {
    #[default]
    Surface,
    Wireframe,
}

/// Fixed lighting and transparency parameters of a surface
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMaterial {
    pub opacity: f64,
    pub ambient: f64,
    pub specular: f64,
    pub specular_power: f64,
}

impl Default for SurfaceMaterial {
    fn default() -> Self {
        Self {
            opacity: 0.9,
            ambient: 0.5,
            specular: 0.5,
            specular_power: 50.0,
        }
    }
}

impl SurfaceMaterial {
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_ambient(mut self, ambient: f64) -> Self {
        self.ambient = ambient;
        self
    }

    pub fn with_specular(mut self, specular: f64, power: f64) -> Self {
        self.specular = specular;
        self.specular_power = power;
        self
    }
}

/// A colored triangle surface
#[derive(Debug, Clone)]
pub struct SurfaceActor {
    pub mesh: TriangleMesh,
    pub color: [f64; 3],
    pub material: SurfaceMaterial,
    pub representation: Representation,
    pub visible: bool,
}

impl SurfaceActor {
    pub fn new(mesh: TriangleMesh, color: [f64; 3]) -> Self {
        Self {
            mesh,
            color,
            material: SurfaceMaterial::default(),
            representation: Representation::Surface,
            visible: true,
        }
    }

    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn bounds(&self) -> Bounds {
        self.mesh.bounds()
    }
}

/// A 2D image positioned in the scene by a placement transform
#[derive(Debug, Clone)]
pub struct ImageActor {
    pub image: SliceImage,
    pub user_transform: Transform3D,
    pub opacity: f64,
    /// Whether the display may interpolate between pixels
    pub interpolate: bool,
    pub visible: bool,
}

impl ImageActor {
    pub fn new(image: SliceImage, user_transform: Transform3D) -> Self {
        Self {
            image,
            user_transform,
            opacity: 1.0,
            interpolate: true,
            visible: true,
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    /// Scene bounds of the image rectangle after placement
    pub fn bounds(&self) -> Bounds {
        let [x0, x1, y0, y1] = self.image.extent();
        let corners = [
            Point3d::new(x0, y0, 0.0),
            Point3d::new(x1, y0, 0.0),
            Point3d::new(x0, y1, 0.0),
            Point3d::new(x1, y1, 0.0),
        ];
        let placed: Vec<_> = corners
            .iter()
            .map(|c| self.user_transform.transform_point_d(c).cast::<f32>())
            .collect();
        Bounds::from_points(&placed)
    }
}
