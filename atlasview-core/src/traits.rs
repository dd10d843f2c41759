//! Core traits for atlasview collaborators

use crate::actor::{ActorId, ImageActor, SurfaceActor};
use crate::mesh::TriangleMesh;
use crate::point::{Bounds, Point3f};
use crate::volume::Volume;
use crate::{Error, Result};

/// A provider of volume data that may not have been populated yet
pub trait VolumeSource {
    /// The loaded volume, or `None` before the source has produced data
    fn volume(&self) -> Option<&Volume>;

    /// Human-readable name used in error messages
    fn describe(&self) -> String;

    /// The loaded volume, failing with [`Error::NoVolumeData`] when absent
    fn require_volume(&self) -> Result<&Volume> {
        self.volume()
            .ok_or_else(|| Error::NoVolumeData(self.describe()))
    }
}

impl VolumeSource for Volume {
    fn volume(&self) -> Option<&Volume> {
        Some(self)
    }

    fn describe(&self) -> String {
        format!("in-memory volume {:?}", self.dimensions())
    }
}

/// Scene that owns renderable actors
pub trait Renderer {
    fn add_surface(&mut self, actor: SurfaceActor) -> ActorId;

    fn add_image(&mut self, actor: ImageActor) -> ActorId;

    /// Remove an actor of either kind; returns whether it existed
    fn remove_actor(&mut self, id: ActorId) -> bool;

    fn surface_mut(&mut self, id: ActorId) -> Option<&mut SurfaceActor>;

    fn image_mut(&mut self, id: ActorId) -> Option<&mut ImageActor>;

    /// Recompute the camera's near/far planes from the visible actors
    fn reset_clipping_range(&mut self);
}

/// Trait for drawable/renderable objects
pub trait Drawable {
    /// Get the bounding box of the object
    fn bounding_box(&self) -> Bounds;

    /// Get the center point of the object
    fn center(&self) -> Point3f {
        self.bounding_box().center().cast::<f32>()
    }
}

impl Drawable for TriangleMesh {
    fn bounding_box(&self) -> Bounds {
        self.bounds()
    }
}

impl Drawable for SurfaceActor {
    fn bounding_box(&self) -> Bounds {
        self.bounds()
    }
}

impl Drawable for ImageActor {
    fn bounding_box(&self) -> Bounds {
        self.bounds()
    }
}
