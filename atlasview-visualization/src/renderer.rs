//! In-memory scene holding the viewer's actors

use crate::camera::Camera;
use atlasview_core::{ActorId, Bounds, Drawable, ImageActor, Renderer, SurfaceActor};
use std::collections::BTreeMap;

/// Background color of the atlas window (slate gray)
pub const DEFAULT_BACKGROUND: [f64; 3] = [0.4392, 0.5020, 0.5647];

/// Actors and camera of one render window
#[derive(Debug, Clone)]
pub struct Scene {
    surfaces: BTreeMap<ActorId, SurfaceActor>,
    images: BTreeMap<ActorId, ImageActor>,
    next_id: u64,
    camera: Camera,
    pub background: [f64; 3],
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            surfaces: BTreeMap::new(),
            images: BTreeMap::new(),
            next_id: 0,
            camera: Camera::default(),
            background: DEFAULT_BACKGROUND,
        }
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn surface(&self, id: ActorId) -> Option<&SurfaceActor> {
        self.surfaces.get(&id)
    }

    pub fn image(&self, id: ActorId) -> Option<&ImageActor> {
        self.images.get(&id)
    }

    pub fn surfaces(&self) -> impl Iterator<Item = (ActorId, &SurfaceActor)> + '_ {
        self.surfaces.iter().map(|(id, actor)| (*id, actor))
    }

    pub fn images(&self) -> impl Iterator<Item = (ActorId, &ImageActor)> + '_ {
        self.images.iter().map(|(id, actor)| (*id, actor))
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.surfaces.contains_key(&id) || self.images.contains_key(&id)
    }

    /// Union of the bounds of every visible, non-empty actor
    pub fn visible_bounds(&self) -> Option<Bounds> {
        let surfaces = self
            .surfaces
            .values()
            .filter(|actor| actor.visible && !actor.mesh.is_empty())
            .map(Drawable::bounding_box);
        let images = self
            .images
            .values()
            .filter(|actor| actor.visible && actor.image.pixel_count() > 0)
            .map(Drawable::bounding_box);
        surfaces.chain(images).reduce(|a, b| a.union(&b))
    }

    /// Frame every visible actor
    pub fn reset_camera(&mut self) {
        match self.visible_bounds() {
            Some(bounds) => self.camera.reset(&bounds),
            None => log::warn!("Cannot reset camera: no visible actors"),
        }
    }

    fn allocate_id(&mut self) -> ActorId {
        self.next_id += 1;
        ActorId(self.next_id)
    }
}

impl Renderer for Scene {
    fn add_surface(&mut self, actor: SurfaceActor) -> ActorId {
        let id = self.allocate_id();
        self.surfaces.insert(id, actor);
        id
    }

    fn add_image(&mut self, actor: ImageActor) -> ActorId {
        let id = self.allocate_id();
        self.images.insert(id, actor);
        id
    }

    fn remove_actor(&mut self, id: ActorId) -> bool {
        self.surfaces.remove(&id).is_some() || self.images.remove(&id).is_some()
    }

    fn surface_mut(&mut self, id: ActorId) -> Option<&mut SurfaceActor> {
        self.surfaces.get_mut(&id)
    }

    fn image_mut(&mut self, id: ActorId) -> Option<&mut ImageActor> {
        self.images.get_mut(&id)
    }

    fn reset_clipping_range(&mut self) {
        if let Some(bounds) = self.visible_bounds() {
            self.camera.reset_clipping_range(&bounds);
        }
    }
}
