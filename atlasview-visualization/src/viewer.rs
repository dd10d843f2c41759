//! Viewer state: slice planes, tissue surfaces, display modes and controls
//!
//! The viewer owns the scene and everything the user can change in it. It is
//! driven by explicit calls (`set_slice_offset`, `handle_key`, opacity
//! setters) so that a windowing front end only has to translate its events.

use crate::config::{AtlasConfig, TissueSpec, ViewerConfig};
use crate::renderer::Scene;
use atlasview_core::{
    ActorId, ColorLookupTable, Error, Renderer, Representation, Result, SurfaceActor,
    SurfaceMaterial, TriangleMesh, Vector3d, VolumeSource,
};
use atlasview_reconstruction::{
    compute_normals, NormalsConfig, ReconstructionConfig, SegmentationReconstructor,
};
use atlasview_reslice::{ReslicePipeline, ResliceResult, SlicePlane};
use std::sync::Arc;

/// Opacity applied to tissue surfaces in [`DisplayMode::Translucent`]
pub const TRANSLUCENT_OPACITY: f64 = 0.01;

/// Slider range and current offset of one slice plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceState {
    pub plane: SlicePlane,
    pub offset: i64,
    pub min: i64,
    pub max: i64,
}

impl SliceState {
    /// Initial range and offset for a volume of `dimensions`
    pub fn initial(plane: SlicePlane, dimensions: [usize; 3], axial_offset: i64) -> Self {
        let [dx, dy, dz] = dimensions.map(|d| d as i64);
        let (min, max, offset) = match plane {
            SlicePlane::Axial => (-dz, dz / 2, axial_offset),
            SlicePlane::Coronal => (0, dy, dy / 2),
            SlicePlane::Sagittal => (-dx, 0, (-dx).div_euclid(2)),
        };
        Self {
            plane,
            offset: offset.clamp(min, max),
            min,
            max,
        }
    }

    pub fn clamp(&self, offset: i64) -> i64 {
        offset.clamp(self.min, self.max)
    }
}

/// How tissue surfaces are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    Surface,
    Wireframe,
    Translucent,
    /// Tissues hidden, label volume reconstructed into surfaces
    Segmentation3d,
}

impl DisplayMode {
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Surface => DisplayMode::Wireframe,
            DisplayMode::Wireframe => DisplayMode::Translucent,
            DisplayMode::Translucent => DisplayMode::Segmentation3d,
            DisplayMode::Segmentation3d => DisplayMode::Surface,
        }
    }
}

/// A slider driving one surface's opacity
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityControl {
    pub title: String,
    pub actor: ActorId,
    pub value: f64,
    pub color: [f64; 3],
    pub enabled: bool,
}

/// A slice plane's slider and its two image actors
#[derive(Debug, Clone, PartialEq)]
pub struct SliceControl {
    pub state: SliceState,
    pub gray: ActorId,
    pub labels: Option<ActorId>,
    pub enabled: bool,
}

/// Interactive state of the atlas viewer
pub struct Viewer {
    scene: Scene,
    config: ViewerConfig,
    lut: Arc<ColorLookupTable>,
    reslicer: ReslicePipeline,
    reconstructor: SegmentationReconstructor,
    gray: Option<Box<dyn VolumeSource>>,
    labels: Option<Box<dyn VolumeSource>>,
    slices: Vec<SliceControl>,
    tissues: Vec<OpacityControl>,
    segmentation: Vec<(u32, OpacityControl)>,
    mode: DisplayMode,
}

impl Viewer {
    pub fn new(lut: Arc<ColorLookupTable>, config: ViewerConfig) -> Self {
        let reconstruction = ReconstructionConfig::default()
            .with_similarity_threshold(config.segmentation_threshold)
            .with_material(SurfaceMaterial::default().with_opacity(config.segmentation_opacity));
        Self {
            scene: Scene::new(),
            reslicer: ReslicePipeline::new(lut.clone()),
            reconstructor: SegmentationReconstructor::with_config(lut.clone(), reconstruction),
            lut,
            config,
            gray: None,
            labels: None,
            slices: Vec::new(),
            tissues: Vec::new(),
            segmentation: Vec::new(),
            mode: DisplayMode::Surface,
        }
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn slice_controls(&self) -> &[SliceControl] {
        &self.slices
    }

    pub fn slice_state(&self, plane: SlicePlane) -> Option<SliceState> {
        self.slice_control(plane).map(|control| control.state)
    }

    pub fn tissue_controls(&self) -> &[OpacityControl] {
        &self.tissues
    }

    /// Per-label opacity controls of the reconstructed surfaces
    pub fn segmentation_controls(&self) -> impl Iterator<Item = (u32, &OpacityControl)> + '_ {
        self.segmentation.iter().map(|(label, control)| (*label, control))
    }

    pub fn tissue_actor(&self, name: &str) -> Option<ActorId> {
        self.tissues
            .iter()
            .find(|control| control.title == name)
            .map(|control| control.actor)
    }

    fn slice_control(&self, plane: SlicePlane) -> Option<&SliceControl> {
        self.slices.iter().find(|control| control.state.plane == plane)
    }

    /// Attach the grayscale and optional label volumes and build the three
    /// slice planes at their initial offsets
    pub fn load_volumes(
        &mut self,
        gray: Box<dyn VolumeSource>,
        labels: Option<Box<dyn VolumeSource>>,
    ) -> Result<()> {
        let dimensions = gray.require_volume()?.dimensions();
        self.gray = Some(gray);
        self.labels = labels;

        for control in std::mem::take(&mut self.slices) {
            self.scene.remove_actor(control.gray);
            if let Some(id) = control.labels {
                self.scene.remove_actor(id);
            }
        }

        for plane in SlicePlane::ALL {
            let state = SliceState::initial(plane, dimensions, self.config.initial_axial_offset);
            let result = self.reslice(plane, state.offset)?;
            let gray = self.scene.add_image(result.gray_actor());
            let labels = result.label_actor().map(|actor| self.scene.add_image(actor));
            log::info!(
                "{} slice at {} (range {}..={})",
                plane,
                state.offset,
                state.min,
                state.max
            );
            self.slices.push(SliceControl {
                state,
                gray,
                labels,
                enabled: true,
            });
        }
        Ok(())
    }

    fn reslice(&self, plane: SlicePlane, offset: i64) -> Result<ResliceResult> {
        let gray = self
            .gray
            .as_deref()
            .ok_or_else(|| Error::NoVolumeData("grayscale volume (not attached)".to_string()))?;
        self.reslicer
            .reslice(gray, self.labels.as_deref(), plane, offset)
    }

    /// Move a slice plane. The offset is clamped into the plane's range and
    /// the plane's image actors are updated in place. Returns the applied offset.
    pub fn set_slice_offset(&mut self, plane: SlicePlane, offset: i64) -> Result<i64> {
        let index = self
            .slices
            .iter()
            .position(|control| control.state.plane == plane)
            .ok_or_else(|| Error::NoVolumeData(format!("{} slice (no volume loaded)", plane)))?;

        let applied = self.slices[index].state.clamp(offset);
        let result = self.reslice(plane, applied)?;

        let control = &mut self.slices[index];
        control.state.offset = applied;
        replace_image(&mut self.scene, control.gray, result.gray_actor());
        if let (Some(id), Some(actor)) = (control.labels, result.label_actor()) {
            replace_image(&mut self.scene, id, actor);
        }
        log::debug!("{} slice moved to {}", plane, applied);
        Ok(applied)
    }

    /// Add one tissue surface: oriented, normals recomputed, colored from the
    /// lookup table, with its own opacity control
    pub fn add_tissue(&mut self, spec: &TissueSpec, mut mesh: TriangleMesh) -> Result<ActorId> {
        let transform = spec.orientation.transform().scale(1.0, -1.0, -1.0);
        mesh.transform(&transform);
        compute_normals(&mut mesh, &tissue_normals())?;

        let color = self.lut.rgb(spec.color_index);
        let material = SurfaceMaterial {
            opacity: spec.opacity,
            ambient: 0.0,
            specular: 0.0,
            specular_power: 1.0,
        };
        let id = self
            .scene
            .add_surface(SurfaceActor::new(mesh, color).with_material(material));
        self.tissues.push(OpacityControl {
            title: spec.name.clone(),
            actor: id,
            value: spec.opacity,
            color,
            enabled: true,
        });
        log::debug!("Added tissue {} ({}) as {}", spec.name, spec.orientation, id);
        Ok(id)
    }

    /// Load and add every tissue of an atlas
    pub fn load_tissues(&mut self, atlas: &AtlasConfig) -> Result<Vec<ActorId>> {
        let specs = atlas.tissues()?;
        let mut ids = Vec::with_capacity(specs.len());
        for spec in &specs {
            let mesh = atlasview_io::read_mesh(&spec.path)?;
            ids.push(self.add_tissue(spec, mesh)?);
        }
        log::info!("Loaded {} tissue surfaces", ids.len());
        Ok(ids)
    }

    /// Set a tissue's opacity through its control; `false` for unknown names
    pub fn set_tissue_opacity(&mut self, name: &str, value: f64) -> bool {
        let Some(control) = self.tissues.iter_mut().find(|c| c.title == name) else {
            return false;
        };
        apply_opacity(&mut self.scene, control, value);
        true
    }

    /// Set a reconstructed surface's opacity through its control
    pub fn set_segmentation_opacity(&mut self, label: u32, value: f64) -> bool {
        let Some((_, control)) = self.segmentation.iter_mut().find(|(l, _)| *l == label) else {
            return false;
        };
        apply_opacity(&mut self.scene, control, value);
        true
    }

    /// Frame the scene from the anterior side with head up
    pub fn reset_camera(&mut self) {
        self.scene.reset_camera();
        let camera = self.scene.camera_mut();
        camera.dolly(0.9);
        camera.look_along(Vector3d::y(), Vector3d::z());
        self.scene.reset_clipping_range();
    }

    /// Dispatch a key press. `n` toggles controls, `l` toggles label slices,
    /// `m` cycles the display mode; other keys are ignored.
    pub fn handle_key(&mut self, key: char) -> Result<()> {
        match key.to_ascii_lowercase() {
            'n' => self.toggle_controls(),
            'l' => self.toggle_label_slices(),
            'm' => {
                self.cycle_display_mode()?;
            }
            _ => {}
        }
        Ok(())
    }

    fn toggle_controls(&mut self) {
        for control in &mut self.slices {
            control.enabled = !control.enabled;
        }
        for control in &mut self.tissues {
            control.enabled = !control.enabled;
        }
    }

    fn toggle_label_slices(&mut self) {
        for id in self.slices.iter().filter_map(|control| control.labels) {
            if let Some(actor) = self.scene.image_mut(id) {
                actor.visible = !actor.visible;
            }
        }
    }

    /// Advance to the next display mode and apply it
    pub fn cycle_display_mode(&mut self) -> Result<DisplayMode> {
        self.mode = self.mode.next();
        log::info!("Display mode: {:?}", self.mode);
        match self.mode {
            DisplayMode::Segmentation3d => self.enter_segmentation()?,
            mode => self.show_tissues(mode),
        }
        Ok(self.mode)
    }

    /// Cycle until `mode` is active, passing through the modes in between
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Result<()> {
        while self.mode != mode {
            self.cycle_display_mode()?;
        }
        Ok(())
    }

    fn enter_segmentation(&mut self) -> Result<()> {
        for control in &mut self.tissues {
            control.enabled = false;
            if let Some(actor) = self.scene.surface_mut(control.actor) {
                actor.visible = false;
            }
        }

        let Some(labels) = self.labels.as_deref() else {
            log::warn!("No label volume attached, nothing to reconstruct");
            return Ok(());
        };
        let surfaces = self.reconstructor.reconstruct(labels, &mut self.scene)?;
        self.segmentation = surfaces
            .iter()
            .map(|surface| {
                let control = OpacityControl {
                    title: format!("Seg {}", surface.label),
                    actor: surface.id,
                    value: self.config.segmentation_opacity,
                    color: surface.color,
                    enabled: true,
                };
                (surface.label, control)
            })
            .collect();
        Ok(())
    }

    fn show_tissues(&mut self, mode: DisplayMode) {
        self.segmentation.clear();
        self.reconstructor.clear(&mut self.scene);

        for control in &mut self.slices {
            control.enabled = true;
        }
        for control in &mut self.tissues {
            control.enabled = true;
            let Some(actor) = self.scene.surface_mut(control.actor) else {
                continue;
            };
            actor.visible = true;
            match mode {
                DisplayMode::Wireframe => {
                    actor.representation = Representation::Wireframe;
                    actor.material.opacity = 1.0;
                }
                DisplayMode::Translucent => {
                    actor.representation = Representation::Surface;
                    actor.material.opacity = TRANSLUCENT_OPACITY;
                }
                _ => {
                    actor.representation = Representation::Surface;
                    actor.material.opacity = control.value;
                }
            }
        }
        for id in self.slices.iter().filter_map(|control| control.labels) {
            if let Some(actor) = self.scene.image_mut(id) {
                actor.visible = true;
            }
        }
    }
}

/// Normal settings for tissue surfaces: split along edges sharper than 30°
fn tissue_normals() -> NormalsConfig {
    NormalsConfig::default()
        .with_feature_angle(30.0)
        .with_splitting(true)
}

fn replace_image(scene: &mut Scene, id: ActorId, replacement: atlasview_core::ImageActor) {
    if let Some(actor) = scene.image_mut(id) {
        let visible = actor.visible;
        *actor = replacement;
        actor.visible = visible;
    }
}

fn apply_opacity(scene: &mut Scene, control: &mut OpacityControl, value: f64) {
    control.value = value.clamp(0.0, 1.0);
    if let Some(actor) = scene.surface_mut(control.actor) {
        actor.material.opacity = control.value;
    }
}
