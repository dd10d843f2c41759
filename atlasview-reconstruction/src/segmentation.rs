//! Segmentation surface reconstruction
//!
//! Turns a label volume into one renderable surface per distinct anatomical
//! structure. Each run first removes the surfaces of the previous run, then
//! walks the integer labels `1..=floor(max)`. Every label's isosurface is
//! smoothed and compared with the surfaces accepted so far; near-duplicate
//! shells are dropped. Survivors are flipped into display orientation, given
//! normals and colored from the lookup table.
//!
//! Which scene actors came from this pipeline, and for which label, is kept
//! in a [`SurfaceRegistry`] owned by the reconstructor rather than on the
//! actors themselves.

use crate::marching_cubes::{MarchingCubes, MarchingCubesConfig};
use crate::normals::{compute_normals, NormalsConfig};
use crate::signature::{GeometricSignature, DEFAULT_SIMILARITY_THRESHOLD};
use crate::smoothing::{smooth_mesh, SmoothingConfig};
use atlasview_core::{
    ActorId, ColorLookupTable, Renderer, Result, SurfaceActor, SurfaceMaterial, Transform3D,
    TriangleMesh, Volume, VolumeSource,
};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::Arc;

/// Configuration for segmentation reconstruction
#[derive(Debug, Clone)]
pub struct ReconstructionConfig {
    /// Ratio threshold for rejecting duplicate surfaces
    pub similarity_threshold: f64,
    /// Extraction settings; the iso level is replaced by each label value
    pub marching_cubes: MarchingCubesConfig,
    pub smoothing: SmoothingConfig,
    pub normals: NormalsConfig,
    pub material: SurfaceMaterial,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            marching_cubes: MarchingCubesConfig::default().with_compute_normals(false),
            smoothing: SmoothingConfig::default(),
            normals: NormalsConfig::default(),
            material: SurfaceMaterial::default(),
        }
    }
}

impl ReconstructionConfig {
    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_smoothing(mut self, smoothing: SmoothingConfig) -> Self {
        self.smoothing = smoothing;
        self
    }

    pub fn with_normals(mut self, normals: NormalsConfig) -> Self {
        self.normals = normals;
        self
    }

    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }
}

/// Pipeline that produced a scene surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceOrigin {
    Segmentation,
}

/// Side-table entry for one reconstructed surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTag {
    pub label: u32,
    pub origin: SurfaceOrigin,
}

/// Maps scene actors to the label that produced them
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    tags: BTreeMap<ActorId, SurfaceTag>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ActorId, tag: SurfaceTag) {
        self.tags.insert(id, tag);
    }

    pub fn remove(&mut self, id: ActorId) -> Option<SurfaceTag> {
        self.tags.remove(&id)
    }

    pub fn get(&self, id: ActorId) -> Option<&SurfaceTag> {
        self.tags.get(&id)
    }

    /// Label value that produced the actor
    pub fn label_of(&self, id: ActorId) -> Option<u32> {
        self.tags.get(&id).map(|tag| tag.label)
    }

    pub fn is_segmentation(&self, id: ActorId) -> bool {
        self.tags
            .get(&id)
            .is_some_and(|tag| tag.origin == SurfaceOrigin::Segmentation)
    }

    /// Registered actors in id order
    pub fn ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.tags.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ActorId, &SurfaceTag)> + '_ {
        self.tags.iter().map(|(id, tag)| (*id, tag))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    fn take_all(&mut self) -> Vec<ActorId> {
        std::mem::take(&mut self.tags).into_keys().collect()
    }
}

/// A surface accepted by the reconstruction and handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSurface {
    pub id: ActorId,
    pub label: u32,
    /// Signature of the smoothed surface before display correction
    pub signature: GeometricSignature,
    pub color: [f64; 3],
}

/// Labels to reconstruct: `1` through the floor of the volume maximum
pub fn label_range(volume: &Volume) -> RangeInclusive<u32> {
    let (_, max) = volume.scalar_range();
    let last = if max.is_finite() && max >= 1.0 {
        max.floor() as u32
    } else {
        0
    };
    1..=last
}

/// Display correction applied to accepted surfaces
pub fn surface_correction() -> Transform3D {
    Transform3D::scaling(1.0, -1.0, 1.0)
}

/// Rebuilds the scene's segmentation surfaces from a label volume
#[derive(Debug, Clone)]
pub struct SegmentationReconstructor {
    config: ReconstructionConfig,
    lut: Arc<ColorLookupTable>,
    registry: SurfaceRegistry,
}

impl SegmentationReconstructor {
    pub fn new(lut: Arc<ColorLookupTable>) -> Self {
        Self::with_config(lut, ReconstructionConfig::default())
    }

    pub fn with_config(lut: Arc<ColorLookupTable>, config: ReconstructionConfig) -> Self {
        Self {
            config,
            lut,
            registry: SurfaceRegistry::new(),
        }
    }

    pub fn config(&self) -> &ReconstructionConfig {
        &self.config
    }

    pub fn set_similarity_threshold(&mut self, threshold: f64) {
        self.config.similarity_threshold = threshold;
    }

    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    /// Remove every surface of the previous run from the scene
    pub fn clear(&mut self, renderer: &mut dyn Renderer) -> usize {
        let ids = self.registry.take_all();
        let removed = ids
            .into_iter()
            .filter(|&id| renderer.remove_actor(id))
            .count();
        if removed > 0 {
            log::debug!("Removed {} segmentation surfaces", removed);
        }
        removed
    }

    /// Replace the scene's segmentation surfaces with a fresh reconstruction.
    ///
    /// Fails with `NoVolumeData` before touching the scene when the label
    /// source is empty. Labels without a surface, or whose surface is flat
    /// along some axis, are skipped.
    pub fn reconstruct(
        &mut self,
        labels: &dyn VolumeSource,
        renderer: &mut dyn Renderer,
    ) -> Result<Vec<LabelSurface>> {
        let volume = labels.require_volume()?;
        self.clear(renderer);

        let range = label_range(volume);
        log::info!(
            "Reconstructing segmentation surfaces for labels {}..={} (threshold {})",
            range.start(),
            range.end(),
            self.config.similarity_threshold
        );

        let mut accepted: Vec<LabelSurface> = Vec::new();
        let mut duplicates = 0;
        for label in range {
            let Some(mesh) = self.extract_label(volume, label)? else {
                log::debug!("Label {}: no surface", label);
                continue;
            };

            let signature = GeometricSignature::from_mesh(&mesh);
            if signature.is_degenerate() {
                log::debug!(
                    "Label {}: degenerate surface ({} points, {} cells, volume {}), skipped",
                    label,
                    signature.point_count,
                    signature.cell_count,
                    signature.volume
                );
                continue;
            }
            if let Some(original) = accepted
                .iter()
                .find(|prior| signature.is_similar_to(&prior.signature, self.config.similarity_threshold))
            {
                log::debug!("Label {}: duplicate of label {}, discarded", label, original.label);
                duplicates += 1;
                continue;
            }

            let surface = self.emit_surface(mesh, label, signature, renderer)?;
            accepted.push(surface);
        }

        renderer.reset_clipping_range();
        log::info!(
            "Segmentation reconstruction kept {} surfaces, discarded {} duplicates",
            accepted.len(),
            duplicates
        );
        Ok(accepted)
    }

    /// Extract and smooth one label's isosurface; `None` when it has no points
    fn extract_label(&self, volume: &Volume, label: u32) -> Result<Option<TriangleMesh>> {
        let config = self
            .config
            .marching_cubes
            .clone()
            .with_iso_level(label as f32);
        let mut mesh = MarchingCubes::new(config).extract_isosurface(volume)?;
        if mesh.vertex_count() == 0 {
            return Ok(None);
        }
        smooth_mesh(&mut mesh, &self.config.smoothing)?;
        Ok(Some(mesh))
    }

    fn emit_surface(
        &mut self,
        mut mesh: TriangleMesh,
        label: u32,
        signature: GeometricSignature,
        renderer: &mut dyn Renderer,
    ) -> Result<LabelSurface> {
        // normals first: the mirror flips winding but carries normals outward
        compute_normals(&mut mesh, &self.config.normals)?;
        mesh.transform(&surface_correction());

        let color = self.lut.rgb(label as i64);
        let actor = SurfaceActor::new(mesh, color).with_material(self.config.material);
        let id = renderer.add_surface(actor);
        self.registry.insert(
            id,
            SurfaceTag {
                label,
                origin: SurfaceOrigin::Segmentation,
            },
        );

        log::debug!(
            "Label {}: {} points, {} cells as {}",
            label,
            signature.point_count,
            signature.cell_count,
            id
        );
        Ok(LabelSurface {
            id,
            label,
            signature,
            color,
        })
    }
}
