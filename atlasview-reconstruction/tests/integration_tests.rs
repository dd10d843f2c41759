//! Integration tests for atlasview-reconstruction
//!
//! These tests run the full segmentation reconstruction against a recording
//! renderer and check which labels survive duplicate rejection.

use approx::assert_abs_diff_eq;
use atlasview_core::{
    ActorId, ColorLookupTable, Error, ImageActor, Point3d, Renderer, SurfaceActor, Volume,
    VolumeSource,
};
use atlasview_reconstruction::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Renderer that just keeps its actors
#[derive(Default)]
struct RecordingRenderer {
    surfaces: BTreeMap<ActorId, SurfaceActor>,
    images: BTreeMap<ActorId, ImageActor>,
    next_id: u64,
    clipping_resets: usize,
}

impl RecordingRenderer {
    fn next(&mut self) -> ActorId {
        self.next_id += 1;
        ActorId(self.next_id)
    }
}

impl Renderer for RecordingRenderer {
    fn add_surface(&mut self, actor: SurfaceActor) -> ActorId {
        let id = self.next();
        self.surfaces.insert(id, actor);
        id
    }

    fn add_image(&mut self, actor: ImageActor) -> ActorId {
        let id = self.next();
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
        self.clipping_resets += 1;
    }
}

struct Unloaded;

impl VolumeSource for Unloaded {
    fn volume(&self) -> Option<&Volume> {
        None
    }

    fn describe(&self) -> String {
        "labels.nii (not loaded)".to_string()
    }
}

fn label_volume(size: usize) -> Volume {
    Volume::new([size; 3], [1.0; 3], Point3d::origin()).unwrap()
}

fn reconstructor() -> SegmentationReconstructor {
    SegmentationReconstructor::new(Arc::new(ColorLookupTable::new()))
}

fn labels_of(surfaces: &[LabelSurface]) -> Vec<u32> {
    surfaces.iter().map(|s| s.label).collect()
}

fn reconstructor_with_threshold(threshold: f64) -> SegmentationReconstructor {
    let config = ReconstructionConfig::default().with_similarity_threshold(threshold);
    SegmentationReconstructor::with_config(Arc::new(ColorLookupTable::new()), config)
}

#[test]
fn test_nested_shells_collapse_to_one_surface() {
    // a single large label-2 block: the label-1 and label-2 isosurfaces are
    // concentric shells with the same topology
    let mut volume = label_volume(48);
    volume.fill_box([2, 2, 2], [45, 45, 45], 2.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let mut recon = reconstructor();
    let surfaces = recon.reconstruct(&volume, &mut renderer).unwrap();

    assert_eq!(labels_of(&surfaces), vec![1]);
    assert_eq!(renderer.surfaces.len(), 1);
    assert_eq!(renderer.clipping_resets, 1);

    let surface = &surfaces[0];
    assert_eq!(recon.registry().label_of(surface.id), Some(1));
    assert!(recon.registry().is_segmentation(surface.id));

    let actor = &renderer.surfaces[&surface.id];
    assert_eq!(actor.color, ColorLookupTable::new().rgb(1));
    assert_eq!(actor.material.opacity, 0.9);
    assert_eq!(actor.material.specular_power, 50.0);
    assert_eq!(
        actor.mesh.normals.as_ref().map(Vec::len),
        Some(actor.mesh.vertex_count())
    );
}

#[test]
fn test_accepted_surfaces_are_flipped_in_y() {
    let mut volume = label_volume(48);
    volume.fill_box([2, 2, 2], [45, 45, 45], 2.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor().reconstruct(&volume, &mut renderer).unwrap();

    // the signature is taken before the correction
    let b = surfaces[0].signature.bounds.0;
    assert_abs_diff_eq!(b[2], 1.5, epsilon = 1e-3);
    assert_abs_diff_eq!(b[3], 45.5, epsilon = 1e-3);

    let placed = renderer.surfaces[&surfaces[0].id].mesh.bounds().0;
    assert_abs_diff_eq!(placed[2], -45.5, epsilon = 1e-3);
    assert_abs_diff_eq!(placed[3], -1.5, epsilon = 1e-3);
    assert_abs_diff_eq!(placed[4], 1.5, epsilon = 1e-3);
}

#[test]
fn test_maximum_of_three_iterates_labels_one_to_three() {
    let mut volume = label_volume(40);
    volume.fill_box([2, 2, 2], [5, 5, 5], 1.0).unwrap();
    volume.fill_box([12, 12, 12], [17, 17, 17], 2.0).unwrap();
    volume.fill_box([25, 25, 25], [32, 32, 32], 3.0).unwrap();
    assert_eq!(label_range(&volume), 1..=3);

    let mut renderer = RecordingRenderer::default();
    let mut recon = reconstructor();
    let surfaces = recon.reconstruct(&volume, &mut renderer).unwrap();

    assert_eq!(labels_of(&surfaces), vec![1, 2, 3]);
    assert_eq!(recon.registry().len(), 3);
    for surface in &surfaces {
        assert!(!surface.signature.is_degenerate());
        assert_eq!(recon.registry().label_of(surface.id), Some(surface.label));
    }
}

#[test]
fn test_separated_structures_survive_zero_threshold() {
    let mut volume = label_volume(30);
    volume.fill_box([2, 2, 2], [7, 7, 7], 1.0).unwrap();
    volume.fill_box([20, 20, 20], [25, 25, 25], 2.0).unwrap();

    let config = ReconstructionConfig::default().with_similarity_threshold(0.0);
    let mut recon = SegmentationReconstructor::with_config(Arc::new(ColorLookupTable::new()), config);
    let mut renderer = RecordingRenderer::default();
    let surfaces = recon.reconstruct(&volume, &mut renderer).unwrap();

    assert_eq!(labels_of(&surfaces), vec![1, 2]);
    let scores = surfaces[0]
        .signature
        .similarity(&surfaces[1].signature)
        .unwrap();
    assert!(scores.center_similarity < CENTER_SIMILARITY_BAR);
}

#[test]
fn test_reconstruction_replaces_previous_surfaces() {
    let mut volume = label_volume(40);
    volume.fill_box([2, 2, 2], [5, 5, 5], 1.0).unwrap();
    volume.fill_box([12, 12, 12], [17, 17, 17], 2.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let mut recon = reconstructor();
    let first = recon.reconstruct(&volume, &mut renderer).unwrap();
    let second = recon.reconstruct(&volume, &mut renderer).unwrap();

    assert_eq!(labels_of(&first), labels_of(&second));
    assert_eq!(renderer.surfaces.len(), second.len());
    for old in &first {
        assert!(!renderer.surfaces.contains_key(&old.id));
        assert_eq!(recon.registry().label_of(old.id), None);
    }

    assert_eq!(recon.clear(&mut renderer), second.len());
    assert!(renderer.surfaces.is_empty());
    assert!(recon.registry().is_empty());
}

#[test]
fn test_clear_leaves_other_actors_alone() {
    let mut volume = label_volume(20);
    volume.fill_box([5, 5, 5], [10, 10, 10], 1.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let tissue = renderer.add_surface(SurfaceActor::new(Default::default(), [1.0, 0.0, 0.0]));
    let mut recon = reconstructor();
    recon.reconstruct(&volume, &mut renderer).unwrap();
    recon.reconstruct(&volume, &mut renderer).unwrap();

    assert!(renderer.surfaces.contains_key(&tissue));
    assert_eq!(renderer.surfaces.len(), 2);
    assert!(!recon.registry().is_segmentation(tissue));
}

#[test]
fn test_background_only_volume_yields_nothing() {
    let volume = label_volume(8);
    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor().reconstruct(&volume, &mut renderer).unwrap();
    assert!(surfaces.is_empty());
    assert_eq!(renderer.clipping_resets, 1);
}

#[test]
fn test_unloaded_labels_fail_without_touching_scene() {
    let mut volume = label_volume(20);
    volume.fill_box([5, 5, 5], [10, 10, 10], 1.0).unwrap();
    let mut renderer = RecordingRenderer::default();
    let mut recon = reconstructor();
    recon.reconstruct(&volume, &mut renderer).unwrap();

    match recon.reconstruct(&Unloaded, &mut renderer) {
        Err(Error::NoVolumeData(source)) => assert!(source.contains("labels.nii")),
        other => panic!("expected missing volume data, got {:?}", other.map(|s| s.len())),
    }
    assert_eq!(renderer.surfaces.len(), 1);
    assert_eq!(recon.registry().len(), 1);
}

#[test]
fn test_marching_cubes_feeds_smoothing_and_normals() {
    let volume = create_sphere_volume(Point3d::new(4.0, 4.0, 4.0), 2.5, [17, 17, 17], [0.5; 3]).unwrap();
    let mut mesh = marching_cubes(&volume, 0.0).unwrap();
    let before = GeometricSignature::from_mesh(&mesh);

    smooth_mesh(&mut mesh, &SmoothingConfig::default()).unwrap();
    compute_normals(&mut mesh, &NormalsConfig::default()).unwrap();
    let after = GeometricSignature::from_mesh(&mesh);

    assert_eq!(before.point_count, after.point_count);
    assert!(after.volume <= before.volume);
    assert!(are_similar(&before, &after, DEFAULT_SIMILARITY_THRESHOLD));
    assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(mesh.vertex_count()));
}

#[test]
fn test_emitted_normals_point_outward() {
    let mut volume = label_volume(20);
    volume.fill_box([5, 5, 5], [14, 14, 14], 1.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor().reconstruct(&volume, &mut renderer).unwrap();
    assert_eq!(labels_of(&surfaces), vec![1]);

    let mesh = &renderer.surfaces[&surfaces[0].id].mesh;
    let center = mesh.bounds().center();
    let normals = mesh.normals.as_ref().unwrap();
    let inward = mesh
        .vertices
        .iter()
        .zip(normals)
        .filter(|(p, n)| (p.cast::<f64>() - center).dot(&n.cast::<f64>()) <= 0.0)
        .count();
    assert_eq!(inward, 0);
}

#[test]
fn test_flat_label_surface_is_skipped() {
    // a one-voxel sheet: every isosurface vertex lands in the plane z = 5
    let mut volume = label_volume(16);
    volume.fill_box([3, 3, 5], [12, 12, 5], 1.0).unwrap();

    let flat = GeometricSignature::from_mesh(&marching_cubes(&volume, 1.0).unwrap());
    assert!(flat.point_count > 0);
    assert!(flat.is_degenerate());

    let mut renderer = RecordingRenderer::default();
    let mut recon = reconstructor();
    let surfaces = recon.reconstruct(&volume, &mut renderer).unwrap();
    assert!(surfaces.is_empty());
    assert!(renderer.surfaces.is_empty());
    assert!(recon.registry().is_empty());
}

#[test]
fn test_offset_clusters_survive_and_concentric_shells_collapse() {
    // label 2 block with a label 1 slab on its low-x side: the label 1 shell
    // is the same box stretched toward -x, so its center is shifted
    let mut offset = label_volume(28);
    offset.fill_box([8, 6, 6], [11, 15, 15], 1.0).unwrap();
    offset.fill_box([12, 6, 6], [21, 15, 15], 2.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor_with_threshold(0.0)
        .reconstruct(&offset, &mut renderer)
        .unwrap();
    assert_eq!(labels_of(&surfaces), vec![1, 2]);
    let scores = surfaces[0]
        .signature
        .similarity(&surfaces[1].signature)
        .unwrap();
    assert!(scores.center_similarity < CENTER_SIMILARITY_BAR);

    // one label 2 block: both shells share a center
    let mut concentric = label_volume(28);
    concentric.fill_box([4, 4, 4], [23, 23, 23], 2.0).unwrap();

    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor_with_threshold(0.0)
        .reconstruct(&concentric, &mut renderer)
        .unwrap();
    assert_eq!(labels_of(&surfaces), vec![1]);
    assert_eq!(renderer.surfaces.len(), 1);

    // the same shells pass the center bar but not a near-exact volume ratio
    let mut renderer = RecordingRenderer::default();
    let surfaces = reconstructor_with_threshold(0.99)
        .reconstruct(&concentric, &mut renderer)
        .unwrap();
    assert_eq!(labels_of(&surfaces), vec![1, 2]);
    let scores = surfaces[0]
        .signature
        .similarity(&surfaces[1].signature)
        .unwrap();
    assert!(scores.center_similarity >= CENTER_SIMILARITY_BAR);
    assert!(scores.volume_ratio < 0.99);
}
