//! Integration tests for atlasview-visualization
//!
//! These drive the viewer through volume loading, slice moves, key presses
//! and display mode changes against in-memory volumes.

use approx::assert_relative_eq;
use atlasview_core::{
    ColorLookupTable, Error, Point3d, Point3f, Representation, TriangleMesh, Volume, VolumeSource,
};
use atlasview_reslice::{OrientationCode, SlicePlane};
use atlasview_visualization::*;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const DIMS: [usize; 3] = [20, 30, 40];

fn gray_volume() -> Volume {
    let mut volume = Volume::new(DIMS, [1.0; 3], Point3d::origin()).unwrap();
    volume.fill_box([0, 0, 0], [19, 29, 39], 100.0).unwrap();
    volume
}

fn label_volume() -> Volume {
    let mut volume = Volume::new(DIMS, [1.0; 3], Point3d::origin()).unwrap();
    volume.fill_box([2, 2, 2], [5, 5, 5], 1.0).unwrap();
    volume.fill_box([10, 12, 20], [15, 18, 30], 2.0).unwrap();
    volume
}

fn tetrahedron() -> TriangleMesh {
    TriangleMesh::from_vertices_and_faces(
        vec![
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(2.0, 2.0, 3.0),
            Point3f::new(1.0, 3.0, 3.0),
            Point3f::new(1.0, 2.0, 4.0),
        ],
        vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]],
    )
}

fn tissue(name: &str, orientation: OrientationCode, opacity: f64, index: i64) -> TissueSpec {
    TissueSpec {
        name: name.to_string(),
        path: PathBuf::from(format!("{}.vtk", name)),
        orientation,
        opacity,
        color_index: index,
    }
}

fn viewer_with_volumes() -> Viewer {
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    viewer
        .load_volumes(Box::new(gray_volume()), Some(Box::new(label_volume())))
        .unwrap();
    viewer
}

struct Pending;

impl VolumeSource for Pending {
    fn volume(&self) -> Option<&Volume> {
        None
    }

    fn describe(&self) -> String {
        "labels.nii (not loaded)".to_string()
    }
}

#[test]
fn test_load_volumes_builds_three_planes() {
    let viewer = viewer_with_volumes();
    assert_eq!(viewer.slice_controls().len(), 3);
    assert_eq!(viewer.scene().image_count(), 6);

    assert_eq!(viewer.slice_state(SlicePlane::Axial).map(|s| s.offset), Some(-40));
    assert_eq!(viewer.slice_state(SlicePlane::Coronal).map(|s| s.offset), Some(15));
    assert_eq!(viewer.slice_state(SlicePlane::Sagittal).map(|s| s.offset), Some(-10));

    for control in viewer.slice_controls() {
        let labels = control.labels.and_then(|id| viewer.scene().image(id)).unwrap();
        assert!(labels.image.is_rgba());
        assert!(!labels.interpolate);
    }
}

#[test]
fn test_slice_move_clamps_and_updates_in_place() {
    let mut viewer = viewer_with_volumes();
    let before = viewer.slice_controls()[0].clone();
    let placement = viewer.scene().image(before.gray).unwrap().user_transform;

    let applied = viewer.set_slice_offset(SlicePlane::Axial, 1000).unwrap();
    assert_eq!(applied, 20);

    let after = viewer.slice_controls()[0].clone();
    assert_eq!(after.gray, before.gray);
    assert_eq!(after.labels, before.labels);
    assert_eq!(after.state.offset, 20);
    assert_eq!(viewer.scene().image_count(), 6);
    assert_ne!(viewer.scene().image(after.gray).unwrap().user_transform, placement);
}

#[test]
fn test_slice_move_keeps_label_visibility() {
    let mut viewer = viewer_with_volumes();
    viewer.handle_key('l').unwrap();
    viewer.set_slice_offset(SlicePlane::Coronal, 3).unwrap();

    let control = &viewer.slice_controls()[1];
    assert_eq!(control.state.plane, SlicePlane::Coronal);
    let labels = viewer.scene().image(control.labels.unwrap()).unwrap();
    assert!(!labels.visible);
    assert!(viewer.scene().image(control.gray).unwrap().visible);
}

#[test]
fn test_unloaded_label_source_is_reported() {
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    match viewer.load_volumes(Box::new(gray_volume()), Some(Box::new(Pending))) {
        Err(Error::NoVolumeData(source)) => assert!(source.contains("labels.nii")),
        other => panic!("expected missing volume data, got {:?}", other.is_ok()),
    }
}

#[test]
fn test_slice_move_without_volume_fails() {
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    assert!(matches!(
        viewer.set_slice_offset(SlicePlane::Axial, 0),
        Err(Error::NoVolumeData(_))
    ));
}

#[test]
fn test_tissue_orientation_and_display_correction() {
    let lut = ColorLookupTable::new();
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());

    let plain = viewer
        .add_tissue(&tissue("ivc", OrientationCode::Identity, 0.7, 3), tetrahedron())
        .unwrap();
    let flipped = viewer
        .add_tissue(&tissue("aorta", OrientationCode::Ap, 1.0, 5), tetrahedron())
        .unwrap();

    let actor = viewer.scene().surface(plain).unwrap();
    assert_eq!(actor.mesh.vertices[0], Point3f::new(1.0, -2.0, -3.0));
    assert_eq!(actor.color, lut.rgb(3));
    assert_eq!(actor.material.opacity, 0.7);
    assert!(actor.mesh.normals.is_some());

    // the Y flip of "ap" undoes the display Y flip
    let actor = viewer.scene().surface(flipped).unwrap();
    assert_eq!(actor.mesh.vertices[0], Point3f::new(1.0, 2.0, -3.0));

    assert_eq!(viewer.tissue_controls().len(), 2);
    assert_eq!(viewer.tissue_actor("aorta"), Some(flipped));
}

#[test]
fn test_opacity_controls_drive_actors() {
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    let id = viewer
        .add_tissue(&tissue("spleen", OrientationCode::Identity, 1.0, 2), tetrahedron())
        .unwrap();

    assert!(viewer.set_tissue_opacity("spleen", 0.25));
    assert_eq!(viewer.scene().surface(id).unwrap().material.opacity, 0.25);
    assert!(viewer.set_tissue_opacity("spleen", 3.0));
    assert_eq!(viewer.tissue_controls()[0].value, 1.0);
    assert!(!viewer.set_tissue_opacity("stomach", 0.5));
}

#[test]
fn test_control_and_label_toggles() {
    let mut viewer = viewer_with_volumes();
    viewer
        .add_tissue(&tissue("ivc", OrientationCode::Identity, 1.0, 1), tetrahedron())
        .unwrap();

    viewer.handle_key('N').unwrap();
    assert!(viewer.slice_controls().iter().all(|c| !c.enabled));
    assert!(viewer.tissue_controls().iter().all(|c| !c.enabled));
    viewer.handle_key('n').unwrap();
    assert!(viewer.slice_controls().iter().all(|c| c.enabled));

    viewer.handle_key('l').unwrap();
    for control in viewer.slice_controls() {
        assert!(!viewer.scene().image(control.labels.unwrap()).unwrap().visible);
        assert!(viewer.scene().image(control.gray).unwrap().visible);
    }

    // unbound keys change nothing
    viewer.handle_key('x').unwrap();
    assert_eq!(viewer.display_mode(), DisplayMode::Surface);
}

#[test]
fn test_display_mode_cycle() {
    let mut viewer = viewer_with_volumes();
    let ivc = viewer
        .add_tissue(&tissue("ivc", OrientationCode::Identity, 0.6, 1), tetrahedron())
        .unwrap();
    viewer.handle_key('l').unwrap();

    viewer.handle_key('m').unwrap();
    assert_eq!(viewer.display_mode(), DisplayMode::Wireframe);
    let actor = viewer.scene().surface(ivc).unwrap();
    assert_eq!(actor.representation, Representation::Wireframe);
    assert_eq!(actor.material.opacity, 1.0);
    // label slices come back with every non-segmentation mode
    let labels = viewer.slice_controls()[0].labels.unwrap();
    assert!(viewer.scene().image(labels).unwrap().visible);

    viewer.handle_key('m').unwrap();
    assert_eq!(viewer.display_mode(), DisplayMode::Translucent);
    let actor = viewer.scene().surface(ivc).unwrap();
    assert_eq!(actor.representation, Representation::Surface);
    assert_relative_eq!(actor.material.opacity, TRANSLUCENT_OPACITY);

    viewer.handle_key('m').unwrap();
    assert_eq!(viewer.display_mode(), DisplayMode::Segmentation3d);
    assert!(!viewer.scene().surface(ivc).unwrap().visible);
    assert!(viewer.tissue_controls().iter().all(|c| !c.enabled));
    assert!(viewer.slice_controls().iter().all(|c| c.enabled));

    let labels: Vec<u32> = viewer.segmentation_controls().map(|(label, _)| label).collect();
    assert_eq!(labels, vec![1, 2]);
    for (_, control) in viewer.segmentation_controls() {
        assert_eq!(control.value, 0.9);
        let actor = viewer.scene().surface(control.actor).unwrap();
        assert_eq!(actor.material.opacity, 0.9);
        assert_eq!(actor.color, control.color);
    }
    assert_eq!(viewer.scene().surface_count(), 3);
    assert!(viewer.set_segmentation_opacity(2, 0.4));

    viewer.handle_key('m').unwrap();
    assert_eq!(viewer.display_mode(), DisplayMode::Surface);
    assert_eq!(viewer.segmentation_controls().count(), 0);
    assert_eq!(viewer.scene().surface_count(), 1);
    let actor = viewer.scene().surface(ivc).unwrap();
    assert!(actor.visible);
    assert_eq!(actor.material.opacity, 0.6);
    assert!(viewer.tissue_controls().iter().all(|c| c.enabled));
}

#[test]
fn test_segmentation_mode_without_labels() {
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    viewer.load_volumes(Box::new(gray_volume()), None).unwrap();
    assert_eq!(viewer.scene().image_count(), 3);

    for _ in 0..3 {
        viewer.cycle_display_mode().unwrap();
    }
    assert_eq!(viewer.display_mode(), DisplayMode::Segmentation3d);
    assert_eq!(viewer.segmentation_controls().count(), 0);
}

#[test]
fn test_camera_covers_scene_after_reset() {
    let mut viewer = viewer_with_volumes();
    viewer
        .add_tissue(&tissue("ivc", OrientationCode::Identity, 1.0, 1), tetrahedron())
        .unwrap();
    viewer.reset_camera();

    let bounds = viewer.scene().visible_bounds().unwrap();
    let camera = viewer.scene().camera();
    let direction = camera.direction_of_projection();
    assert_relative_eq!(camera.up.z, 1.0);
    assert!(camera.near > 0.0 && camera.near < camera.far);
    for corner in bounds.corners() {
        let depth = (corner - camera.position).dot(&direction);
        assert!(depth <= camera.far);
    }
}

#[test]
fn test_load_tissues_from_atlas() {
    let dir = std::env::temp_dir().join("atlasview_viewer_atlas");
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("Liver_Gallbladder.vtk"),
        "# vtk DataFile Version 3.0\ngallbladder\nASCII\nDATASET POLYDATA\nPOINTS 4 float\n\
         0 0 0 1 0 0 0 1 0 0 0 1\nPOLYGONS 4 16\n3 0 2 1\n3 0 1 3\n3 0 3 2\n3 1 2 3\n",
    )
    .unwrap();
    let json = serde_json::json!({
        "files": { "root": dir, "vtk_files": ["Liver_Gallbladder.vtk"] },
        "tissues": {
            "names": ["gallbladder"],
            "orientation": { "gallbladder": "I" },
            "opacity": { "gallbladder": 0.8 },
            "indices": { "gallbladder": 7 }
        }
    });
    let config_path = dir.join("atlas.json");
    fs::write(&config_path, json.to_string()).unwrap();

    let atlas = AtlasConfig::load(&config_path).unwrap();
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), ViewerConfig::default());
    let ids = viewer.load_tissues(&atlas).unwrap();

    assert_eq!(ids.len(), 1);
    let actor = viewer.scene().surface(ids[0]).unwrap();
    assert_eq!(actor.mesh.face_count(), 4);
    assert_eq!(actor.material.opacity, 0.8);
    assert_eq!(viewer.tissue_controls()[0].title, "gallbladder");

    let _ = fs::remove_dir_all(&dir);
}
