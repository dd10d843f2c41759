//! Headless driver for the atlas viewer.
//!
//! Loads an atlas configuration, a grayscale volume and an optional label
//! volume into the viewer state, then reports slices and reconstructed
//! segmentation surfaces without opening a window.

use anyhow::{bail, Context};
use atlasview_core::ColorLookupTable;
use atlasview_io::VolumeReader;
use atlasview_reconstruction::parallel::{init_thread_pool, ThreadPoolConfig};
use atlasview_reslice::SlicePlane;
use atlasview_visualization::{AtlasConfig, DisplayMode, Viewer, ViewerConfig};
use clap::{ArgAction, Parser};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless anatomical atlas viewer")]
struct Args {
    /// Atlas JSON describing the tissue surfaces
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grayscale volume (NIfTI)
    #[arg(long)]
    volume: Option<PathBuf>,

    /// Label volume (NIfTI), co-registered with the grayscale volume
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Slice plane to move and report: axial, coronal or sagittal
    #[arg(short, long)]
    plane: Option<SlicePlane>,

    /// Signed slice offset for --plane
    #[arg(short, long, allow_hyphen_values = true)]
    offset: Option<i64>,

    /// Reconstruct the label volume into surfaces
    #[arg(short, long)]
    segmentation: bool,

    /// Similarity threshold for duplicate surface rejection
    #[arg(short, long)]
    threshold: Option<f64>,

    /// Worker threads for reconstruction (defaults to all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    SimpleLogger::new()
        .with_level(level(args.verbose))
        .env()
        .init()
        .context("failed to install logger")?;

    if let Some(threads) = args.threads {
        init_thread_pool(ThreadPoolConfig::default().with_threads(threads))?;
    }

    let mut viewer_config = ViewerConfig::default();
    if let Some(threshold) = args.threshold {
        viewer_config = viewer_config.with_segmentation_threshold(threshold);
    }
    let mut viewer = Viewer::new(Arc::new(ColorLookupTable::new()), viewer_config);

    if let Some(path) = &args.config {
        let atlas = AtlasConfig::load(path)
            .with_context(|| format!("failed to load atlas config {}", path.display()))?;
        let ids = viewer.load_tissues(&atlas)?;
        println!("tissues: {}", ids.len());
    }

    match (&args.volume, &args.labels) {
        (Some(volume), labels) => {
            let mut gray = VolumeReader::new(volume);
            gray.update()
                .with_context(|| format!("failed to read volume {}", volume.display()))?;
            let labels = match labels {
                Some(path) => {
                    let mut reader = VolumeReader::new(path);
                    reader
                        .update()
                        .with_context(|| format!("failed to read labels {}", path.display()))?;
                    Some(Box::new(reader) as Box<dyn atlasview_core::VolumeSource>)
                }
                None => None,
            };
            viewer.load_volumes(Box::new(gray), labels)?;
        }
        (None, Some(_)) => bail!("--labels requires --volume"),
        (None, None) => {}
    }

    if let Some(plane) = args.plane {
        let Some(state) = viewer.slice_state(plane) else {
            bail!("--plane requires --volume");
        };
        let applied = viewer.set_slice_offset(plane, args.offset.unwrap_or(state.offset))?;
        report_slice(&viewer, plane, applied);
    }

    if args.segmentation {
        if args.labels.is_none() {
            bail!("--segmentation requires --labels");
        }
        viewer.set_display_mode(DisplayMode::Segmentation3d)?;
        for (label, control) in viewer.segmentation_controls() {
            let Some(actor) = viewer.scene().surface(control.actor) else {
                continue;
            };
            println!(
                "label {}: {} points, {} cells",
                label,
                actor.mesh.vertex_count(),
                actor.mesh.face_count()
            );
        }
    }

    viewer.reset_camera();
    log::info!(
        "Scene: {} surfaces, {} images",
        viewer.scene().surface_count(),
        viewer.scene().image_count()
    );
    Ok(())
}

fn report_slice(viewer: &Viewer, plane: SlicePlane, offset: i64) {
    let Some(control) = viewer
        .slice_controls()
        .iter()
        .find(|control| control.state.plane == plane)
    else {
        return;
    };
    let Some(gray) = viewer.scene().image(control.gray) else {
        return;
    };
    let [columns, rows] = gray.image.dimensions();
    let placement = gray.user_transform.matrix.fixed_view::<3, 1>(0, 3);
    println!(
        "{} slice {} (range {}..={}): {}x{} pixels, translation ({:.2}, {:.2}, {:.2})",
        plane,
        offset,
        control.state.min,
        control.state.max,
        columns,
        rows,
        placement[0],
        placement[1],
        placement[2]
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slice_request() {
        let args = Args::try_parse_from([
            "atlasview", "--volume", "ct.nii", "--plane", "coronal", "--offset", "-12", "-vv",
        ])
        .unwrap();
        assert_eq!(args.plane, Some(SlicePlane::Coronal));
        assert_eq!(args.offset, Some(-12));
        assert_eq!(level(args.verbose), LevelFilter::Trace);
        assert!(!args.segmentation);
    }

    #[test]
    fn test_unknown_plane_is_rejected() {
        assert!(Args::try_parse_from(["atlasview", "--plane", "oblique"]).is_err());
    }
}
