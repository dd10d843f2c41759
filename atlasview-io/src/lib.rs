//! I/O operations for volumes and surfaces
//!
//! This crate reads the grayscale and label volumes (NIfTI) and the anatomical
//! surface files (legacy VTK polydata and PLY) that the viewer displays.

pub mod error;
pub mod ply;
pub mod volume;
pub mod vtk;

pub use error::*;
pub use ply::{PlyReader, PlyWriter};
pub use volume::{read_nifti, read_volume, VolumeReader};
pub use vtk::VtkReader;

use atlasview_core::{Error, Result, TriangleMesh};
use std::path::Path;

/// Trait for reading meshes from files
pub trait MeshReader {
    fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh>;
}

/// Trait for writing meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &TriangleMesh, path: P) -> Result<()>;
}

/// Auto-detect format and read mesh
pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match extension.as_deref() {
        Some("vtk") => VtkReader::read_mesh(path),
        Some("ply") => PlyReader::read_mesh(path),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}
