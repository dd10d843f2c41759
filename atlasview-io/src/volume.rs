//! Volume readers
//!
//! NIfTI-1 files (`.nii`, `.nii.gz`) are decoded with the `nifti` crate. The
//! image frame starts at the origin, with spacing taken from `pixdim`.

use crate::error::IoError;
use atlasview_core::{Error, Point3d, Result, Volume, VolumeSource};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};

/// Read a NIfTI volume into memory
pub fn read_nifti<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let obj = ReaderOptions::new()
        .read_file(path)
        .map_err(IoError::from)?;
    let pixdim = obj.header().pixdim;

    let array = obj
        .into_volume()
        .into_ndarray::<f32>()
        .map_err(IoError::from)?;

    let shape = array.shape().to_vec();
    if shape.len() > 3 && shape[3..].iter().any(|&n| n != 1) {
        return Err(Error::Unsupported(format!(
            "{} has shape {:?}; only single 3D volumes can be displayed",
            path.display(),
            shape
        )));
    }
    let mut dimensions = [1usize; 3];
    for (axis, &n) in shape.iter().take(3).enumerate() {
        dimensions[axis] = n;
    }

    let mut spacing = [1.0f64; 3];
    for axis in 0..3 {
        let s = (pixdim[axis + 1] as f64).abs();
        if s > 0.0 && s.is_finite() {
            spacing[axis] = s;
        } else {
            log::warn!(
                "{}: pixdim[{}] = {}, using spacing 1.0",
                path.display(),
                axis + 1,
                pixdim[axis + 1]
            );
        }
    }

    // reversed axes iterate with x varying fastest
    let scalars: Vec<f32> = array.t().iter().copied().collect();
    let volume = Volume::from_x_fastest(dimensions, spacing, Point3d::origin(), scalars)?;

    let (lo, hi) = volume.scalar_range();
    log::info!(
        "Loaded {}: dimensions {:?}, spacing {:?}, scalar range [{}, {}]",
        path.display(),
        dimensions,
        spacing,
        lo,
        hi
    );
    Ok(volume)
}

/// Auto-detect format and read a volume
pub fn read_volume<P: AsRef<Path>>(path: P) -> Result<Volume> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_ascii_lowercase())
        .unwrap_or_default();

    if name.ends_with(".nii") || name.ends_with(".nii.gz") {
        read_nifti(path)
    } else {
        Err(Error::UnsupportedFormat(format!(
            "Unsupported volume format: {}",
            path.display()
        )))
    }
}

/// A file-backed volume that is populated on [`update`](VolumeReader::update)
#[derive(Debug, Clone)]
pub struct VolumeReader {
    path: PathBuf,
    volume: Option<Volume>,
}

impl VolumeReader {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            volume: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_loaded(&self) -> bool {
        self.volume.is_some()
    }

    /// Read the file, replacing any previously loaded data
    pub fn update(&mut self) -> Result<&Volume> {
        if !self.path.exists() {
            return Err(IoError::FileNotFound {
                path: self.path.display().to_string(),
            }
            .into());
        }
        let volume = read_volume(&self.path)?;
        Ok(self.volume.insert(volume))
    }
}

impl VolumeSource for VolumeReader {
    fn volume(&self) -> Option<&Volume> {
        self.volume.as_ref()
    }

    fn describe(&self) -> String {
        format!("{} (not loaded)", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_without_update_has_no_data() {
        let reader = VolumeReader::new("scan.nii");
        assert!(!reader.is_loaded());
        assert!(matches!(
            reader.require_volume(),
            Err(Error::NoVolumeData(ref d)) if d.contains("scan.nii")
        ));
    }

    #[test]
    fn test_update_on_missing_file_fails() {
        let mut reader = VolumeReader::new(std::env::temp_dir().join("atlasview_missing.nii"));
        assert!(reader.update().is_err());
        assert!(!reader.is_loaded());
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        assert!(matches!(
            read_volume("labels.nrrd"),
            Err(Error::UnsupportedFormat(_))
        ));
    }
}
