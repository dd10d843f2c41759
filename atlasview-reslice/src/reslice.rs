//! Reslice pipeline
//!
//! Resamples the grayscale volume, and optionally the label volume, along a
//! [`SliceGeometry`] plane. The output grid covers the whole volume as seen in
//! the plane's frame: its pixel size follows the input spacing along each
//! reslice axis and samples falling outside the volume are zero.

use crate::slice::{SliceGeometry, SlicePlane};
use atlasview_core::{
    ColorLookupTable, Error, ImageActor, Interpolation, Point3d, Result, SliceImage, Vector3d, Volume,
    VolumeSource,
};
use ndarray::{Array2, ShapeBuilder};
use rayon::prelude::*;
use std::sync::Arc;

/// Configuration for the reslice pipeline
#[derive(Debug, Clone)]
pub struct ResliceConfig {
    /// Interpolation of the grayscale path; labels are always nearest neighbor
    pub gray_interpolation: Interpolation,
    /// Display opacity of the grayscale image
    pub gray_opacity: f64,
}

impl Default for ResliceConfig {
    fn default() -> Self {
        Self {
            gray_interpolation: Interpolation::Linear,
            gray_opacity: 0.7,
        }
    }
}

impl ResliceConfig {
    pub fn with_gray_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.gray_interpolation = interpolation;
        self
    }

    pub fn with_gray_opacity(mut self, opacity: f64) -> Self {
        self.gray_opacity = opacity;
        self
    }
}

/// Output of one reslice request
#[derive(Debug, Clone)]
pub struct ResliceResult {
    pub geometry: SliceGeometry,
    pub gray: SliceImage,
    /// Label colors, present when a label volume was supplied
    pub labels: Option<SliceImage>,
    gray_opacity: f64,
}

impl ResliceResult {
    /// Grayscale image actor, translucent so surfaces show through
    pub fn gray_actor(&self) -> ImageActor {
        ImageActor::new(self.gray.clone(), self.geometry.placement)
            .with_opacity(self.gray_opacity)
    }

    /// Label image actor with interpolation disabled to keep label edges sharp
    pub fn label_actor(&self) -> Option<ImageActor> {
        self.labels.as_ref().map(|image| {
            ImageActor::new(image.clone(), self.geometry.placement)
                .with_opacity(1.0)
                .with_interpolation(false)
        })
    }
}

/// Output sampling grid of a plane, in the plane's local frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResliceGrid {
    pub dimensions: [usize; 2],
    pub origin: [f64; 2],
    pub spacing: [f64; 2],
}

impl ResliceGrid {
    /// Grid covering the volume bounds projected onto the plane's axes
    pub fn for_volume(volume: &Volume, geometry: &SliceGeometry) -> Self {
        let axes = geometry.axes();
        let input_spacing = volume.spacing();
        let corners: Vec<Vector3d> = volume
            .bounds()
            .corners()
            .iter()
            .map(|corner| axes.transpose() * (corner - geometry.origin))
            .collect();

        let mut dimensions = [1usize; 2];
        let mut origin = [0.0f64; 2];
        let mut spacing = [1.0f64; 2];
        for k in 0..2 {
            let axis = axes.column(k);
            let s = (0..3)
                .map(|j| (axis[j] * input_spacing[j]).powi(2))
                .sum::<f64>()
                .sqrt();
            let (lo, hi) = corners
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), q| {
                    (lo.min(q[k]), hi.max(q[k]))
                });
            spacing[k] = s;
            origin[k] = lo;
            dimensions[k] = ((hi - lo) / s).round() as usize + 1;
        }

        Self {
            dimensions,
            origin,
            spacing,
        }
    }

    /// Scene position of output pixel `(i, j)` before placement
    fn position(&self, geometry: &SliceGeometry, i: usize, j: usize) -> Point3d {
        let local = Vector3d::new(
            self.origin[0] + i as f64 * self.spacing[0],
            self.origin[1] + j as f64 * self.spacing[1],
            0.0,
        );
        geometry.origin + geometry.axes() * local
    }

    /// Sample every pixel in parallel, x varying fastest
    fn sample<T, F>(&self, geometry: &SliceGeometry, f: F) -> Result<Array2<T>>
    where
        T: Send,
        F: Fn(Point3d) -> T + Sync,
    {
        let [w, h] = self.dimensions;
        let values: Vec<T> = (0..w * h)
            .into_par_iter()
            .map(|n| f(self.position(geometry, n % w, n / w)))
            .collect();
        Array2::from_shape_vec((w, h).f(), values)
            .map_err(|e| Error::Algorithm(format!("Reslice raster shape: {}", e)))
    }
}

/// Resample a volume along a plane into a grayscale image
pub fn reslice_volume(
    volume: &Volume,
    geometry: &SliceGeometry,
    interpolation: Interpolation,
) -> Result<SliceImage> {
    let grid = ResliceGrid::for_volume(volume, geometry);
    let data = grid.sample(geometry, |p| volume.sample(&p, interpolation).unwrap_or(0.0))?;
    Ok(SliceImage::gray(data, grid.origin, grid.spacing))
}

/// Resample a label volume with nearest neighbor and map it through the lookup table
pub fn reslice_labels(
    volume: &Volume,
    geometry: &SliceGeometry,
    lut: &ColorLookupTable,
) -> Result<SliceImage> {
    let grid = ResliceGrid::for_volume(volume, geometry);
    let data = grid.sample(geometry, |p| {
        let label = volume
            .sample(&p, Interpolation::NearestNeighbor)
            .unwrap_or(0.0);
        lut.map_scalar(label)
    })?;
    Ok(SliceImage::rgba(data, grid.origin, grid.spacing))
}

/// Stateless reslicer sharing one read-only lookup table
#[derive(Debug, Clone)]
pub struct ReslicePipeline {
    config: ResliceConfig,
    lut: Arc<ColorLookupTable>,
}

impl ReslicePipeline {
    pub fn new(lut: Arc<ColorLookupTable>) -> Self {
        Self::with_config(lut, ResliceConfig::default())
    }

    pub fn with_config(lut: Arc<ColorLookupTable>, config: ResliceConfig) -> Self {
        Self { config, lut }
    }

    pub fn config(&self) -> &ResliceConfig {
        &self.config
    }

    /// Reslice one plane at a signed offset.
    ///
    /// Geometry follows the grayscale volume. Fails with `NoVolumeData` when
    /// either source has not been populated.
    pub fn reslice(
        &self,
        gray: &dyn VolumeSource,
        labels: Option<&dyn VolumeSource>,
        plane: SlicePlane,
        slice: i64,
    ) -> Result<ResliceResult> {
        let volume = gray.require_volume()?;
        let label_volume = labels.map(|source| source.require_volume()).transpose()?;

        let geometry =
            SliceGeometry::compute(plane, slice, volume.dimensions(), volume.spacing());

        let gray_image = reslice_volume(volume, &geometry, self.config.gray_interpolation)?;
        let label_image = label_volume
            .map(|lv| reslice_labels(lv, &geometry, &self.lut))
            .transpose()?;

        log::debug!(
            "Resliced {} at {}: {:?} pixels{}",
            plane,
            slice,
            gray_image.dimensions(),
            if label_image.is_some() { " with labels" } else { "" }
        );

        Ok(ResliceResult {
            geometry,
            gray: gray_image,
            labels: label_image,
            gray_opacity: self.config.gray_opacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> Volume {
        // value = z
        let mut v = Volume::new([4, 6, 10], [1.0, 1.0, 2.0], Point3d::origin()).unwrap();
        for z in 0..10 {
            v.fill_box([0, 0, z], [3, 5, z], z as f32).unwrap();
        }
        v
    }

    #[test]
    fn test_axial_grid_covers_volume() {
        let volume = ramp();
        let g = SliceGeometry::compute(SlicePlane::Axial, 0, volume.dimensions(), volume.spacing());
        let grid = ResliceGrid::for_volume(&volume, &g);
        assert_eq!(grid.dimensions, [4, 6]);
        assert_eq!(grid.origin, [0.0, 0.0]);
        assert_eq!(grid.spacing, [1.0, 1.0]);
    }

    #[test]
    fn test_axial_slice_samples_its_plane() {
        let volume = ramp();
        let g = SliceGeometry::compute(SlicePlane::Axial, -2, volume.dimensions(), volume.spacing());
        // index 3 at z = 6
        let image = reslice_volume(&volume, &g, Interpolation::Linear).unwrap();
        let data = image.as_gray().unwrap();
        assert!(data.iter().all(|&v| (v - 3.0).abs() < 1e-6));
    }

    #[test]
    fn test_coronal_grid_is_x_by_z() {
        let volume = ramp();
        let g = SliceGeometry::compute(SlicePlane::Coronal, 0, volume.dimensions(), volume.spacing());
        let image = reslice_volume(&volume, &g, Interpolation::Linear).unwrap();
        assert_eq!(image.dimensions(), [4, 10]);
        assert_eq!(image.spacing, [1.0, 2.0]);
        // the x axis is mirrored so the grid starts at -3
        assert_eq!(image.origin, [-3.0, 0.0]);
        let data = image.as_gray().unwrap();
        assert_relative_eq!(data[(0, 7)], 7.0);
    }

    #[test]
    fn test_slice_outside_volume_is_zero() {
        let volume = ramp();
        let g = SliceGeometry::compute(SlicePlane::Axial, 40, volume.dimensions(), volume.spacing());
        let image = reslice_volume(&volume, &g, Interpolation::Linear).unwrap();
        assert!(image.as_gray().unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_label_background_is_transparent() {
        let mut labels = Volume::new([4, 4, 4], [1.0; 3], Point3d::origin()).unwrap();
        labels.fill_box([1, 1, 0], [2, 2, 3], 2.0).unwrap();
        let lut = ColorLookupTable::new();
        let g = SliceGeometry::compute(SlicePlane::Axial, 0, labels.dimensions(), labels.spacing());

        let image = reslice_labels(&labels, &g, &lut).unwrap();
        let data = image.as_rgba().unwrap();
        assert_eq!(data[(0, 0)], [0, 0, 0, 0]);
        assert_eq!(data[(1, 2)], lut.map_scalar(2.0));
        assert!(data[(1, 2)][3] > 0);
    }
}
