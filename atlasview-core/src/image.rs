//! 2D raster images produced by reslicing

use ndarray::Array2;

/// Pixel payload of a [`SliceImage`]
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    /// Single-channel scalar samples
    Gray(Array2<f32>),
    /// 8-bit RGBA colors, alpha included
    Rgba(Array2<[u8; 4]>),
}

/// A 2D image in the plane's local frame, indexed `[column, row]`
#[derive(Debug, Clone, PartialEq)]
pub struct SliceImage {
    pub raster: Raster,
    /// Position of pixel `[0, 0]` in plane-local coordinates
    pub origin: [f64; 2],
    /// Pixel size along the plane's x and y axes
    pub spacing: [f64; 2],
}

impl SliceImage {
    pub fn gray(data: Array2<f32>, origin: [f64; 2], spacing: [f64; 2]) -> Self {
        Self {
            raster: Raster::Gray(data),
            origin,
            spacing,
        }
    }

    pub fn rgba(data: Array2<[u8; 4]>, origin: [f64; 2], spacing: [f64; 2]) -> Self {
        Self {
            raster: Raster::Rgba(data),
            origin,
            spacing,
        }
    }

    /// Pixel counts `[columns, rows]`
    pub fn dimensions(&self) -> [usize; 2] {
        let shape = match &self.raster {
            Raster::Gray(data) => data.shape(),
            Raster::Rgba(data) => data.shape(),
        };
        [shape[0], shape[1]]
    }

    pub fn pixel_count(&self) -> usize {
        let [w, h] = self.dimensions();
        w * h
    }

    pub fn is_rgba(&self) -> bool {
        matches!(self.raster, Raster::Rgba(_))
    }

    /// Grayscale samples, if this is a grayscale image
    pub fn as_gray(&self) -> Option<&Array2<f32>> {
        match &self.raster {
            Raster::Gray(data) => Some(data),
            Raster::Rgba(_) => None,
        }
    }

    /// RGBA pixels, if this is a color image
    pub fn as_rgba(&self) -> Option<&Array2<[u8; 4]>> {
        match &self.raster {
            Raster::Rgba(data) => Some(data),
            Raster::Gray(_) => None,
        }
    }

    /// Plane-local extent `[xmin, xmax, ymin, ymax]`
    pub fn extent(&self) -> [f64; 4] {
        let [w, h] = self.dimensions();
        [
            self.origin[0],
            self.origin[0] + w.saturating_sub(1) as f64 * self.spacing[0],
            self.origin[1],
            self.origin[1] + h.saturating_sub(1) as f64 * self.spacing[1],
        ]
    }
}
