//! # AtlasView Reconstruction
//!
//! Surface reconstruction from label volumes.
//!
//! This crate extracts isosurfaces with marching cubes, relaxes them with
//! Laplacian smoothing, generates vertex normals, and collapses near-duplicate
//! surfaces through geometric signatures. [`SegmentationReconstructor`] ties
//! these together into one surface per distinct label.

pub mod marching_cubes;
pub mod normals;
pub mod parallel;
pub mod segmentation;
pub mod signature;
pub mod smoothing;

// Re-export commonly used items
pub use marching_cubes::*;
pub use normals::*;
pub use segmentation::*;
pub use signature::*;
pub use smoothing::*;
