//! Slice planes and volume reslicing for atlasview
//!
//! This crate provides the orientation correction table, the slice transform
//! engine that maps a plane and slice offset to a reslice plane and a placement
//! transform, and the pipeline that resamples grayscale and label volumes.

pub mod orientation;
pub mod reslice;
pub mod slice;

pub use orientation::OrientationCode;
pub use reslice::{
    reslice_labels, reslice_volume, ResliceConfig, ResliceGrid, ReslicePipeline, ResliceResult,
};
pub use slice::{SliceGeometry, SlicePlane};
