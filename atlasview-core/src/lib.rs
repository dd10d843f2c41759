//! Core data structures and traits for atlasview
//!
//! This crate provides the shared types of the viewer: points and bounds,
//! triangle meshes, homogeneous transforms, scalar volumes, resliced images,
//! the label color table, renderable actors and the collaborator traits.

pub mod actor;
pub mod error;
pub mod image;
pub mod lut;
pub mod mesh;
pub mod point;
pub mod traits;
pub mod transform;
pub mod volume;

pub use actor::*;
pub use error::*;
pub use image::*;
pub use lut::*;
pub use mesh::*;
pub use point::*;
pub use traits::*;
pub use transform::*;
pub use volume::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Isometry3, Matrix3, Matrix4, Point3, Vector3};

// Type aliases for easier imports
pub type Mesh = TriangleMesh;
