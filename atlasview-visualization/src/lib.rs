//! Scene and viewer state for the atlas viewer
//!
//! This crate holds everything between the algorithms and a window:
//! - An in-memory scene implementing the `Renderer` collaborator
//! - A camera whose clipping range follows the visible actors
//! - Atlas JSON configuration and tissue file resolution
//! - Viewer state: slice planes, display modes, key handling and opacity controls

pub mod camera;
pub mod config;
pub mod renderer;
pub mod viewer;

pub use camera::*;
pub use config::*;
pub use renderer::*;
pub use viewer::*;
