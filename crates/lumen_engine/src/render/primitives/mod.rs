//! Core primitive types for rendering
//!
//! Meshes, vertices and the camera.

pub mod camera;
pub mod mesh;

pub use camera::Camera;
pub use mesh::{Mesh, Vertex};
