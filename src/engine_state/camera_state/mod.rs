//! # Camera State
//!
//! The camera is an input to the chunk pipeline's draw pass: its view matrix
//! moves chunk bounds into camera space for frustum culling, and its forward
//! vector drives block-targeting raycasts.

pub mod camera;

pub use camera::Camera;
