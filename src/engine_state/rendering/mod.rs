//! Rendering side of the voxel engine.
//!
//! This module turns chunk voxels into drawable geometry and decides what gets
//! drawn each frame. It stops at the boundary of a graphics API: meshes are
//! handed to a [`MeshSink`] and the output of a frame is a list of
//! [`DrawCall`]s for an external renderer to issue.

pub mod draw;
pub mod frustum;
pub mod meshing;
pub mod vertex;

// Re-export commonly used types
pub use draw::{DrawCall, MeshSink, MeshStore};
pub use frustum::Frustum;
pub use vertex::{AmbientOcclusion, PackedVertex};
