//! Mesh generation for voxel chunks.
//!
//! This module turns a chunk's voxels into the packed vertex buffer the
//! renderer draws. The key steps are:
//! 1. Snapshot the chunk and a one-voxel shell of its neighbours (`neighborhood`)
//! 2. Emit every exposed face of every solid voxel with baked ambient occlusion (`mesh`)
//! 3. Swap the finished buffer into the chunk in one step
//!
//! # Architecture
//! - `neighborhood`: `PaddedChunk`, the 18³ snapshot and per-voxel 3x3x3 sampling
//! - `mesh/`: face templates, occlusion weights and the per-voxel builder
//!
//! # Concurrency
//! Building happens entirely on the snapshot, so no chunk lock is held while
//! vertices are generated. The chunk is write-locked only for the final swap,
//! which is also when its draw count changes.

use log::trace;

use crate::core::MtResource;
use crate::engine_state::voxels::chunk::Chunk;
use crate::engine_state::voxels::world::World;

pub mod mesh;
pub mod neighborhood;

pub use mesh::{build_mesh, count_exposed_faces, MAX_CHUNK_VERTICES, VERTICES_PER_FACE};
pub use neighborhood::{Neighborhood, PaddedChunk};

/// Rebuilds the mesh of `chunk` against its current neighbours.
///
/// Absent neighbours count as air.
///
/// # Returns
/// The number of vertices in the new mesh.
pub fn build_chunk_mesh(world: &World, chunk: &MtResource<Chunk>) -> usize {
    let padded = PaddedChunk::capture(world, chunk);
    let vertices = build_mesh(&padded);
    let count = vertices.len();

    chunk.get_mut().replace_mesh(vertices);
    trace!("meshed chunk {:?}: {count} vertices", padded.position);
    count
}
