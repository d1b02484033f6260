//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x16x16 dense block of voxel
//! bytes together with the bookkeeping the chunk pipeline needs to move it
//! from generation to a drawable mesh.
//!
//! ## Storage
//!
//! Voxels are stored one byte per cell in a flat array indexed
//! `x + y * 16 + z * 256`. A byte of `0` is air.
//!
//! ## Readiness counters
//!
//! Three atomic counters gate a chunk's progress through the pipeline:
//! - `neighbor_count`: neighbours this chunk has linked with
//! - `filled_neighbor_count`: linked neighbours that finished filling
//! - `populated_neighbor_count`: linked neighbours that finished population
//!
//! A chunk links with every neighbour present when it is filled. A neighbour
//! that is filled later, or that was already filled when it was loaded next
//! to this one, links itself in. Each link is recorded once per direction, so
//! chunks loaded in separate batches still count each other exactly once.
//!
//! The counters are bumped from whichever stage worker finishes a neighbour,
//! so they only need a shared (read) lock on the chunk.
//!
//! ## Mesh
//!
//! The mesh buffer is replaced wholesale on every build. `draw_count` only
//! changes when a new buffer is swapped in, never while one is being built.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use cgmath::{Point3, Vector3};
use num_derive::FromPrimitive;

use super::block::BlockTypeSize;
use crate::engine_state::rendering::vertex::PackedVertex;
use chunk_iteration::ChunkBlockIterator;
use coords::ChunkId;

pub mod chunk_iteration;
pub mod coords;

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;
/// The dimension of a chunk including an extra layer of blocks on each side for neighbor lookups.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The number of blocks in a wrapped 2D chunk plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of blocks in a wrapped chunk.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_DIMENSION_WRAPPED;

/// How far a chunk has come through terrain generation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, FromPrimitive)]
#[repr(u8)]
pub enum ChunkStage {
    /// Loaded but not yet filled
    Added = 0,
    Filled = 1,
    Populated = 2,
}

/// Bit recording a link with the neighbour at `offset`.
fn neighbor_bit(offset: Vector3<i32>) -> u32 {
    debug_assert!(offset.x.abs() <= 1 && offset.y.abs() <= 1 && offset.z.abs() <= 1);
    1 << ((offset.x + 1) + 3 * (offset.y + 1) + 9 * (offset.z + 1))
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: Point3<i32>,

    /// Dense block bytes, `CHUNK_SIZE` long while the chunk is live.
    voxels: Vec<BlockTypeSize>,

    /// Neighbours this chunk has linked with.
    pub neighbor_count: AtomicU32,

    /// Linked neighbours that finished filling.
    pub filled_neighbor_count: AtomicU32,

    /// Linked neighbours that finished population.
    pub populated_neighbor_count: AtomicU32,

    /// One bit per neighbour offset that has been counted in `neighbor_count`.
    linked_neighbors: AtomicU32,

    stage: AtomicU8,

    mesh: Vec<PackedVertex>,
    draw_count: usize,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    ///
    /// # Arguments
    /// * `position` - The chunk coordinates of the new chunk
    pub fn empty(position: Point3<i32>) -> Self {
        Self {
            position,
            voxels: vec![0; CHUNK_SIZE as usize],
            neighbor_count: AtomicU32::new(0),
            filled_neighbor_count: AtomicU32::new(0),
            populated_neighbor_count: AtomicU32::new(0),
            linked_neighbors: AtomicU32::new(0),
            stage: AtomicU8::new(ChunkStage::Added as u8),
            mesh: Vec::new(),
            draw_count: 0,
        }
    }

    /// The identity this chunk is stored under in the world index.
    pub fn id(&self) -> ChunkId {
        ChunkId::from_coords(self.position)
    }

    /// Flat array index of a local coordinate.
    ///
    /// # Panics
    /// Panics if any axis is outside `0..CHUNK_DIMENSION`.
    pub fn index_of(local: Point3<usize>) -> usize {
        let dim = CHUNK_DIMENSION as usize;
        assert!(
            local.x < dim && local.y < dim && local.z < dim,
            "local voxel coordinate {local:?} outside the chunk"
        );
        local.x + local.y * dim + local.z * dim * dim
    }

    /// Inverse of [`Chunk::index_of`].
    pub fn local_of(index: usize) -> Point3<usize> {
        let dim = CHUNK_DIMENSION as usize;
        Point3::new(index % dim, (index / dim) % dim, index / (dim * dim))
    }

    /// Gets the block byte at the specified chunk-relative coordinates.
    ///
    /// A released chunk reads as air everywhere.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_voxel(&self, local: Point3<usize>) -> BlockTypeSize {
        let index = Self::index_of(local);
        self.voxels.get(index).copied().unwrap_or(0)
    }

    /// Overwrites the block byte at the specified chunk-relative coordinates.
    ///
    /// Writes to a released chunk are dropped.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn set_voxel(&mut self, local: Point3<usize>, block: BlockTypeSize) {
        let index = Self::index_of(local);
        if let Some(voxel) = self.voxels.get_mut(index) {
            *voxel = block;
        }
    }

    /// All block bytes in storage order. Empty once the chunk is released.
    pub fn voxels(&self) -> &[BlockTypeSize] {
        &self.voxels
    }

    /// Mutable access to all block bytes, used by the terrain passes.
    pub fn voxels_mut(&mut self) -> &mut [BlockTypeSize] {
        &mut self.voxels
    }

    /// Iterates the non-air blocks of this chunk with their local positions.
    pub fn solid_blocks(&self) -> ChunkBlockIterator<'_> {
        ChunkBlockIterator::new(self)
    }

    /// Number of non-air cells.
    pub fn solid_count(&self) -> usize {
        self.voxels.iter().filter(|&&b| b != 0).count()
    }

    /// Drops the voxel storage. Called when the chunk leaves the world index.
    ///
    /// Other handles to the chunk stay valid: reads return air, writes are
    /// dropped, and the pipeline stages skip it.
    pub fn release(&mut self) {
        self.voxels = Vec::new();
        self.mesh = Vec::new();
        self.draw_count = 0;
    }

    /// Whether `release` has been called.
    pub fn is_released(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn stage(&self) -> ChunkStage {
        num::FromPrimitive::from_u8(self.stage.load(Ordering::Acquire)).unwrap_or(ChunkStage::Added)
    }

    pub fn set_stage(&self, stage: ChunkStage) {
        self.stage.store(stage as u8, Ordering::Release);
    }

    /// Links this chunk with the neighbour at `offset`, counting it in
    /// `neighbor_count` unless it was already linked.
    ///
    /// # Returns
    /// `true` if the link is new
    pub fn link_neighbor(&self, offset: Vector3<i32>) -> bool {
        let bit = neighbor_bit(offset);
        let previous = self.linked_neighbors.fetch_or(bit, Ordering::AcqRel);
        if previous & bit != 0 {
            return false;
        }
        self.neighbor_count.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Whether the neighbour at `offset` is counted in `neighbor_count`.
    pub fn is_linked_to(&self, offset: Vector3<i32>) -> bool {
        self.linked_neighbors.load(Ordering::Acquire) & neighbor_bit(offset) != 0
    }

    /// Records that a neighbour of this chunk finished filling.
    pub fn add_filled_neighbor(&self) {
        self.filled_neighbor_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Records that a neighbour of this chunk finished population.
    pub fn add_populated_neighbor(&self) {
        self.populated_neighbor_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Every neighbour registered at fill time has itself been filled.
    pub fn neighbors_filled(&self) -> bool {
        self.filled_neighbor_count.load(Ordering::Acquire)
            == self.neighbor_count.load(Ordering::Acquire)
    }

    /// Every neighbour registered at fill time has been populated.
    pub fn neighbors_populated(&self) -> bool {
        self.populated_neighbor_count.load(Ordering::Acquire)
            == self.neighbor_count.load(Ordering::Acquire)
    }

    /// The most recently built vertex buffer.
    pub fn mesh(&self) -> &[PackedVertex] {
        &self.mesh
    }

    /// Number of vertices in the live mesh.
    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Swaps in a freshly built buffer. The count is updated last.
    pub fn replace_mesh(&mut self, mesh: Vec<PackedVertex>) {
        let count = mesh.len();
        self.mesh = mesh;
        self.draw_count = count;
    }
}
