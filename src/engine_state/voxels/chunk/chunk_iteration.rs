//! # Chunk Iteration Module
//!
//! This module provides an iterator for traversing all non-air blocks in a
//! chunk in storage order, yielding each block with its local position.

use cgmath::Point3;

use crate::engine_state::voxels::block::BlockTypeSize;

use super::Chunk;

/// An iterator over all non-air blocks in a chunk.
///
/// Skips air cells and yields `(local_position, block_byte)` pairs in the
/// same `x`, then `y`, then `z` order the voxel array is stored in.
pub struct ChunkBlockIterator<'a> {
    /// Reference to the chunk being iterated over
    chunk_ref: &'a Chunk,
    /// Next index in the voxel array to inspect
    current_offset: usize,
}

impl<'a> ChunkBlockIterator<'a> {
    /// Creates a new `ChunkBlockIterator` for the given chunk.
    ///
    /// # Arguments
    /// * `chunk_ref` - A reference to the chunk to iterate over
    pub fn new(chunk_ref: &'a Chunk) -> Self {
        ChunkBlockIterator {
            chunk_ref,
            current_offset: 0,
        }
    }
}

impl Iterator for ChunkBlockIterator<'_> {
    type Item = (Point3<usize>, BlockTypeSize);

    fn next(&mut self) -> Option<Self::Item> {
        let voxels = self.chunk_ref.voxels();
        while self.current_offset < voxels.len() {
            let index = self.current_offset;
            self.current_offset += 1;

            let block = voxels[index];
            if block != 0 {
                return Some((Chunk::local_of(index), block));
            }
        }
        None
    }
}
