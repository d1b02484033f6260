//! # Voxel World
//!
//! This module contains the voxel data side of the engine: what a block is,
//! how chunks store them, how world coordinates map onto chunks, the world
//! index that owns every chunk, and the terrain passes that fill them.
//!
//! ## Architecture
//!
//! * **Block**: block types, faces and the atlas lookup table
//! * **Chunk**: 16³ dense voxel storage plus pipeline readiness counters and
//!   the chunk's mesh buffer; `chunk::coords` holds the addressing math and `ChunkId`
//! * **World**: the shared `ChunkId -> chunk` index with global voxel access and raycasting
//! * **Generation**: noise fill and surface population
//!
//! ## Thread Safety
//!
//! * The world index is behind a reader-writer lock
//! * Each chunk is an `MtResource`, so stages read neighbours concurrently
//! * Readiness counters are atomics and only need a shared lock on the chunk

pub mod block;
pub mod chunk;
pub mod generation;
pub mod world;
