//! # Block Module
//!
//! This module provides the core block-related functionality for the voxel engine.
//! It includes block type definitions, block face handling, and the atlas lookup table.

use block_side::BlockSide;
use block_type::{BlockType, TOTAL_NUM_BLOCK_TYPES};

pub mod block_side;
pub mod block_type;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// Maps each block type to the atlas cell used by each of its faces.
///
/// The outer array is indexed by `BlockType` as a `usize`.
/// The inner array holds one atlas index per face in the order:
/// [North, South, East, West, Top, Bottom]
pub static BLOCK_TYPE_TO_TEXTURE_INDICES: [[u8; 6]; TOTAL_NUM_BLOCK_TYPES + 1] = [
    [0, 0, 0, 0, 0, 0], // AIR (never rendered)
    [1, 1, 1, 1, 2, 3], // GRASS (sides: 1, top: 2, bottom: dirt)
    [3, 3, 3, 3, 3, 3], // DIRT
    [4, 4, 4, 4, 4, 4], // STONE
    [6, 6, 6, 6, 6, 6], // GLASS
];

/// Gets the atlas cell for one face of a block given its stored byte.
///
/// # Panics
/// Panics if `btype_int` is not a known block type.
pub fn get_texture_index(btype_int: BlockTypeSize, side: BlockSide) -> u8 {
    let block_type = BlockType::get_block_type_from_int(btype_int);
    BLOCK_TYPE_TO_TEXTURE_INDICES[block_type as usize][side as usize]
}
