//! # Block Type Module
//!
//! This module defines the different types of blocks in the voxel world.
//! It provides functionality for block type identification, conversion, and random selection.

use num_derive::FromPrimitive;

use super::BlockTypeSize;

/// Enumerates all possible block types in the voxel world.
///
/// The discriminant is the byte stored in a chunk's voxel array, so the order
/// here is part of the storage format. The `FromPrimitive` derive allows
/// conversion back from the stored byte.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// Empty space. Never rendered and never hides a neighbouring face.
    AIR = 0,

    /// The surface block: green on top, grass-on-dirt on the sides, dirt below.
    GRASS = 1,

    /// The bulk terrain block produced by the fill pass.
    DIRT = 2,

    /// Plain stone.
    STONE = 3,

    /// Glass. Treated as an ordinary solid block by the mesher.
    GLASS = 4,
}

/// Number of non-air block types.
pub const TOTAL_NUM_BLOCK_TYPES: usize = 4;

impl BlockType {
    /// Converts a stored byte to a `BlockType`.
    ///
    /// # Panics
    /// Panics if the byte doesn't correspond to a known block type. Voxel bytes
    /// only ever come from `BlockType` values, so an unknown byte is a bug.
    pub fn get_block_type_from_int(btype: BlockTypeSize) -> Self {
        match Self::try_from_int(btype) {
            Some(block_type) => block_type,
            None => panic!("unknown block type byte {btype}"),
        }
    }

    /// Converts a stored byte to a `BlockType`, returning `None` for unknown bytes.
    pub fn try_from_int(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// Returns the byte stored in a chunk for this block type.
    pub fn as_int(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Whether this block occupies its cell (everything except air).
    pub fn is_solid(self) -> bool {
        self != BlockType::AIR
    }

    /// Picks a random non-air block type.
    ///
    /// Used by the demo session when it places blocks.
    pub fn get_random_type(rng: &mut fastrand::Rng) -> Self {
        Self::get_block_type_from_int(rng.u8(1..=TOTAL_NUM_BLOCK_TYPES as u8))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_bytes_round_trip() {
        for byte in 0..=TOTAL_NUM_BLOCK_TYPES as u8 {
            assert_eq!(BlockType::get_block_type_from_int(byte).as_int(), byte);
        }
        assert_eq!(BlockType::try_from_int(TOTAL_NUM_BLOCK_TYPES as u8 + 1), None);
    }

    #[test]
    fn random_type_is_never_air() {
        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            assert!(BlockType::get_random_type(&mut rng).is_solid());
        }
    }

    #[test]
    #[should_panic(expected = "unknown block type")]
    fn unknown_byte_panics() {
        BlockType::get_block_type_from_int(200);
    }
}
