//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the direction each
//! one points in. The face order doubles as the column order of the atlas
//! lookup table and the face-template tables used by the mesher.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The order is: [NORTH, SOUTH, EAST, WEST, TOP, BOTTOM]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The north face (facing positive Z)
    NORTH = 0,

    /// The south face (facing negative Z)
    SOUTH = 1,

    /// The east face (facing positive X)
    EAST = 2,

    /// The west face (facing negative X)
    WEST = 3,

    /// The top face (facing positive Y)
    TOP = 4,

    /// The bottom face (facing negative Y)
    BOTTOM = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in atlas order.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::NORTH,
            BlockSide::SOUTH,
            BlockSide::EAST,
            BlockSide::WEST,
            BlockSide::TOP,
            BlockSide::BOTTOM,
        ]
    }

    /// Unit offset from a voxel to the neighbour this face looks at.
    pub fn normal(self) -> Vector3<i32> {
        match self {
            BlockSide::NORTH => Vector3::new(0, 0, 1),
            BlockSide::SOUTH => Vector3::new(0, 0, -1),
            BlockSide::EAST => Vector3::new(1, 0, 0),
            BlockSide::WEST => Vector3::new(-1, 0, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
        }
    }

    /// Index of the facing neighbour inside a 3x3x3 sample centred on the voxel.
    pub fn neighborhood_index(self) -> [usize; 3] {
        let n = self.normal();
        [(n.x + 1) as usize, (n.y + 1) as usize, (n.z + 1) as usize]
    }
}
