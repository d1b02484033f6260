//! Padded voxel snapshots used by the mesh builder.
//!
//! Meshing a chunk needs every voxel's 3x3x3 neighbourhood, which spills one
//! voxel into each of the 26 surrounding chunks. Rather than locking a
//! neighbour per lookup, the builder copies the chunk plus a one-voxel shell
//! into an 18x18x18 array up front, taking one chunk lock at a time.

use cgmath::Point3;

use crate::core::MtResource;
use crate::engine_state::voxels::block::BlockTypeSize;
use crate::engine_state::voxels::chunk::coords::neighbor_offsets;
use crate::engine_state::voxels::chunk::{
    Chunk, CHUNK_DIMENSION, CHUNK_DIMENSION_WRAPPED, CHUNK_PLANE_SIZE_WRAPPED, CHUNK_SIZE_WRAPPED,
};
use crate::engine_state::voxels::world::World;

/// A voxel's 3x3x3 surroundings, indexed `[x][y][z]` with the voxel at `[1][1][1]`.
pub type Neighborhood = [[[BlockTypeSize; 3]; 3]; 3];

/// A chunk's voxels with a one-voxel border copied from its neighbours.
///
/// Padded coordinates run `0..18` per axis; local `(x, y, z)` sits at
/// padded `(x + 1, y + 1, z + 1)`. Border cells of absent neighbours are air.
pub struct PaddedChunk {
    pub position: Point3<i32>,
    voxels: Vec<BlockTypeSize>,
}

impl PaddedChunk {
    /// Snapshot of a lone chunk with an all-air border. A released chunk
    /// snapshots as all air.
    pub fn from_chunk(chunk: &Chunk) -> Self {
        let mut padded = Self {
            position: chunk.position,
            voxels: vec![0; CHUNK_SIZE_WRAPPED],
        };
        if chunk.is_released() {
            return padded;
        }

        let dim = CHUNK_DIMENSION as usize;
        for z in 0..dim {
            for y in 0..dim {
                let row = Chunk::index_of(Point3::new(0, y, z));
                let start = Self::index_of(Point3::new(1, y + 1, z + 1));
                padded.voxels[start..start + dim].copy_from_slice(&chunk.voxels()[row..row + dim]);
            }
        }
        padded
    }

    /// Snapshot of `chunk` with its border filled in from whichever
    /// neighbours are in `world`.
    ///
    /// At most one chunk lock is held at any moment.
    pub fn capture(world: &World, chunk: &MtResource<Chunk>) -> Self {
        let mut padded = Self::from_chunk(&chunk.get());

        for offset in neighbor_offsets() {
            let Some(neighbor) = world.chunk_at(padded.position + offset) else {
                continue;
            };
            let neighbor = neighbor.get();

            let [xs, ys, zs] = [offset.x, offset.y, offset.z].map(shell_span);
            for (pz, lz) in zs.clone() {
                for (py, ly) in ys.clone() {
                    for (px, lx) in xs.clone() {
                        let block = neighbor.get_voxel(Point3::new(lx, ly, lz));
                        padded.voxels[Self::index_of(Point3::new(px, py, pz))] = block;
                    }
                }
            }
        }

        padded
    }

    fn index_of(padded: Point3<usize>) -> usize {
        padded.x + padded.y * CHUNK_DIMENSION_WRAPPED + padded.z * CHUNK_PLANE_SIZE_WRAPPED
    }

    /// Block at padded coordinates.
    pub fn get(&self, padded: Point3<usize>) -> BlockTypeSize {
        self.voxels[Self::index_of(padded)]
    }

    /// Overwrites a padded cell. Used to stage neighbour data in tests.
    pub fn set(&mut self, padded: Point3<usize>, block: BlockTypeSize) {
        let index = Self::index_of(padded);
        self.voxels[index] = block;
    }

    /// The 3x3x3 block around a local voxel of the chunk.
    pub fn neighborhood(&self, local: Point3<usize>) -> Neighborhood {
        let mut n = [[[0; 3]; 3]; 3];
        for (i, plane) in n.iter_mut().enumerate() {
            for (j, row) in plane.iter_mut().enumerate() {
                for (k, cell) in row.iter_mut().enumerate() {
                    *cell = self.get(Point3::new(local.x + i, local.y + j, local.z + k));
                }
            }
        }
        n
    }
}

/// For one axis of a neighbour offset, the `(padded, neighbour-local)` index
/// pairs that the neighbour contributes.
fn shell_span(offset: i32) -> std::iter::Zip<std::ops::Range<usize>, std::ops::Range<usize>> {
    let dim = CHUNK_DIMENSION as usize;
    match offset {
        -1 => (0..1).zip(dim - 1..dim),
        0 => (1..dim + 1).zip(0..dim),
        _ => (dim + 1..dim + 2).zip(0..1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_chunk_has_an_air_border() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_voxel(Point3::new(0, 0, 0), 2);
        let padded = PaddedChunk::from_chunk(&chunk);

        assert_eq!(padded.get(Point3::new(1, 1, 1)), 2);
        assert_eq!(padded.get(Point3::new(0, 1, 1)), 0);

        let n = padded.neighborhood(Point3::new(0, 0, 0));
        assert_eq!(n[1][1][1], 2);
        assert_eq!(n[0][0][0], 0);
    }

    #[test]
    fn capture_copies_the_touching_shell_of_each_neighbour() {
        let world = World::new();
        let chunk = world.add(Point3::new(0, 0, 0));
        world.set_voxel_global(Point3::new(-1, 3, 4), 3); // west face neighbour
        world.set_voxel_global(Point3::new(16, 16, 16), 4); // far corner neighbour
        world.set_voxel_global(Point3::new(-2, 3, 4), 2); // too far in to matter

        let padded = PaddedChunk::capture(&world, &chunk);
        assert_eq!(padded.get(Point3::new(0, 4, 5)), 3);
        assert_eq!(padded.get(Point3::new(17, 17, 17)), 4);
        assert_eq!(padded.voxels.iter().filter(|&&b| b != 0).count(), 2);

        let n = padded.neighborhood(Point3::new(0, 3, 4));
        assert_eq!(n[0][1][1], 3);
    }
}
