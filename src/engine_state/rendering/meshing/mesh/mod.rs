//! Per-voxel face meshing.
//!
//! Every solid voxel emits each face whose neighbour across it is air, six
//! vertices per face, with ambient occlusion baked into every vertex. Faces
//! are never merged.

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::vertex::PackedVertex;
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION, CHUNK_SIZE};

use super::neighborhood::PaddedChunk;

pub mod face;

pub use face::{corner_weight, face_ambient_occlusion, VERTICES_PER_FACE};

/// Upper bound on vertices in one chunk mesh.
pub const MAX_CHUNK_VERTICES: usize = CHUNK_SIZE as usize * 6 * VERTICES_PER_FACE;

/// Builds the full vertex list of a padded chunk snapshot.
///
/// Voxels are visited in storage order and faces in `BlockSide` order, so
/// the output is deterministic for a given snapshot.
pub fn build_mesh(padded: &PaddedChunk) -> Vec<PackedVertex> {
    let mut vertices = Vec::new();
    let dim = CHUNK_DIMENSION as usize;

    for z in 0..dim {
        for y in 0..dim {
            for x in 0..dim {
                let local = Point3::new(x, y, z);
                let block = padded.get(local + Vector3::new(1, 1, 1));
                if block == 0 {
                    continue;
                }

                let n = padded.neighborhood(local);
                for side in BlockSide::all() {
                    let [i, j, k] = side.neighborhood_index();
                    if n[i][j][k] != 0 {
                        continue;
                    }
                    face::push_face(
                        &mut vertices,
                        side,
                        block,
                        [x as i32, y as i32, z as i32],
                        &n,
                    );
                }
            }
        }
    }

    vertices
}

/// Counts visible faces of a lone chunk by direct neighbour checks, treating
/// everything outside the chunk as air.
pub fn count_exposed_faces(chunk: &Chunk) -> usize {
    let dim = CHUNK_DIMENSION;
    let solid = |x: i32, y: i32, z: i32| {
        (0..dim).contains(&x)
            && (0..dim).contains(&y)
            && (0..dim).contains(&z)
            && chunk.get_voxel(Point3::new(x as usize, y as usize, z as usize)) != 0
    };

    chunk
        .solid_blocks()
        .map(|(local, _)| {
            let p = Point3::new(local.x as i32, local.y as i32, local.z as i32);
            BlockSide::all()
                .into_iter()
                .filter(|side| {
                    let n = side.normal();
                    !solid(p.x + n.x, p.y + n.y, p.z + n.z)
                })
                .count()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::vertex::AmbientOcclusion;

    fn lone(cells: &[[usize; 3]]) -> PaddedChunk {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        for c in cells {
            chunk.set_voxel(Point3::new(c[0], c[1], c[2]), 2);
        }
        PaddedChunk::from_chunk(&chunk)
    }

    #[test]
    fn isolated_voxel_emits_every_face() {
        let mesh = build_mesh(&lone(&[[7, 7, 7]]));
        assert_eq!(mesh.len(), 6 * VERTICES_PER_FACE);
        assert!(mesh
            .iter()
            .all(|v| v.ambient_occlusion() == AmbientOcclusion::OPEN));
    }

    #[test]
    fn shared_face_is_hidden_on_both_sides() {
        let mesh = build_mesh(&lone(&[[7, 7, 7], [8, 7, 7]]));
        assert_eq!(mesh.len(), (12 - 2) * VERTICES_PER_FACE);
    }

    #[test]
    fn voxel_at_chunk_edge_is_hidden_by_padded_neighbour() {
        let mut padded = lone(&[[0, 4, 4]]);
        assert_eq!(build_mesh(&padded).len(), 36);
        // solid cell west of local (0, 4, 4) in the neighbouring chunk
        padded.set(Point3::new(0, 5, 5), 3);
        assert_eq!(build_mesh(&padded).len(), 30);
    }

    #[test]
    fn neighbours_darken_touching_corners() {
        // a floor cell with another cell resting diagonally above its east edge
        let mesh = build_mesh(&lone(&[[4, 4, 4], [5, 5, 4]]));
        let floor_top = &mesh[4 * VERTICES_PER_FACE..5 * VERTICES_PER_FACE];
        let expected = AmbientOcclusion {
            v00: 3,
            v01: 2,
            v10: 3,
            v11: 2,
        };
        assert!(floor_top.iter().all(|v| v.ambient_occlusion() == expected));
        assert!(floor_top.iter().all(|v| v.voxel_position()[1] == 5));
    }

    #[test]
    fn brute_force_face_count_matches_the_mesh() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        let mut rng = fastrand::Rng::with_seed(11);
        for index in 0..CHUNK_SIZE as usize {
            if rng.f32() < 0.3 {
                chunk.voxels_mut()[index] = 2;
            }
        }
        let mesh = build_mesh(&PaddedChunk::from_chunk(&chunk));
        assert_eq!(mesh.len(), count_exposed_faces(&chunk) * VERTICES_PER_FACE);
        assert!(mesh.len() <= MAX_CHUNK_VERTICES);
    }
}
