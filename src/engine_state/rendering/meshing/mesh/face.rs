use crate::engine_state::rendering::vertex::{AmbientOcclusion, PackedVertex};
use crate::engine_state::voxels::block::block_side::BlockSide;
use crate::engine_state::voxels::block::{get_texture_index, BlockTypeSize};

use super::super::neighborhood::Neighborhood;

/// Vertices emitted per visible face: two triangles, no index buffer.
pub const VERTICES_PER_FACE: usize = 6;

/// Corner offsets of the six vertices of each face, in `BlockSide` order.
///
/// Each face is two triangles wound counter-clockwise when seen from outside.
pub const FACE_VERTEX_DATA: [[[i32; 3]; VERTICES_PER_FACE]; 6] = [
    // north (+z)
    [[0, 1, 1], [0, 0, 1], [1, 1, 1], [0, 0, 1], [1, 0, 1], [1, 1, 1]],
    // south (-z)
    [[1, 1, 0], [1, 0, 0], [0, 1, 0], [1, 0, 0], [0, 0, 0], [0, 1, 0]],
    // east (+x)
    [[1, 1, 1], [1, 0, 1], [1, 1, 0], [1, 0, 1], [1, 0, 0], [1, 1, 0]],
    // west (-x)
    [[0, 1, 0], [0, 0, 0], [0, 1, 1], [0, 0, 0], [0, 0, 1], [0, 1, 1]],
    // top (+y)
    [[0, 1, 0], [0, 1, 1], [1, 1, 0], [0, 1, 1], [1, 1, 1], [1, 1, 0]],
    // bottom (-y)
    [[0, 0, 1], [0, 0, 0], [1, 0, 1], [0, 0, 0], [1, 0, 0], [1, 0, 1]],
];

/// Atlas-cell UV of each face vertex. Shared by every face.
pub const UV_DATA: [[u8; 2]; VERTICES_PER_FACE] =
    [[0, 0xf], [0, 0], [0xf, 0xf], [0, 0], [0xf, 0], [0xf, 0xf]];

/// The eight cells around a face in its own frame, read from a voxel's neighbourhood.
struct FaceRing {
    top: bool,
    left: bool,
    bottom: bool,
    right: bool,
    top_left: bool,
    top_right: bool,
    bottom_left: bool,
    bottom_right: bool,
}

impl FaceRing {
    fn of(side: BlockSide, n: &Neighborhood) -> Self {
        let s = |x: usize, y: usize, z: usize| n[x][y][z] != 0;
        match side {
            BlockSide::NORTH => Self {
                top: s(1, 2, 2),
                left: s(0, 1, 2),
                bottom: s(1, 0, 2),
                right: s(2, 1, 2),
                top_left: s(0, 2, 2),
                top_right: s(2, 2, 2),
                bottom_left: s(0, 0, 2),
                bottom_right: s(2, 0, 2),
            },
            BlockSide::SOUTH => Self {
                top: s(1, 2, 0),
                left: s(2, 1, 0),
                bottom: s(1, 0, 0),
                right: s(0, 1, 0),
                top_left: s(2, 2, 0),
                top_right: s(0, 2, 0),
                bottom_left: s(2, 0, 0),
                bottom_right: s(0, 0, 0),
            },
            BlockSide::EAST => Self {
                top: s(2, 2, 1),
                left: s(2, 1, 2),
                bottom: s(2, 0, 1),
                right: s(2, 1, 0),
                top_left: s(2, 2, 2),
                top_right: s(2, 2, 0),
                bottom_left: s(2, 0, 2),
                bottom_right: s(2, 0, 0),
            },
            BlockSide::WEST => Self {
                top: s(0, 2, 1),
                left: s(0, 1, 0),
                bottom: s(0, 0, 1),
                right: s(0, 1, 2),
                top_left: s(0, 2, 0),
                top_right: s(0, 2, 2),
                bottom_left: s(0, 0, 0),
                bottom_right: s(0, 0, 2),
            },
            BlockSide::TOP => Self {
                top: s(1, 2, 0),
                left: s(0, 2, 1),
                bottom: s(1, 2, 2),
                right: s(2, 2, 1),
                top_left: s(0, 2, 0),
                top_right: s(2, 2, 0),
                bottom_left: s(0, 2, 2),
                bottom_right: s(2, 2, 2),
            },
            BlockSide::BOTTOM => Self {
                top: s(1, 0, 2),
                left: s(0, 0, 1),
                bottom: s(1, 0, 0),
                right: s(2, 0, 1),
                top_left: s(0, 0, 2),
                top_right: s(2, 0, 2),
                bottom_left: s(0, 0, 0),
                bottom_right: s(2, 0, 0),
            },
        }
    }
}

/// Occlusion weight of one corner from its two edge cells and its diagonal.
///
/// Two solid edges close the corner completely, whatever the diagonal holds.
pub fn corner_weight(edge_a: bool, edge_b: bool, diagonal: bool) -> u8 {
    if edge_a && edge_b {
        0
    } else {
        3 - edge_a as u8 - edge_b as u8 - diagonal as u8
    }
}

/// The four corner weights of one face of the voxel at the centre of `n`.
pub fn face_ambient_occlusion(side: BlockSide, n: &Neighborhood) -> AmbientOcclusion {
    let ring = FaceRing::of(side, n);
    AmbientOcclusion {
        v00: corner_weight(ring.top, ring.left, ring.top_left),
        v01: corner_weight(ring.top, ring.right, ring.top_right),
        v10: corner_weight(ring.bottom, ring.left, ring.bottom_left),
        v11: corner_weight(ring.bottom, ring.right, ring.bottom_right),
    }
}

/// Appends the six vertices of one face to `out`.
///
/// # Arguments
/// * `out` - Mesh being built
/// * `side` - Which face of the voxel
/// * `block` - Block byte of the voxel, used for the atlas lookup
/// * `local` - Voxel position inside its chunk
/// * `n` - The voxel's neighbourhood, for ambient occlusion
pub fn push_face(
    out: &mut Vec<PackedVertex>,
    side: BlockSide,
    block: BlockTypeSize,
    local: [i32; 3],
    n: &Neighborhood,
) {
    let ao = face_ambient_occlusion(side, n);
    let atlas_index = get_texture_index(block, side);

    for (corner, uv) in FACE_VERTEX_DATA[side as usize].iter().zip(UV_DATA) {
        let position = [
            corner[0] + local[0],
            corner[1] + local[1],
            corner[2] + local[2],
        ];
        out.push(PackedVertex::new(position, uv, atlas_index, ao));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{InnerSpace, Vector3};

    fn empty() -> Neighborhood {
        [[[0; 3]; 3]; 3]
    }

    #[test]
    fn templates_lie_on_their_face() {
        for side in BlockSide::all() {
            let normal = side.normal();
            for corner in FACE_VERTEX_DATA[side as usize] {
                // every corner sits on the plane the normal points at
                let along = corner[0] * normal.x + corner[1] * normal.y + corner[2] * normal.z;
                let expected = if normal.x + normal.y + normal.z > 0 { 1 } else { 0 };
                assert_eq!(along.abs(), expected, "{side:?} corner {corner:?}");
            }
        }
    }

    #[test]
    fn triangles_face_outwards() {
        for side in BlockSide::all() {
            let normal = side.normal().cast::<f32>().unwrap();
            for tri in FACE_VERTEX_DATA[side as usize].chunks(3) {
                let p = |i: usize| Vector3::new(tri[i][0], tri[i][1], tri[i][2]).cast::<f32>().unwrap();
                let winding = (p(1) - p(0)).cross(p(2) - p(0));
                assert!(winding.dot(normal) > 0.0, "{side:?}");
            }
        }
    }

    #[test]
    fn open_faces_are_fully_lit() {
        let n = empty();
        for side in BlockSide::all() {
            assert_eq!(face_ambient_occlusion(side, &n), AmbientOcclusion::OPEN);
        }
    }

    #[test]
    fn two_solid_edges_close_the_corner_regardless_of_diagonal() {
        assert_eq!(corner_weight(true, true, false), 0);
        assert_eq!(corner_weight(true, true, true), 0);
        assert_eq!(corner_weight(true, false, true), 1);
        assert_eq!(corner_weight(false, false, true), 2);
        assert_eq!(corner_weight(false, false, false), 3);
    }

    #[test]
    fn top_face_corner_reads_its_own_ring() {
        let mut n = empty();
        // top face ring: top = [1][2][0], left = [0][2][1]
        n[1][2][0] = 2;
        n[0][2][1] = 2;
        let ao = face_ambient_occlusion(BlockSide::TOP, &n);
        assert_eq!(ao.v00, 0);
        assert_eq!(ao.v01, 2);
        assert_eq!(ao.v10, 2);
        assert_eq!(ao.v11, 3);

        // cells below the voxel don't affect the top face
        let mut below = empty();
        below[1][0][0] = 2;
        below[0][0][1] = 2;
        assert_eq!(face_ambient_occlusion(BlockSide::TOP, &below), AmbientOcclusion::OPEN);
    }

    #[test]
    fn pushed_face_is_offset_by_the_voxel_and_textured() {
        let mut out = Vec::new();
        push_face(&mut out, BlockSide::TOP, 1, [4, 5, 6], &empty());
        assert_eq!(out.len(), VERTICES_PER_FACE);
        assert_eq!(out[0].voxel_position(), [4, 6, 6]);
        assert!(out.iter().all(|v| v.atlas_index() == 2));
        assert_eq!(out[2].uv(), [0xf, 0xf]);
    }
}
