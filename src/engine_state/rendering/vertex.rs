//! Vertex data structures for voxel meshes.
//!
//! This module defines the packed two-word vertex the mesh builder emits and
//! the helpers that pack and unpack its fields.

/// Fixed-point scale of packed positions: one voxel is 16 units.
pub const POSITION_SCALE: u32 = 16;

const POSITION_MASK: u32 = 0x3ff;
const POSITION_BITS: u32 = 10;

const UV_MASK: u32 = 0xf;
const ATLAS_SHIFT: u32 = 8;
const ATLAS_MASK: u32 = 0xff;
const AO_SHIFT: u32 = 16;
const AO_MASK: u32 = 0x3;

/// A vertex in the voxel rendering pipeline.
///
/// Two 32-bit words, laid out for a non-indexed triangle list.
///
/// # Memory Layout
/// - `position`: x, y, z chunk-local positions in 1/16 voxel fixed point,
///   10 bits each at bit offsets 0, 10 and 20
/// - `attributes`: U (4 bits, offset 0), V (4 bits, offset 4), atlas cell
///   (8 bits, offset 8), then four 2-bit ambient-occlusion corner weights
///   at offsets 16, 18, 20 and 22
///
/// Total size: 8 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PackedVertex {
    pub position: u32,
    pub attributes: u32,
}

/// Ambient-occlusion weights of a face's four corners, each in `0..=3`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AmbientOcclusion {
    pub v00: u8,
    pub v01: u8,
    pub v10: u8,
    pub v11: u8,
}

impl AmbientOcclusion {
    /// All four corners fully open.
    pub const OPEN: Self = Self {
        v00: 3,
        v01: 3,
        v10: 3,
        v11: 3,
    };

    fn pack(self) -> u32 {
        (self.v00 as u32 & AO_MASK)
            | (self.v01 as u32 & AO_MASK) << 2
            | (self.v10 as u32 & AO_MASK) << 4
            | (self.v11 as u32 & AO_MASK) << 6
    }
}

impl PackedVertex {
    /// Packs one vertex.
    ///
    /// # Arguments
    /// * `position` - Chunk-local position in whole voxels (corner offset already added)
    /// * `uv` - Atlas cell offset, each component in `0..=15`
    /// * `atlas_index` - Atlas cell of the face
    /// * `ao` - Corner occlusion weights of the face
    ///
    /// Positions wrap at 64 voxels, so anything within a chunk (plus its
    /// far corner at 16) is exact.
    pub fn new(position: [i32; 3], uv: [u8; 2], atlas_index: u8, ao: AmbientOcclusion) -> Self {
        let fixed = |v: i32| (v as u32).wrapping_mul(POSITION_SCALE) & POSITION_MASK;
        let position = fixed(position[0])
            | fixed(position[1]) << POSITION_BITS
            | fixed(position[2]) << (2 * POSITION_BITS);

        let attributes = (uv[0] as u32 & UV_MASK)
            | (uv[1] as u32 & UV_MASK) << 4
            | (atlas_index as u32 & ATLAS_MASK) << ATLAS_SHIFT
            | ao.pack() << AO_SHIFT;

        Self {
            position,
            attributes,
        }
    }

    /// The fixed-point x, y and z fields.
    pub fn fixed_position(&self) -> [u32; 3] {
        [
            self.position & POSITION_MASK,
            (self.position >> POSITION_BITS) & POSITION_MASK,
            (self.position >> (2 * POSITION_BITS)) & POSITION_MASK,
        ]
    }

    /// The position in whole voxels, for vertices inside the chunk.
    pub fn voxel_position(&self) -> [u32; 3] {
        self.fixed_position().map(|v| v / POSITION_SCALE)
    }

    pub fn uv(&self) -> [u8; 2] {
        [
            (self.attributes & UV_MASK) as u8,
            ((self.attributes >> 4) & UV_MASK) as u8,
        ]
    }

    pub fn atlas_index(&self) -> u8 {
        ((self.attributes >> ATLAS_SHIFT) & ATLAS_MASK) as u8
    }

    pub fn ambient_occlusion(&self) -> AmbientOcclusion {
        let ao = self.attributes >> AO_SHIFT;
        AmbientOcclusion {
            v00: (ao & AO_MASK) as u8,
            v01: ((ao >> 2) & AO_MASK) as u8,
            v10: ((ao >> 4) & AO_MASK) as u8,
            v11: ((ao >> 6) & AO_MASK) as u8,
        }
    }
}
