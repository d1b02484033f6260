//! # Chunk Coordinate Module
//!
//! Addressing math between world voxel coordinates, chunk coordinates and
//! chunk-local coordinates, plus the scalar `ChunkId` used to key the world
//! index.
//!
//! All lattice coordinates are integers. Negative world coordinates are
//! handled with floor division and a non-negative modulo, so voxel `-1`
//! lives in chunk `-1` at local `15`.

use std::fmt;

use cgmath::{Point3, Vector3};

use super::CHUNK_DIMENSION;

/// Largest absolute chunk coordinate per axis that `ChunkId` supports
/// without overflowing 64 bits.
pub const CHUNK_COORD_LIMIT: i32 = 1 << 14;

/// Returns the coordinates of the chunk containing a world voxel.
pub fn chunk_coords_of(voxel: Point3<i32>) -> Point3<i32> {
    Point3::new(
        voxel.x.div_euclid(CHUNK_DIMENSION),
        voxel.y.div_euclid(CHUNK_DIMENSION),
        voxel.z.div_euclid(CHUNK_DIMENSION),
    )
}

/// Returns the position of a world voxel inside its chunk, each axis in
/// `0..CHUNK_DIMENSION`.
pub fn local_coords_of(voxel: Point3<i32>) -> Point3<usize> {
    Point3::new(
        voxel.x.rem_euclid(CHUNK_DIMENSION) as usize,
        voxel.y.rem_euclid(CHUNK_DIMENSION) as usize,
        voxel.z.rem_euclid(CHUNK_DIMENSION) as usize,
    )
}

/// Returns the world position of the first voxel (local `0,0,0`) of a chunk.
pub fn chunk_origin(chunk: Point3<i32>) -> Point3<i32> {
    Point3::new(
        chunk.x * CHUNK_DIMENSION,
        chunk.y * CHUNK_DIMENSION,
        chunk.z * CHUNK_DIMENSION,
    )
}

/// The 26 offsets from a chunk to the chunks touching it by face, edge or corner.
pub fn neighbor_offsets() -> impl Iterator<Item = Vector3<i32>> {
    (-1..=1).flat_map(|z| {
        (-1..=1).flat_map(move |y| {
            (-1..=1)
                .map(move |x| Vector3::new(x, y, z))
                .filter(|offset| *offset != Vector3::new(0, 0, 0))
        })
    })
}

/// Collision-free scalar identity of a chunk.
///
/// Each signed axis is folded onto the naturals (`v >= 0 -> 2v`,
/// `v < 0 -> -2v - 1`) and the three results are combined with two Cantor
/// pairings: `pair(pair(x, y), z)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId(pub u64);

impl ChunkId {
    /// Computes the id of the chunk at `coords`.
    ///
    /// # Panics
    /// Panics if any axis lies outside `-CHUNK_COORD_LIMIT..=CHUNK_COORD_LIMIT`.
    pub fn from_coords(coords: Point3<i32>) -> Self {
        match Self::try_from_coords(coords) {
            Some(id) => id,
            None => panic!(
                "chunk coordinate {coords:?} outside the supported range of +/-{CHUNK_COORD_LIMIT}"
            ),
        }
    }

    /// Like [`ChunkId::from_coords`], but returns `None` for coordinates
    /// outside the supported range. No chunk can exist there.
    pub fn try_from_coords(coords: Point3<i32>) -> Option<Self> {
        let in_range = |axis: i32| (-CHUNK_COORD_LIMIT..=CHUNK_COORD_LIMIT).contains(&axis);
        if !(in_range(coords.x) && in_range(coords.y) && in_range(coords.z)) {
            return None;
        }

        let xy = cantor_pair(fold(coords.x), fold(coords.y));
        Some(ChunkId(cantor_pair(xy, fold(coords.z))))
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

fn fold(v: i32) -> u64 {
    if v >= 0 {
        2 * v as u64
    } else {
        (-2 * v as i64 - 1) as u64
    }
}

fn cantor_pair(a: u64, b: u64) -> u64 {
    let sum = a + b;
    sum * (sum + 1) / 2 + b
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    #[test]
    fn fold_interleaves_signs() {
        let folded: Vec<u64> = [0, -1, 1, -2, 2].into_iter().map(fold).collect();
        assert_eq!(folded, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn known_ids_match_fold_and_pair_ordering() {
        assert_eq!(ChunkId::from_coords(Point3::new(0, 0, 0)), ChunkId(0));
        // fold(1)=2, fold(0)=0: pair(2,0)=3, pair(3,0)=6
        assert_eq!(ChunkId::from_coords(Point3::new(1, 0, 0)), ChunkId(6));
        // fold(-1)=1: pair(0,1)=2, pair(2,0)=3
        assert_eq!(ChunkId::from_coords(Point3::new(0, -1, 0)), ChunkId(3));
        // pair(0,0)=0, pair(0,2)=5
        assert_eq!(ChunkId::from_coords(Point3::new(0, 0, 1)), ChunkId(5));
    }

    #[test]
    fn ids_are_injective_over_a_dense_cube() {
        let mut seen = HashMap::new();
        for x in -12..=12 {
            for y in -12..=12 {
                for z in -12..=12 {
                    let coords = Point3::new(x, y, z);
                    if let Some(previous) = seen.insert(ChunkId::from_coords(coords), coords) {
                        panic!("{previous:?} and {coords:?} share an id");
                    }
                }
            }
        }
    }

    #[test]
    fn ids_fit_at_the_range_limit() {
        let corner = Point3::new(CHUNK_COORD_LIMIT, -CHUNK_COORD_LIMIT, CHUNK_COORD_LIMIT);
        let id = ChunkId::from_coords(corner);
        assert_ne!(id, ChunkId::from_coords(Point3::new(-CHUNK_COORD_LIMIT, CHUNK_COORD_LIMIT, CHUNK_COORD_LIMIT)));
    }

    #[test]
    #[should_panic(expected = "outside the supported range")]
    fn coordinates_beyond_the_limit_panic() {
        ChunkId::from_coords(Point3::new(CHUNK_COORD_LIMIT + 1, 0, 0));
    }

    #[test]
    fn checked_ids_cover_exactly_the_supported_range() {
        let edge = Point3::new(CHUNK_COORD_LIMIT, -CHUNK_COORD_LIMIT, 0);
        assert_eq!(ChunkId::try_from_coords(edge), Some(ChunkId::from_coords(edge)));
        assert_eq!(ChunkId::try_from_coords(Point3::new(0, -CHUNK_COORD_LIMIT - 1, 0)), None);
        assert_eq!(ChunkId::try_from_coords(Point3::new(0, 0, i32::MAX)), None);
    }

    #[test]
    fn negative_voxels_land_in_negative_chunks() {
        let voxel = Point3::new(-1, -16, -17);
        assert_eq!(chunk_coords_of(voxel), Point3::new(-1, -1, -2));
        assert_eq!(local_coords_of(voxel), Point3::new(15, 0, 15));
    }

    #[test]
    fn there_are_26_distinct_neighbor_offsets() {
        let offsets: Vec<_> = neighbor_offsets().collect();
        assert_eq!(offsets.len(), 26);
        for (i, a) in offsets.iter().enumerate() {
            assert!(offsets[i + 1..].iter().all(|b| a != b));
        }
    }

    proptest! {
        #[test]
        fn distinct_coords_give_distinct_ids(
            a in (-2000i32..2000, -2000i32..2000, -2000i32..2000),
            b in (-2000i32..2000, -2000i32..2000, -2000i32..2000),
        ) {
            let pa = Point3::new(a.0, a.1, a.2);
            let pb = Point3::new(b.0, b.1, b.2);
            prop_assert_eq!(pa == pb, ChunkId::from_coords(pa) == ChunkId::from_coords(pb));
        }

        #[test]
        fn world_coords_split_and_recombine(
            x in -100_000i32..100_000,
            y in -100_000i32..100_000,
            z in -100_000i32..100_000,
        ) {
            let voxel = Point3::new(x, y, z);
            let chunk = chunk_coords_of(voxel);
            let local = local_coords_of(voxel);
            let origin = chunk_origin(chunk);

            prop_assert!(local.x < CHUNK_DIMENSION as usize);
            prop_assert!(local.y < CHUNK_DIMENSION as usize);
            prop_assert!(local.z < CHUNK_DIMENSION as usize);
            prop_assert_eq!(origin.x + local.x as i32, x);
            prop_assert_eq!(origin.y + local.y as i32, y);
            prop_assert_eq!(origin.z + local.z as i32, z);
        }
    }
}
