//! # World Module
//!
//! This module provides the `World` struct, the index from `ChunkId` to chunk
//! data that every pipeline stage shares.
//!
//! ## Architecture
//!
//! The world is sparse: a chunk exists only once it has been explicitly added,
//! either by a region load or by a voxel write into unloaded space. Reading a
//! voxel from a missing chunk never creates it and simply reads as air.
//!
//! ## Thread Safety
//!
//! The index itself sits behind a `RwLock`, and each chunk behind its own
//! `MtResource`. Handles are cloned out of the map and the map lock released
//! before any chunk lock is taken, so the two lock levels never nest.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cgmath::{Point3, Vector3};
use log::trace;

use crate::core::MtResource;
use crate::engine_state::voxels::block::BlockTypeSize;
use crate::engine_state::voxels::chunk::coords::{
    chunk_coords_of, local_coords_of, ChunkId, CHUNK_COORD_LIMIT,
};
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION};

/// Distance between ray samples in world units.
pub const RAYCAST_STEP: f32 = 0.01;

/// Longest ray worth marching: the diagonal of the addressable world.
pub const MAX_RAYCAST_DISTANCE: f32 =
    2.0 * 1.732_050_8 * (CHUNK_COORD_LIMIT * CHUNK_DIMENSION) as f32;

/// A voxel hit by [`World::raycast`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RaycastHit {
    /// World coordinates of the first non-air voxel along the ray.
    pub voxel: Point3<i32>,
    /// Face of that voxel the ray entered through, as a signed unit axis
    /// (several axes are set when the sample sat exactly on an edge).
    pub normal: Vector3<i32>,
}

/// The sparse voxel world shared by every pipeline stage.
pub struct World {
    chunks: RwLock<HashMap<ChunkId, MtResource<Chunk>>>,
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl World {
    /// Creates a new, empty world.
    pub fn new() -> Self {
        World {
            chunks: RwLock::new(HashMap::new()),
        }
    }

    fn read_index(&self) -> RwLockReadGuard<'_, HashMap<ChunkId, MtResource<Chunk>>> {
        self.chunks.read().unwrap()
    }

    fn write_index(&self) -> RwLockWriteGuard<'_, HashMap<ChunkId, MtResource<Chunk>>> {
        self.chunks.write().unwrap()
    }

    /// Adds an empty chunk at `coords`, or returns the chunk already there.
    ///
    /// Re-adding existing coordinates is a no-op.
    ///
    /// # Arguments
    /// * `coords` - The chunk coordinates of the chunk
    ///
    /// # Returns
    /// A handle to the chunk stored at `coords`.
    pub fn add(&self, coords: Point3<i32>) -> MtResource<Chunk> {
        self.insert(coords).0
    }

    /// Adds an empty chunk at `coords` only if none exists.
    ///
    /// # Returns
    /// `Some(handle)` when a new chunk was created, `None` if one already existed.
    pub fn try_add(&self, coords: Point3<i32>) -> Option<MtResource<Chunk>> {
        match self.insert(coords) {
            (chunk, true) => Some(chunk),
            (_, false) => None,
        }
    }

    fn insert(&self, coords: Point3<i32>) -> (MtResource<Chunk>, bool) {
        let id = ChunkId::from_coords(coords);
        let mut chunks = self.write_index();
        if let Some(existing) = chunks.get(&id) {
            return (existing.clone(), false);
        }

        trace!("adding chunk {id} at {coords:?}");
        let chunk = MtResource::new(Chunk::empty(coords));
        chunks.insert(id, chunk.clone());
        (chunk, true)
    }

    /// Whether a chunk with this id is in the index.
    pub fn has(&self, id: ChunkId) -> bool {
        self.read_index().contains_key(&id)
    }

    /// Returns the chunk stored under `id`.
    ///
    /// # Panics
    /// Panics if no such chunk exists. Callers check with [`World::has`] first
    /// or use [`World::try_get`].
    pub fn get(&self, id: ChunkId) -> MtResource<Chunk> {
        match self.try_get(id) {
            Some(chunk) => chunk,
            None => panic!("chunk {id} is not in the world"),
        }
    }

    /// Returns the chunk stored under `id`, if any.
    pub fn try_get(&self, id: ChunkId) -> Option<MtResource<Chunk>> {
        self.read_index().get(&id).cloned()
    }

    /// Returns the chunk at chunk coordinates `coords`, if any.
    pub fn chunk_at(&self, coords: Point3<i32>) -> Option<MtResource<Chunk>> {
        self.try_get(ChunkId::try_from_coords(coords)?)
    }

    /// Removes a chunk from the index and releases its voxel storage.
    ///
    /// # Panics
    /// Panics if no such chunk exists.
    pub fn remove(&self, id: ChunkId) {
        let removed = self.write_index().remove(&id);
        match removed {
            Some(chunk) => chunk.get_mut().release(),
            None => panic!("cannot remove chunk {id}: it is not in the world"),
        }
    }

    /// Number of chunks in the index.
    pub fn len(&self) -> usize {
        self.read_index().len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.read_index().is_empty()
    }

    /// Ids of every chunk currently in the index, in no particular order.
    pub fn ids(&self) -> Vec<ChunkId> {
        self.read_index().keys().copied().collect()
    }

    /// Reads the block at world voxel coordinates.
    ///
    /// # Returns
    /// The stored block byte, or `0` (air) if the containing chunk isn't
    /// loaded. Voxels beyond the addressable range are always air.
    pub fn get_voxel_global(&self, voxel: Point3<i32>) -> BlockTypeSize {
        match self.chunk_at(chunk_coords_of(voxel)) {
            Some(chunk) => chunk.get().get_voxel(local_coords_of(voxel)),
            None => 0,
        }
    }

    /// Writes the block at world voxel coordinates, creating an empty chunk
    /// if the containing one isn't loaded. A chunk created this way is not
    /// run through terrain generation.
    ///
    /// # Returns
    /// The id of the chunk that was written.
    pub fn set_voxel_global(&self, voxel: Point3<i32>, block: BlockTypeSize) -> ChunkId {
        let coords = chunk_coords_of(voxel);
        let chunk = self.add(coords);
        chunk.get_mut().set_voxel(local_coords_of(voxel), block);
        ChunkId::from_coords(coords)
    }

    /// Marches a ray through the world and returns the first solid voxel it meets.
    ///
    /// The ray is sampled every [`RAYCAST_STEP`] units from `origin` out to
    /// `distance`. Consecutive samples in the same voxel are only tested once.
    /// The reported normal is the sign of the offset from the voxel centre on
    /// whichever axes have the largest magnitude.
    ///
    /// # Arguments
    /// * `origin` - Ray start in world units
    /// * `direction` - Ray direction, expected to be normalised
    /// * `distance` - How far to march, capped at [`MAX_RAYCAST_DISTANCE`]
    ///
    /// # Returns
    /// The hit voxel and entry normal, or `None` when nothing solid lies
    /// within `distance` or `distance` is not a finite number.
    pub fn raycast(
        &self,
        origin: Point3<f32>,
        direction: Vector3<f32>,
        distance: f32,
    ) -> Option<RaycastHit> {
        if !distance.is_finite() {
            return None;
        }
        let steps = (distance.min(MAX_RAYCAST_DISTANCE) / RAYCAST_STEP).ceil().max(0.0) as u32;
        let mut last_voxel = None;

        for step in 0..steps {
            let t = step as f32 * RAYCAST_STEP;
            let p = origin + direction * t;
            let voxel = Point3::new(p.x.floor() as i32, p.y.floor() as i32, p.z.floor() as i32);
            if last_voxel == Some(voxel) {
                continue;
            }
            last_voxel = Some(voxel);

            if self.get_voxel_global(voxel) != 0 {
                let offset = Vector3::new(
                    p.x - (voxel.x as f32 + 0.5),
                    p.y - (voxel.y as f32 + 0.5),
                    p.z - (voxel.z as f32 + 0.5),
                );
                return Some(RaycastHit {
                    voxel,
                    normal: dominant_axis_sign(offset),
                });
            }
        }
        None
    }
}

fn dominant_axis_sign(offset: Vector3<f32>) -> Vector3<i32> {
    let q = Vector3::new(offset.x.abs(), offset.y.abs(), offset.z.abs());
    let maximum = q.x.max(q.y).max(q.z);

    let sign = |v: f32| (v > 0.0) as i32 - (v < 0.0) as i32;
    Vector3::new(
        if q.x == maximum { sign(offset.x) } else { 0 },
        if q.y == maximum { sign(offset.y) } else { 0 },
        if q.z == maximum { sign(offset.z) } else { 0 },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_insert_or_get() {
        let world = World::new();
        let first = world.add(Point3::new(1, 2, 3));
        first.get_mut().set_voxel(Point3::new(0, 0, 0), 3);

        let second = world.add(Point3::new(1, 2, 3));
        assert_eq!(second.get().get_voxel(Point3::new(0, 0, 0)), 3);
        assert_eq!(world.len(), 1);
        assert!(world.try_add(Point3::new(1, 2, 3)).is_none());
        assert!(world.try_add(Point3::new(1, 2, 4)).is_some());
    }

    #[test]
    fn has_and_get_agree() {
        let world = World::new();
        let id = ChunkId::from_coords(Point3::new(-1, 0, 0));
        assert!(!world.has(id));
        world.add(Point3::new(-1, 0, 0));
        assert!(world.has(id));
        assert_eq!(world.get(id).get().position, Point3::new(-1, 0, 0));
    }

    #[test]
    #[should_panic(expected = "is not in the world")]
    fn get_of_missing_chunk_panics() {
        World::new().get(ChunkId::from_coords(Point3::new(0, 0, 0)));
    }

    #[test]
    #[should_panic(expected = "cannot remove chunk")]
    fn remove_of_missing_chunk_panics() {
        World::new().remove(ChunkId::from_coords(Point3::new(0, 0, 0)));
    }

    #[test]
    fn remove_releases_storage_held_by_other_handles() {
        let world = World::new();
        let chunk = world.add(Point3::new(0, 0, 0));
        let id = chunk.get().id();
        world.remove(id);
        assert!(world.is_empty());
        assert!(chunk.get().is_released());
    }

    #[test]
    fn missing_chunks_read_as_air_and_are_not_created() {
        let world = World::new();
        assert_eq!(world.get_voxel_global(Point3::new(100, -40, 7)), 0);
        assert!(world.is_empty());
    }

    #[test]
    fn voxels_beyond_the_addressable_range_read_as_air() {
        let world = World::new();
        world.set_voxel_global(Point3::new(0, 0, 0), 3);
        for voxel in [
            Point3::new(300_000, 0, 0),
            Point3::new(0, -300_000, 0),
            Point3::new(i32::MAX, i32::MIN, i32::MAX),
        ] {
            assert_eq!(world.get_voxel_global(voxel), 0, "voxel {voxel:?}");
        }
        assert!(world.chunk_at(Point3::new(0, 0, CHUNK_COORD_LIMIT + 1)).is_none());
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn voxel_writes_create_chunks_on_demand() {
        let world = World::new();
        let id = world.set_voxel_global(Point3::new(-1, -1, -1), 4);
        assert_eq!(id, ChunkId::from_coords(Point3::new(-1, -1, -1)));
        assert_eq!(world.get_voxel_global(Point3::new(-1, -1, -1)), 4);
        assert_eq!(
            world.get(id).get().get_voxel(Point3::new(15, 15, 15)),
            4
        );
    }

    #[test]
    fn raycast_reports_entry_face() {
        let world = World::new();
        world.set_voxel_global(Point3::new(3, 0, 0), 3);

        let hit = world
            .raycast(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0), 5.0)
            .unwrap();
        assert_eq!(hit.voxel, Point3::new(3, 0, 0));
        assert_eq!(hit.normal, Vector3::new(-1, 0, 0));

        let hit = world
            .raycast(Point3::new(3.5, 4.5, 0.5), Vector3::new(0.0, -1.0, 0.0), 5.0)
            .unwrap();
        assert_eq!(hit.normal, Vector3::new(0, 1, 0));
    }

    #[test]
    fn raycast_misses_beyond_distance() {
        let world = World::new();
        world.set_voxel_global(Point3::new(10, 0, 0), 3);
        assert!(world
            .raycast(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0), 5.0)
            .is_none());
    }

    #[test]
    fn raycast_marches_through_unaddressable_space() {
        let world = World::new();
        world.set_voxel_global(Point3::new(0, 0, 0), 3);

        // starts far outside the world and travels towards it
        let far = (CHUNK_COORD_LIMIT * CHUNK_DIMENSION + 20) as f32;
        let hit = world.raycast(
            Point3::new(far + 0.5, 0.5, 0.5),
            Vector3::new(-1.0, 0.0, 0.0),
            30.0,
        );
        assert!(hit.is_none());

        let origin = Point3::new((CHUNK_COORD_LIMIT * CHUNK_DIMENSION) as f32 - 5.5, 0.5, 0.5);
        assert!(world
            .raycast(origin, Vector3::new(1.0, 0.0, 0.0), 30.0)
            .is_none());
    }

    #[test]
    fn raycast_rejects_distances_that_are_not_finite() {
        let world = World::new();
        world.set_voxel_global(Point3::new(3, 0, 0), 3);
        let origin = Point3::new(0.5, 0.5, 0.5);
        let direction = Vector3::new(1.0, 0.0, 0.0);

        assert!(world.raycast(origin, direction, f32::INFINITY).is_none());
        assert!(world.raycast(origin, direction, f32::NAN).is_none());
        assert!(world.raycast(origin, direction, -1.0).is_none());
        assert!(world.raycast(origin, direction, 5.0).is_some());
    }
}
