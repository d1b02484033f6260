//! # Terrain Generation
//!
//! The two terrain passes a chunk goes through before it can be meshed:
//!
//! 1. **Fill** samples 3D Perlin noise for every cell and adds a vertical
//!    bias that drags density down as the world rises towards `y = 0`, so
//!    the terrain settles into ground with open sky above it instead of
//!    floating noise blobs. Positive cells become dirt.
//!    Fill only touches its own chunk.
//! 2. **Populate** turns every solid cell with air directly above it into
//!    grass. For the top layer "above" lives in the chunk one unit up, which
//!    is why populate has to wait until that neighbour has been filled.

use cgmath::Point3;
use log::trace;
use noise::{NoiseFn, Perlin};

use crate::core::MtResource;
use crate::engine_state::config::GeneratorConfig;
use crate::engine_state::voxels::block::block_type::BlockType;
use crate::engine_state::voxels::block::BlockTypeSize;
use crate::engine_state::voxels::chunk::coords::chunk_origin;
use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION, CHUNK_PLANE_SIZE};
use crate::engine_state::voxels::world::World;

/// Deterministic terrain source for a given seed and parameter set.
pub struct ChunkGenerator {
    perlin: Perlin,
    config: GeneratorConfig,
}

impl ChunkGenerator {
    /// Creates a generator from its configuration.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            config,
        }
    }

    /// The parameters this generator was built with.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Density at a cell of a chunk. Positive means solid.
    ///
    /// The noise is sampled at `(local / 16 + chunk) * frequency`, so one
    /// chunk spans one noise lattice cell at the default frequency.
    pub fn density(&self, chunk: Point3<i32>, local: Point3<usize>) -> f64 {
        let dim = CHUNK_DIMENSION as f64;
        let sample = [
            (local.x as f64 / dim + chunk.x as f64) * self.config.frequency,
            (local.y as f64 / dim + chunk.y as f64) * self.config.frequency,
            (local.z as f64 / dim + chunk.z as f64) * self.config.frequency,
        ];
        let world_y = local.y as i32 + chunk.y * CHUNK_DIMENSION;
        self.perlin.get(sample) + self.vertical_bias(world_y)
    }

    /// `clamp(y / -depth - 1, -1, 0)`: zero below `y = -depth`, falling to -1
    /// at `y = 0` and staying there above it.
    pub fn vertical_bias(&self, world_y: i32) -> f64 {
        (world_y as f64 / -self.config.vertical_bias_depth - 1.0).clamp(-1.0, 0.0)
    }

    /// Overwrites every cell of `chunk` with dirt or air from the density field.
    pub fn fill_terrain(&self, chunk: &mut Chunk) {
        let position = chunk.position;
        if chunk.is_released() {
            trace!("chunk {position:?} was released before fill");
            return;
        }
        let dim = CHUNK_DIMENSION as usize;
        let voxels = chunk.voxels_mut();

        for z in 0..dim {
            for y in 0..dim {
                for x in 0..dim {
                    let local = Point3::new(x, y, z);
                    voxels[Chunk::index_of(local)] = if self.density(position, local) > 0.0 {
                        BlockType::DIRT.as_int()
                    } else {
                        BlockType::AIR.as_int()
                    };
                }
            }
        }

        trace!("filled chunk {position:?}");
    }

    /// Turns exposed surface cells of a chunk into grass.
    ///
    /// The plane just above the chunk is read through the world before the
    /// chunk itself is locked for writing, so no two chunk locks are held at once.
    pub fn populate_terrain(&self, chunk: &MtResource<Chunk>, world: &World) {
        let position = chunk.get().position;
        let above = read_plane_above(world, position);

        let mut guard = chunk.get_mut();
        if guard.is_released() {
            trace!("chunk {position:?} was released before populate");
            return;
        }
        populate_voxels(guard.voxels_mut(), &above);
        trace!("populated chunk {position:?}");
    }
}

/// Block bytes of the `y = 0` layer of the chunk above `chunk`, indexed `x + z * 16`.
fn read_plane_above(world: &World, chunk: Point3<i32>) -> Vec<BlockTypeSize> {
    let origin = chunk_origin(chunk);
    let mut plane = vec![0; CHUNK_PLANE_SIZE as usize];
    for z in 0..CHUNK_DIMENSION {
        for x in 0..CHUNK_DIMENSION {
            plane[(x + z * CHUNK_DIMENSION) as usize] =
                world.get_voxel_global(origin + cgmath::Vector3::new(x, CHUNK_DIMENSION, z));
        }
    }
    plane
}

/// Grass pass over one chunk's voxels given the layer above it.
fn populate_voxels(voxels: &mut [BlockTypeSize], above_plane: &[BlockTypeSize]) {
    let dim = CHUNK_DIMENSION as usize;
    for z in 0..dim {
        for y in 0..dim {
            for x in 0..dim {
                let index = Chunk::index_of(Point3::new(x, y, z));
                if voxels[index] == 0 {
                    continue;
                }

                let above = if y + 1 < dim {
                    voxels[Chunk::index_of(Point3::new(x, y + 1, z))]
                } else {
                    above_plane[x + z * dim]
                };
                if above == 0 {
                    voxels[index] = BlockType::GRASS.as_int();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ChunkGenerator {
        ChunkGenerator::new(GeneratorConfig::default())
    }

    #[test]
    fn bias_ramps_from_zero_underground_to_minus_one_at_sea_level() {
        let generator = generator();
        assert_eq!(generator.vertical_bias(-400), 0.0);
        assert_eq!(generator.vertical_bias(-8), 0.0);
        assert_eq!(generator.vertical_bias(-4), -0.5);
        assert_eq!(generator.vertical_bias(0), -1.0);
        assert_eq!(generator.vertical_bias(40), -1.0);
    }

    #[test]
    fn fill_only_produces_dirt_and_air() {
        let mut chunk = Chunk::empty(Point3::new(0, -2, 1));
        generator().fill_terrain(&mut chunk);
        assert!(chunk
            .voxels()
            .iter()
            .all(|&b| b == BlockType::AIR.as_int() || b == BlockType::DIRT.as_int()));
    }

    #[test]
    fn fill_is_deterministic_per_seed() {
        let mut a = Chunk::empty(Point3::new(1, -1, -3));
        let mut b = Chunk::empty(Point3::new(1, -1, -3));
        generator().fill_terrain(&mut a);
        generator().fill_terrain(&mut b);
        assert_eq!(a.voxels(), b.voxels());
    }

    #[test]
    fn populate_marks_exposed_cells_only() {
        let dim = CHUNK_DIMENSION as usize;
        let mut voxels = vec![0; CHUNK_PLANE_SIZE as usize * dim];
        let dirt = BlockType::DIRT.as_int();
        // a column of three at (2, 0..3, 2) and a cell in the top layer
        for y in 0..3 {
            voxels[Chunk::index_of(Point3::new(2, y, 2))] = dirt;
        }
        voxels[Chunk::index_of(Point3::new(5, 15, 5))] = dirt;
        voxels[Chunk::index_of(Point3::new(6, 15, 6))] = dirt;

        let mut above = vec![0; CHUNK_PLANE_SIZE as usize];
        above[6 + 6 * dim] = dirt;

        populate_voxels(&mut voxels, &above);

        let grass = BlockType::GRASS.as_int();
        assert_eq!(voxels[Chunk::index_of(Point3::new(2, 2, 2))], grass);
        assert_eq!(voxels[Chunk::index_of(Point3::new(2, 1, 2))], dirt);
        assert_eq!(voxels[Chunk::index_of(Point3::new(2, 0, 2))], dirt);
        assert_eq!(voxels[Chunk::index_of(Point3::new(5, 15, 5))], grass);
        assert_eq!(voxels[Chunk::index_of(Point3::new(6, 15, 6))], dirt);
    }

    #[test]
    fn populate_reads_the_chunk_above_through_the_world() {
        let world = World::new();
        let below = world.add(Point3::new(0, 0, 0));
        below.get_mut().set_voxel(Point3::new(0, 15, 0), BlockType::DIRT.as_int());
        below.get_mut().set_voxel(Point3::new(1, 15, 0), BlockType::DIRT.as_int());
        world.set_voxel_global(Point3::new(1, 16, 0), BlockType::STONE.as_int());

        generator().populate_terrain(&below, &world);

        let chunk = below.get();
        assert_eq!(chunk.get_voxel(Point3::new(0, 15, 0)), BlockType::GRASS.as_int());
        assert_eq!(chunk.get_voxel(Point3::new(1, 15, 0)), BlockType::DIRT.as_int());
    }

    #[test]
    fn passes_skip_chunks_removed_from_the_world() {
        let world = World::new();
        let chunk = world.add(Point3::new(0, -1, 0));
        let id = chunk.get().id();
        world.remove(id);

        generator().fill_terrain(&mut chunk.get_mut());
        generator().populate_terrain(&chunk, &world);
        assert!(chunk.get().is_released());
    }
}
