//! # Engine State Module
//!
//! The core engine module that ties the voxel world, the chunk pipeline and
//! the draw pass together.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container for the engine
//! * `camera_state` - Camera position and orientation
//! * `config` - JSON configuration and its validation
//! * `rendering` - Mesh building, frustum culling and the draw list
//! * `task_management` - The staged chunk pipeline and its worker threads
//! * `voxels` - Voxel data, chunks, the world index and terrain generation
//!
//! ## Architecture
//!
//! `EngineState` is the render-thread side of the engine. It owns the mesh
//! store and the camera, and talks to the pipeline only through the shared
//! `ChunkUpdater`: chunks go in through `load_region` and `set_voxel`, and
//! finished meshes come back out through `process_uploads`.

use std::sync::Arc;
use std::time::Duration;

use cgmath::{Deg, Point3};
use log::{debug, info};
use web_time::Instant;

use camera_state::Camera;
use config::{ConfigError, EngineConfig, LoadRegion};
use rendering::{DrawCall, Frustum, MeshStore};
use task_management::{ChunkPipeline, ChunkUpdater, StatsSnapshot};
use voxels::block::BlockTypeSize;
use voxels::chunk::coords::{chunk_coords_of, local_coords_of, ChunkId};
use voxels::generation::ChunkGenerator;
use voxels::world::{RaycastHit, World};

pub mod camera_state;
pub mod config;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// The main state container for the voxel engine
///
/// # Examples
///
/// ```
/// use voxel_pipeline::engine_state::config::{EngineConfig, LoadRegion};
/// use voxel_pipeline::engine_state::EngineState;
///
/// let mut config = EngineConfig::default();
/// config.pipeline.idle_sleep_ms = 1;
/// config.region = LoadRegion { min: [0, -1, 0], max: [1, -1, 0] };
///
/// let mut engine = EngineState::new(config).unwrap();
/// engine.load_configured_region();
/// engine.start_pipeline();
/// assert!(engine.wait_until_drained(std::time::Duration::from_secs(60)));
/// assert_eq!(engine.stats().built, 2);
/// ```
pub struct EngineState {
    /// The camera the draw pass culls against
    pub camera: Camera,
    config: EngineConfig,
    world: Arc<World>,
    updater: Arc<ChunkUpdater>,
    pipeline: ChunkPipeline,
    mesh_store: MeshStore,
    frustum: Frustum,
}

impl EngineState {
    /// Creates an engine with an empty world and a stopped pipeline.
    ///
    /// # Returns
    /// An error if `config` fails validation
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let world = Arc::new(World::new());
        let updater = Arc::new(ChunkUpdater::new(
            world.clone(),
            ChunkGenerator::new(config.generator.clone()),
            &config.pipeline,
        ));
        let pipeline = ChunkPipeline::new(updater.clone(), &config.pipeline);

        let view = &config.view;
        let frustum = Frustum::new(Deg(view.fov_degrees), view.aspect, view.near, view.far);
        let camera = Camera::new(Point3::new(0.0, 0.0, 0.0), Deg(0.0), Deg(-30.0));

        info!("Engine state created (seed {})", config.generator.seed);

        Ok(Self {
            camera,
            config,
            world,
            updater,
            pipeline,
            mesh_store: MeshStore::new(),
            frustum,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn updater(&self) -> &Arc<ChunkUpdater> {
        &self.updater
    }

    pub fn mesh_store(&self) -> &MeshStore {
        &self.mesh_store
    }

    pub fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Updates the frustum after the output surface changed shape.
    pub fn resize(&mut self, aspect: f32) {
        self.frustum.update_aspect(aspect);
    }

    pub fn start_pipeline(&mut self) {
        self.pipeline.start();
    }

    pub fn stop_pipeline(&mut self) {
        self.pipeline.stop();
    }

    /// Loads the region named in the configuration.
    pub fn load_configured_region(&self) -> usize {
        let region = self.config.region.clone();
        self.load_region(&region)
    }

    /// Adds every chunk of `region` to the world and queues the new ones for fill.
    ///
    /// All chunks are in the world before the first is queued, so each one
    /// sees its full set of neighbours when it is filled. Chunks of an
    /// earlier region that border this one are linked with it as the new
    /// chunks fill, and rebuilt once their new neighbours are populated.
    ///
    /// # Returns
    /// The number of chunks that were not loaded before
    pub fn load_region(&self, region: &LoadRegion) -> usize {
        let created: Vec<ChunkId> = region
            .coords()
            .filter_map(|coords| self.world.try_add(coords).map(|_| ChunkId::from_coords(coords)))
            .collect();

        for &id in &created {
            self.updater.enqueue_fill(id);
        }

        info!(
            "Loading region {:?}..={:?}: {} new chunks",
            region.min,
            region.max,
            created.len()
        );
        created.len()
    }

    /// Reads the block at world voxel coordinates.
    pub fn get_voxel(&self, voxel: Point3<i32>) -> BlockTypeSize {
        self.world.get_voxel_global(voxel)
    }

    /// Writes a block and queues the affected meshes for rebuild.
    ///
    /// The edited chunk is always rebuilt. When the voxel lies on a chunk
    /// face, edge or corner the chunks across it are rebuilt too. Writing into
    /// unloaded space creates an empty chunk that skips terrain generation.
    ///
    /// # Returns
    /// The id of the edited chunk
    pub fn set_voxel(&self, voxel: Point3<i32>, block: BlockTypeSize) -> ChunkId {
        let id = self.world.set_voxel_global(voxel, block);
        self.updater.enqueue_build(id);
        let neighbors = self
            .updater
            .rebuild_neighbor_chunks(chunk_coords_of(voxel), local_coords_of(voxel));

        debug!("set voxel {voxel:?} to {block}, rebuilding {} chunks", neighbors + 1);
        id
    }

    /// Casts a ray along the camera's view direction.
    pub fn raycast(&self, max_distance: f32) -> Option<RaycastHit> {
        self.world
            .raycast(self.camera.position, self.camera.get_view_vec(), max_distance)
    }

    /// Moves finished meshes from the pipeline into the mesh store.
    pub fn process_uploads(&mut self) -> usize {
        self.updater.upload_all(&mut self.mesh_store)
    }

    /// Draw calls for every visible chunk this frame.
    pub fn render(&self) -> Vec<DrawCall> {
        self.mesh_store
            .draw_chunks(&self.camera.calc_matrix(), &self.frustum)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.updater.stats()
    }

    /// Processes uploads until the pipeline has no work left or `timeout` passes.
    ///
    /// # Returns
    /// `true` if the pipeline drained in time
    pub fn wait_until_drained(&mut self, timeout: Duration) -> bool {
        let start = Instant::now();
        loop {
            // Read before uploading so meshes finished just before draining are collected.
            let drained = self.updater.is_drained();
            self.process_uploads();
            if drained {
                return true;
            }
            if start.elapsed() >= timeout {
                return false;
            }
            std::thread::sleep(Duration::from_millis(self.config.pipeline.idle_sleep_ms));
        }
    }
}
