#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Pipeline
//!
//! A concurrent chunk pipeline that turns a sparse voxel world into packed,
//! ambient-occluded vertex buffers ready for a renderer.
//!
//! ## Key Modules
//!
//! * `core` - Shared-ownership primitives used throughout the engine
//! * `engine_state` - The world, the staged pipeline, meshing and the draw pass
//!
//! ## Architecture
//!
//! Chunks move through four stages:
//! * **fill** samples noise into the chunk's voxels
//! * **populate** turns exposed surfaces into grass once every neighbour is filled
//! * **build** meshes the chunk once every neighbour is populated
//! * **upload** hands the mesh to the render thread
//!
//! Fill, populate and build each run on their own worker thread. Upload runs
//! wherever the caller drains it.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_pipeline::run();
//! }
//! ```

use std::time::Duration;

use cgmath::Point3;
use log::{error, info};
use web_time::Instant;

use engine_state::config::EngineConfig;
use engine_state::voxels::block::block_type::BlockType;
use engine_state::voxels::chunk::coords::chunk_origin;
use engine_state::voxels::chunk::CHUNK_DIMENSION;
use engine_state::EngineState;

pub mod core;
pub mod engine_state;

/// Number of random voxel edits made by the demo session.
const DEMO_EDITS: usize = 32;

/// How long the demo waits for the pipeline to go quiet.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs a headless session: loads the configured region, lets the pipeline
/// mesh it, makes some random edits and reports what would be drawn.
///
/// The config path is taken from the first command line argument. Without
/// one the defaults are used.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let config = match std::env::args().nth(1) {
        Some(path) => match EngineConfig::load(&path) {
            Ok(config) => {
                info!("Loaded config from {path}");
                config
            }
            Err(err) => {
                error!("Failed to load config {path}: {err}");
                return;
            }
        },
        None => EngineConfig::default(),
    };

    let mut engine = match EngineState::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            error!("Invalid config: {err}");
            return;
        }
    };

    let start = Instant::now();
    engine.load_configured_region();
    engine.start_pipeline();
    if !engine.wait_until_drained(DRAIN_TIMEOUT) {
        error!("Pipeline did not drain within {DRAIN_TIMEOUT:?}");
    }
    info!(
        "Initial region meshed in {:?}: {:?}",
        start.elapsed(),
        engine.stats()
    );

    let seed = engine.config().generator.seed as u64;
    let region = engine.config().region.clone();
    let mut rng = fastrand::Rng::with_seed(seed);
    let min = chunk_origin(Point3::from(region.min));
    let max = chunk_origin(Point3::from(region.max)) + cgmath::Vector3::new(1, 1, 1) * CHUNK_DIMENSION;

    for _ in 0..DEMO_EDITS {
        let voxel = Point3::new(
            rng.i32(min.x..max.x),
            rng.i32(min.y..max.y),
            rng.i32(min.z..max.z),
        );
        let block = if rng.bool() {
            BlockType::get_random_type(&mut rng).as_int()
        } else {
            BlockType::AIR.as_int()
        };
        engine.set_voxel(voxel, block);
    }
    if !engine.wait_until_drained(DRAIN_TIMEOUT) {
        error!("Pipeline did not drain after edits within {DRAIN_TIMEOUT:?}");
    }

    match engine.raycast(64.0) {
        Some(hit) => info!("Camera is looking at voxel {:?} (normal {:?})", hit.voxel, hit.normal),
        None => info!("Camera is looking at the sky"),
    }

    let draws = engine.render();
    let vertices: usize = draws.iter().map(|draw| draw.vertex_count).sum();
    info!(
        "Frame: {} of {} chunks visible, {} vertices; totals {:?}",
        draws.len(),
        engine.mesh_store().len(),
        vertices,
        engine.stats()
    );

    engine.stop_pipeline();
}
