//! # Task Management System
//!
//! Worker threads that drive the chunk pipeline.
//!
//! ## Architecture Overview
//!
//! - `ChunkUpdater`: the queues and the logic of every stage, all callable
//!   synchronously through `&self`
//! - `ChunkPipeline`: one OS thread each for the fill, populate and build
//!   stages, looping over `ChunkUpdater::step`
//! - `PipelineStats`: counters the workers bump as chunks move along
//!
//! The upload stage has no worker. The thread that owns the mesh sink drains
//! it with `ChunkUpdater::upload_all`, typically once per frame.
//!
//! ## Worker Loop
//!
//! A worker steps its stage until a step makes no progress. It keeps stepping
//! through chunks that were requeued, and sleeps for the configured idle
//! interval once it has gone through the whole queue without advancing one
//! (or found the queue empty). Workers never block on each other.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//! use cgmath::Point3;
//! use voxel_pipeline::engine_state::config::{GeneratorConfig, PipelineConfig};
//! use voxel_pipeline::engine_state::task_management::{ChunkPipeline, ChunkUpdater};
//! use voxel_pipeline::engine_state::voxels::chunk::coords::ChunkId;
//! use voxel_pipeline::engine_state::voxels::generation::ChunkGenerator;
//! use voxel_pipeline::engine_state::voxels::world::World;
//!
//! let config = PipelineConfig { idle_sleep_ms: 1, ..PipelineConfig::default() };
//! let world = Arc::new(World::new());
//! let updater = Arc::new(ChunkUpdater::new(
//!     world.clone(),
//!     ChunkGenerator::new(GeneratorConfig::default()),
//!     &config,
//! ));
//!
//! world.add(Point3::new(0, -1, 0));
//! updater.enqueue_fill(ChunkId::from_coords(Point3::new(0, -1, 0)));
//!
//! let mut pipeline = ChunkPipeline::new(updater.clone(), &config);
//! pipeline.start();
//! while !updater.is_drained() {
//!     std::thread::sleep(std::time::Duration::from_millis(1));
//! }
//! pipeline.stop();
//! assert_eq!(updater.stats().built, 1);
//! ```

pub mod chunk_updater;
pub mod queues;
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

pub use chunk_updater::{ChunkUpdater, Stage};
pub use stats::{PipelineStats, StatsSnapshot};

use crate::engine_state::config::PipelineConfig;

/// Owns the stage worker threads.
///
/// Dropping the pipeline stops and joins its workers.
pub struct ChunkPipeline {
    updater: Arc<ChunkUpdater>,
    idle_sleep: Duration,
    shutdown: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl ChunkPipeline {
    /// Creates a pipeline around `updater` without starting any threads.
    pub fn new(updater: Arc<ChunkUpdater>, config: &PipelineConfig) -> Self {
        Self {
            updater,
            idle_sleep: Duration::from_millis(config.idle_sleep_ms),
            shutdown: Arc::new(AtomicBool::new(false)),
            workers: Vec::new(),
        }
    }

    pub fn updater(&self) -> &Arc<ChunkUpdater> {
        &self.updater
    }

    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// Spawns one worker per stage. Does nothing if already running.
    ///
    /// # Panics
    /// Panics if the underlying thread creation fails.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }

        self.shutdown.store(false, Ordering::Release);
        for stage in Stage::WORKERS {
            let updater = self.updater.clone();
            let shutdown = self.shutdown.clone();
            let idle_sleep = self.idle_sleep;
            self.workers.push(thread::spawn(move || {
                run_stage(stage, &updater, &shutdown, idle_sleep)
            }));
        }

        info!(
            "Chunk pipeline started: {} workers, idle sleep {:?}",
            self.workers.len(),
            self.idle_sleep
        );
    }

    /// Signals the workers and waits for them to exit.
    ///
    /// Chunks still queued stay queued; starting again resumes them.
    pub fn stop(&mut self) {
        if !self.is_running() {
            return;
        }

        self.shutdown.store(true, Ordering::Release);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("A chunk pipeline worker panicked");
            }
        }
        info!("Chunk pipeline stopped");
    }
}

impl Drop for ChunkPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_stage(stage: Stage, updater: &ChunkUpdater, shutdown: &AtomicBool, idle_sleep: Duration) {
    let mut misses = 0;
    while !shutdown.load(Ordering::Acquire) {
        if updater.step(stage) {
            misses = 0;
            continue;
        }

        misses += 1;
        if misses > updater.pending(stage) {
            thread::sleep(idle_sleep);
            misses = 0;
        }
    }
}
