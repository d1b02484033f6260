//! # Chunk Updater
//!
//! The four pipeline stages and the queues between them. Only chunk ids move
//! through the queues; the chunk data stays in the [`World`].
//!
//! | stage    | queue         | gate                                  | next     |
//! |----------|---------------|---------------------------------------|----------|
//! | fill     | FIFO          | none                                  | populate |
//! | populate | unique        | every registered neighbour is filled  | build    |
//! | build    | unique        | every registered neighbour populated  | upload   |
//! | upload   | unique        | none, drained all at once             | sink     |
//!
//! A chunk's neighbours are the ones it is linked with. Linking happens when
//! the first of the two is filled with the other in the world, or, for a
//! neighbour that was already filled before this chunk was loaded, when this
//! chunk is filled. A populated neighbour that gains a link this way is
//! queued for a rebuild, since its mesh was built without the new chunk.
//!
//! A chunk that fails its gate is pushed back onto the queue it came from.
//! Nothing waits on a condition variable. A chunk whose neighbour never
//! progresses is requeued forever; past the stall threshold it is reported
//! once through the log and [`PipelineStats`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cgmath::{Point3, Vector3};
use log::{debug, trace, warn};
use web_time::Instant;

use crate::core::MtResource;
use crate::engine_state::config::PipelineConfig;
use crate::engine_state::rendering::draw::MeshSink;
use crate::engine_state::rendering::meshing::build_chunk_mesh;
use crate::engine_state::task_management::queues::{FifoQueue, UniqueQueue};
use crate::engine_state::task_management::stats::{PipelineStats, StatsSnapshot};
use crate::engine_state::voxels::chunk::coords::{neighbor_offsets, ChunkId};
use crate::engine_state::voxels::chunk::{Chunk, ChunkStage, CHUNK_DIMENSION};
use crate::engine_state::voxels::generation::ChunkGenerator;
use crate::engine_state::voxels::world::World;

/// The stages that run on their own worker thread.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Fill,
    Populate,
    Build,
}

impl Stage {
    pub const WORKERS: [Stage; 3] = [Stage::Fill, Stage::Populate, Stage::Build];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Fill => "fill",
            Stage::Populate => "populate",
            Stage::Build => "build",
        })
    }
}

/// Shared state of the chunk pipeline.
///
/// Every method takes `&self`; one `Arc<ChunkUpdater>` is shared by the stage
/// workers and the render thread.
pub struct ChunkUpdater {
    world: Arc<World>,
    generator: ChunkGenerator,
    fill_queue: FifoQueue<ChunkId>,
    populate_queue: UniqueQueue<ChunkId>,
    build_queue: UniqueQueue<ChunkId>,
    upload_queue: UniqueQueue<ChunkId>,
    stats: PipelineStats,
    /// Ids queued for fill, populate or build plus ids a stage is working on.
    outstanding: AtomicUsize,
    retries: Mutex<HashMap<ChunkId, u32>>,
    stall_threshold: u32,
    /// Held while a chunk changes stage and updates its neighbours' counters.
    links: Mutex<()>,
}

impl ChunkUpdater {
    /// Creates an updater with empty queues.
    ///
    /// # Arguments
    /// * `world` - The world whose chunks flow through the pipeline
    /// * `generator` - Terrain source for the fill and populate stages
    /// * `config` - Supplies the stall threshold
    pub fn new(world: Arc<World>, generator: ChunkGenerator, config: &PipelineConfig) -> Self {
        Self {
            world,
            generator,
            fill_queue: FifoQueue::new(),
            populate_queue: UniqueQueue::new(),
            build_queue: UniqueQueue::new(),
            upload_queue: UniqueQueue::new(),
            stats: PipelineStats::default(),
            outstanding: AtomicUsize::new(0),
            retries: Mutex::new(HashMap::new()),
            stall_threshold: config.stall_threshold,
            links: Mutex::new(()),
        }
    }

    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    pub fn generator(&self) -> &ChunkGenerator {
        &self.generator
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Queues a chunk for terrain generation.
    pub fn enqueue_fill(&self, id: ChunkId) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        self.fill_queue.push(id);
    }

    /// Queues a chunk for a mesh rebuild.
    ///
    /// # Returns
    /// `false` if the chunk was already waiting for a rebuild
    pub fn enqueue_build(&self, id: ChunkId) -> bool {
        self.push_counted(&self.build_queue, id)
    }

    fn push_counted(&self, queue: &UniqueQueue<ChunkId>, id: ChunkId) -> bool {
        // Count before pushing so a worker can't pop and finish it first.
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let added = queue.push(id);
        if !added {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
        added
    }

    fn finish_work(&self) {
        self.outstanding.fetch_sub(1, Ordering::AcqRel);
    }

    /// Whether the fill, populate and build stages have nothing left to do.
    ///
    /// Finished meshes may still be waiting for [`ChunkUpdater::upload_all`].
    pub fn is_drained(&self) -> bool {
        self.outstanding.load(Ordering::Acquire) == 0
    }

    /// Number of ids waiting in a stage's queue.
    pub fn pending(&self, stage: Stage) -> usize {
        match stage {
            Stage::Fill => self.fill_queue.len(),
            Stage::Populate => self.populate_queue.len(),
            Stage::Build => self.build_queue.len(),
        }
    }

    /// Number of finished meshes waiting for upload.
    pub fn pending_uploads(&self) -> usize {
        self.upload_queue.len()
    }

    /// Runs one step of `stage`.
    pub fn step(&self, stage: Stage) -> bool {
        match stage {
            Stage::Fill => self.fill_next(),
            Stage::Populate => self.populate_next(),
            Stage::Build => self.build_next(),
        }
    }

    /// Fills the next chunk in the fill queue and hands it to populate.
    ///
    /// After filling, the chunk links with every neighbour already in the
    /// world (see [`ChunkUpdater::link_filled`]).
    ///
    /// # Returns
    /// `false` if the queue was empty
    pub fn fill_next(&self) -> bool {
        let Some(id) = self.fill_queue.pop() else {
            return false;
        };

        match self.world.try_get(id) {
            Some(chunk) => {
                let start = Instant::now();
                let (position, released) = {
                    let mut guard = chunk.get_mut();
                    self.generator.fill_terrain(&mut guard);
                    (guard.position, guard.is_released())
                };

                if released {
                    debug!("chunk {id} was released during fill");
                } else {
                    let neighbors = self.link_filled(&chunk, position);
                    self.stats.record_fill();
                    debug!(
                        "filled chunk {position:?} with {neighbors} neighbours in {:?}",
                        start.elapsed()
                    );
                    self.push_counted(&self.populate_queue, id);
                }
            }
            None => debug!("chunk {id} left the world before fill"),
        }

        self.finish_work();
        true
    }

    /// Marks a freshly filled chunk as filled and links it with its neighbours.
    ///
    /// For every neighbour in the world the chunk counts it in
    /// `neighbor_count`. A neighbour that is itself already filled is linked
    /// back: each side counts the other as filled, and the chunk also counts
    /// a populated neighbour as populated. A neighbour that is not filled
    /// yet does the linking from its own fill.
    ///
    /// # Returns
    /// The number of neighbours in the world
    fn link_filled(&self, chunk: &MtResource<Chunk>, position: Point3<i32>) -> usize {
        let _links = self.links.lock().unwrap();
        chunk.get().set_stage(ChunkStage::Filled);

        let mut neighbors = 0;
        for offset in neighbor_offsets() {
            let Some(neighbor) = self.world.chunk_at(position + offset) else {
                continue;
            };
            neighbors += 1;
            chunk.get().link_neighbor(offset);

            let stage = neighbor.get().stage();
            if stage < ChunkStage::Filled {
                continue;
            }
            {
                let guard = chunk.get();
                guard.add_filled_neighbor();
                if stage >= ChunkStage::Populated {
                    guard.add_populated_neighbor();
                }
            }

            let newly_linked = {
                let guard = neighbor.get();
                let linked = guard.link_neighbor(-offset);
                guard.add_filled_neighbor();
                linked
            };
            if newly_linked && stage >= ChunkStage::Populated {
                let neighbor_id = ChunkId::from_coords(position + offset);
                debug!("chunk {:?} gained neighbour {position:?}, rebuilding", position + offset);
                self.enqueue_build(neighbor_id);
            }
        }
        neighbors
    }

    /// Populates the next chunk whose neighbours have all been filled.
    ///
    /// # Returns
    /// `false` if the queue was empty or the popped chunk had to be requeued
    pub fn populate_next(&self) -> bool {
        let Some(id) = self.populate_queue.pop() else {
            return false;
        };

        let advanced = match self.world.try_get(id) {
            Some(chunk) => self.populate(id, &chunk),
            None => true,
        };
        self.finish_work();
        advanced
    }

    fn populate(&self, id: ChunkId, chunk: &MtResource<Chunk>) -> bool {
        let (position, ready, released) = {
            let guard = chunk.get();
            (guard.position, guard.neighbors_filled(), guard.is_released())
        };
        if released {
            debug!("chunk {id} was released before populate");
            self.clear_retries(id);
            return true;
        }
        if !ready {
            self.requeue(Stage::Populate, &self.populate_queue, id, position);
            return false;
        }

        let start = Instant::now();
        self.generator.populate_terrain(chunk, &self.world);
        {
            let _links = self.links.lock().unwrap();
            chunk.get().set_stage(ChunkStage::Populated);
            for offset in neighbor_offsets() {
                let Some(neighbor) = self.world.chunk_at(position + offset) else {
                    continue;
                };
                // unlinked neighbours pick this up when they are filled
                let guard = neighbor.get();
                if guard.is_linked_to(-offset) {
                    guard.add_populated_neighbor();
                }
            }
        }

        self.clear_retries(id);
        self.stats.record_populate();
        debug!("populated chunk {position:?} in {:?}", start.elapsed());
        self.push_counted(&self.build_queue, id);
        true
    }

    /// Meshes the next chunk whose neighbours have all been populated.
    ///
    /// # Returns
    /// `false` if the queue was empty or the popped chunk had to be requeued
    pub fn build_next(&self) -> bool {
        let Some(id) = self.build_queue.pop() else {
            return false;
        };

        let advanced = match self.world.try_get(id) {
            Some(chunk) => self.build(id, &chunk),
            None => true,
        };
        self.finish_work();
        advanced
    }

    fn build(&self, id: ChunkId, chunk: &MtResource<Chunk>) -> bool {
        let (position, ready, released) = {
            let guard = chunk.get();
            (guard.position, guard.neighbors_populated(), guard.is_released())
        };
        if released {
            debug!("chunk {id} was released before build");
            self.clear_retries(id);
            return true;
        }
        if !ready {
            self.requeue(Stage::Build, &self.build_queue, id, position);
            return false;
        }

        let start = Instant::now();
        let vertices = build_chunk_mesh(&self.world, chunk);

        self.clear_retries(id);
        self.stats.record_build();
        debug!(
            "built chunk {position:?}: {vertices} vertices in {:?}",
            start.elapsed()
        );
        self.upload_queue.push(id);
        true
    }

    /// Hands every finished mesh to `sink`.
    ///
    /// Runs on the thread that owns the sink, once per frame.
    ///
    /// # Returns
    /// The number of meshes uploaded
    pub fn upload_all(&self, sink: &mut dyn MeshSink) -> usize {
        let mut uploaded = 0;
        for id in self.upload_queue.drain() {
            let Some(handle) = self.world.try_get(id) else {
                continue;
            };
            let chunk = handle.get();
            sink.upload(id, chunk.position, chunk.mesh());
            self.stats.record_upload();
            debug!(
                "uploaded chunk {:?}: {} vertices",
                chunk.position,
                chunk.draw_count()
            );
            uploaded += 1;
        }
        uploaded
    }

    fn requeue(&self, stage: Stage, queue: &UniqueQueue<ChunkId>, id: ChunkId, position: Point3<i32>) {
        self.stats.record_requeue();
        trace!("{stage}: neighbours of chunk {position:?} not ready, requeueing");

        if self.stall_threshold > 0 {
            let mut retries = self.retries.lock().unwrap();
            let count = retries.entry(id).or_insert(0);
            *count += 1;
            if *count == self.stall_threshold + 1 {
                warn!(
                    "{stage}: chunk {position:?} requeued {} times, a neighbour may never become ready",
                    *count
                );
                self.stats.record_stall();
            }
        }

        self.push_counted(queue, id);
    }

    fn clear_retries(&self, id: ChunkId) {
        if self.stall_threshold > 0 {
            self.retries.lock().unwrap().remove(&id);
        }
    }

    /// Queues rebuilds of the chunks that share the face, edge or corner a
    /// voxel edit touched.
    ///
    /// On each axis the edit sits on the low face (local 0), the high face
    /// (local 15) or neither. Every existing chunk reachable by stepping
    /// across a non-empty subset of the touched faces is queued, up to seven
    /// for a corner voxel.
    ///
    /// # Arguments
    /// * `chunk` - Chunk coordinates of the edited voxel
    /// * `local` - Local coordinates of the edited voxel
    ///
    /// # Returns
    /// The number of chunks queued
    pub fn rebuild_neighbor_chunks(&self, chunk: Point3<i32>, local: Point3<usize>) -> usize {
        let last = (CHUNK_DIMENSION - 1) as usize;
        let side = |v: usize| -> i32 {
            if v == 0 {
                -1
            } else if v == last {
                1
            } else {
                0
            }
        };
        let sign = Vector3::new(side(local.x), side(local.y), side(local.z));

        let mut queued = 0;
        for mask in 1..8u8 {
            let touched = |bit: u8, s: i32| mask & bit == 0 || s != 0;
            if !(touched(1, sign.x) && touched(2, sign.y) && touched(4, sign.z)) {
                continue;
            }
            let pick = |bit: u8, s: i32| if mask & bit != 0 { s } else { 0 };
            let step = Vector3::new(pick(1, sign.x), pick(2, sign.y), pick(4, sign.z));

            let Some(id) = ChunkId::try_from_coords(chunk + step) else {
                continue;
            };
            if self.world.has(id) {
                self.enqueue_build(id);
                queued += 1;
            }
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::config::GeneratorConfig;
    use crate::engine_state::rendering::draw::MeshStore;

    fn updater(stall_threshold: u32) -> ChunkUpdater {
        let config = PipelineConfig {
            stall_threshold,
            ..PipelineConfig::default()
        };
        ChunkUpdater::new(
            Arc::new(World::new()),
            ChunkGenerator::new(GeneratorConfig::default()),
            &config,
        )
    }

    fn add_and_fill(updater: &ChunkUpdater, coords: Point3<i32>) -> ChunkId {
        updater.world().add(coords);
        let id = ChunkId::from_coords(coords);
        updater.enqueue_fill(id);
        id
    }

    #[test]
    fn lone_chunk_runs_through_every_stage() {
        let updater = updater(0);
        let id = add_and_fill(&updater, Point3::new(0, -1, 0));
        assert!(!updater.is_drained());

        assert!(updater.fill_next());
        assert!(updater.populate_next());
        assert!(updater.build_next());
        assert!(updater.is_drained());
        assert_eq!(updater.pending_uploads(), 1);

        let mut store = MeshStore::new();
        assert_eq!(updater.upload_all(&mut store), 1);
        let chunk = updater.world().get(id);
        assert_eq!(store.mesh(id).unwrap().draw_count, chunk.get().draw_count());

        let stats = updater.stats();
        assert_eq!((stats.filled, stats.populated, stats.built, stats.uploaded), (1, 1, 1, 1));
        assert_eq!(stats.requeued, 0);
    }

    #[test]
    fn empty_queues_make_no_progress() {
        let updater = updater(0);
        assert!(!updater.fill_next());
        assert!(!updater.populate_next());
        assert!(!updater.build_next());
        assert_eq!(updater.upload_all(&mut MeshStore::new()), 0);
    }

    #[test]
    fn populate_waits_until_neighbours_are_filled() {
        let updater = updater(0);
        let first = add_and_fill(&updater, Point3::new(0, -1, 0));
        updater.world().add(Point3::new(1, -1, 0));

        assert!(updater.fill_next());
        assert!(!updater.populate_next());
        assert_eq!(updater.stats().requeued, 1);
        assert_eq!(updater.pending(Stage::Populate), 1);

        updater.enqueue_fill(ChunkId::from_coords(Point3::new(1, -1, 0)));
        assert!(updater.fill_next());

        // both chunks now count each other as filled
        let chunk = updater.world().get(first);
        assert!(chunk.get().neighbors_filled());
        assert!(updater.populate_next());
        assert_eq!(updater.stats().populated, 1);
    }

    #[test]
    fn build_waits_until_neighbours_are_populated() {
        let updater = updater(0);
        add_and_fill(&updater, Point3::new(0, -1, 0));
        add_and_fill(&updater, Point3::new(0, -2, 0));
        assert!(updater.fill_next());
        assert!(updater.fill_next());

        // (0,-1,0) is populated and queued for build, its neighbour isn't yet
        assert!(updater.populate_next());
        assert!(!updater.build_next());
        assert!(updater.populate_next());
        while !updater.is_drained() {
            updater.build_next();
        }
        assert_eq!(updater.stats().built, 2);
    }

    fn run_until_drained(updater: &ChunkUpdater) {
        for _ in 0..100 {
            if updater.is_drained() {
                return;
            }
            updater.fill_next();
            updater.populate_next();
            updater.build_next();
        }
        panic!("updater did not drain: {:?}", updater.stats());
    }

    #[test]
    fn chunk_loaded_next_to_a_finished_one_links_both_ways() {
        let updater = updater(0);
        let first = add_and_fill(&updater, Point3::new(0, -1, 0));
        run_until_drained(&updater);
        assert_eq!(updater.stats().built, 1);

        let second = add_and_fill(&updater, Point3::new(1, -1, 0));
        assert!(updater.fill_next());

        // the finished chunk now waits for the new one before rebuilding
        let old = updater.world().get(first);
        assert_eq!(old.get().neighbor_count.load(Ordering::Acquire), 1);
        assert!(old.get().neighbors_filled());
        assert!(!old.get().neighbors_populated());
        assert_eq!(updater.pending(Stage::Build), 1);

        let new = updater.world().get(second);
        assert!(new.get().neighbors_filled());
        assert!(new.get().neighbors_populated());

        run_until_drained(&updater);
        let stats = updater.stats();
        assert_eq!((stats.filled, stats.populated, stats.built), (2, 2, 3));
        assert!(old.get().neighbors_populated());
    }

    #[test]
    fn neighbours_loaded_together_are_counted_once() {
        let updater = updater(0);
        let first = add_and_fill(&updater, Point3::new(0, -1, 0));
        add_and_fill(&updater, Point3::new(0, -1, 1));
        run_until_drained(&updater);

        let chunk = updater.world().get(first);
        let chunk = chunk.get();
        assert_eq!(chunk.neighbor_count.load(Ordering::Acquire), 1);
        assert_eq!(chunk.filled_neighbor_count.load(Ordering::Acquire), 1);
        assert_eq!(chunk.populated_neighbor_count.load(Ordering::Acquire), 1);
        assert_eq!(updater.stats().built, 2);
    }

    #[test]
    fn released_chunks_are_dropped_by_every_stage() {
        let updater = updater(3);

        let id = add_and_fill(&updater, Point3::new(0, -1, 0));
        let chunk = updater.world().get(id);
        chunk.get_mut().release();
        assert!(updater.fill_next());
        assert_eq!(updater.pending(Stage::Populate), 0);
        assert!(updater.enqueue_build(id));
        assert!(updater.build_next());
        assert_eq!(updater.pending_uploads(), 0);

        let id = add_and_fill(&updater, Point3::new(5, -1, 0));
        assert!(updater.fill_next());
        updater.world().get(id).get_mut().release();
        assert!(updater.populate_next());

        assert!(updater.is_drained());
        let stats = updater.stats();
        assert_eq!((stats.filled, stats.populated, stats.built), (1, 0, 0));
    }

    #[test]
    fn stalled_chunk_is_reported_once() {
        let updater = updater(3);
        add_and_fill(&updater, Point3::new(0, -1, 0));
        // a neighbour that is never filled
        updater.world().add(Point3::new(0, 0, 0));
        assert!(updater.fill_next());

        for _ in 0..10 {
            assert!(!updater.populate_next());
        }
        let stats = updater.stats();
        assert_eq!(stats.requeued, 10);
        assert_eq!(stats.stalled, 1);
        assert!(!updater.is_drained());
    }

    #[test]
    fn edits_requeue_only_the_touched_neighbours() {
        let count = |local: Point3<usize>| {
            let updater = updater(0);
            for z in -1..=1 {
                for y in -1..=1 {
                    for x in -1..=1 {
                        updater.world().add(Point3::new(x, y, z));
                    }
                }
            }
            let queued = updater.rebuild_neighbor_chunks(Point3::new(0, 0, 0), local);
            assert_eq!(updater.pending(Stage::Build), queued);
            queued
        };

        assert_eq!(count(Point3::new(5, 5, 5)), 0);
        assert_eq!(count(Point3::new(0, 5, 5)), 1);
        assert_eq!(count(Point3::new(15, 15, 5)), 3);
        assert_eq!(count(Point3::new(0, 15, 0)), 7);
    }

    #[test]
    fn edits_skip_missing_neighbours() {
        let updater = updater(0);
        updater.world().add(Point3::new(0, 0, 0));
        updater.world().add(Point3::new(-1, 0, 0));
        assert_eq!(
            updater.rebuild_neighbor_chunks(Point3::new(0, 0, 0), Point3::new(0, 0, 0)),
            1
        );
    }

    #[test]
    fn rebuilds_of_a_waiting_chunk_are_merged() {
        let updater = updater(0);
        let id = ChunkId::from_coords(Point3::new(0, 0, 0));
        updater.world().add(Point3::new(0, 0, 0));
        assert!(updater.enqueue_build(id));
        assert!(!updater.enqueue_build(id));
        assert!(updater.build_next());
        assert!(updater.is_drained());
    }
}
