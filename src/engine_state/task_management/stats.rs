//! Progress counters for the chunk pipeline.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counters bumped by the stage workers, readable from any thread while they run.
#[derive(Debug, Default)]
pub struct PipelineStats {
    filled: AtomicUsize,
    populated: AtomicUsize,
    built: AtomicUsize,
    uploaded: AtomicUsize,
    requeued: AtomicUsize,
    stalled: AtomicUsize,
}

/// A plain copy of [`PipelineStats`] at one moment.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub filled: usize,
    pub populated: usize,
    pub built: usize,
    pub uploaded: usize,
    /// Times a chunk was pushed back because its neighbours weren't ready.
    pub requeued: usize,
    /// Chunks that went past the stall threshold. Each is counted once.
    pub stalled: usize,
}

impl PipelineStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            filled: self.filled.load(Ordering::Relaxed),
            populated: self.populated.load(Ordering::Relaxed),
            built: self.built.load(Ordering::Relaxed),
            uploaded: self.uploaded.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            stalled: self.stalled.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_fill(&self) {
        self.filled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_populate(&self) {
        self.populated.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_build(&self) {
        self.built.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_upload(&self) {
        self.uploaded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_requeue(&self) {
        self.requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_stall(&self) {
        self.stalled.fetch_add(1, Ordering::Relaxed);
    }
}
