//! Engine counters.
//!
//! The producer thread updates [`ProducerCounters`] atomically; the
//! controller keeps its own counters and merges both into an
//! [`EngineMetrics`] value on request.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cumulative counters for one engine run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    /// Blocks harvested by the producer.
    pub blocks_computed: u64,
    /// Snapshots moved from the pre-buffer to the output queue.
    pub snapshots_published: u64,
    /// Blocks recomputed with physics after the predictor failed.
    pub predictor_fallbacks: u64,
    /// Producer pauses because the pre-buffer and the output queue were full.
    pub backpressure_pauses: u64,
    /// Flushes of cache contents into the archive.
    pub cache_flushes: u64,
    /// Cache reloads from the archive.
    pub archive_reloads: u64,
    /// Frontier steps taken while fast-forwarding.
    pub fast_forward_steps: u64,
    /// `next_state()` calls that found the output queue empty.
    pub queue_empty_waits: u64,
}

/// Producer-side counters shared with the controller.
#[derive(Debug, Default)]
pub(crate) struct ProducerCounters {
    pub blocks_computed: AtomicU64,
    pub snapshots_published: AtomicU64,
    pub predictor_fallbacks: AtomicU64,
    pub backpressure_pauses: AtomicU64,
}

impl ProducerCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the producer counters into `metrics`.
    pub fn fill(&self, metrics: &mut EngineMetrics) {
        metrics.blocks_computed = self.blocks_computed.load(Ordering::Relaxed);
        metrics.snapshots_published = self.snapshots_published.load(Ordering::Relaxed);
        metrics.predictor_fallbacks = self.predictor_fallbacks.load(Ordering::Relaxed);
        metrics.backpressure_pauses = self.backpressure_pauses.load(Ordering::Relaxed);
    }
}
