//! The future-producing background thread.
//!
//! The `orrery-producer` thread owns the burn schedule, the last K
//! snapshots it produced, and a pre-buffer capped by its capacity.
//! Each block of M snapshots is computed on a short-lived `orrery-block`
//! thread while the producer moves the previous block into the bounded
//! output queue. No locks: the queue is a crossbeam channel, everything
//! else shared with the controller is atomic.
//!
//! ```text
//! orrery-producer                          orrery-block (one at a time)
//!     | Seeding: compute block 0 inline
//!     | spawn block 1 -------------------->  compute_block(history, burns)
//!     | loop:                                   |
//!     |   block finished && room? <-- join ----|
//!     |     harvest into pre-buffer
//!     |     spawn next block -------------->
//!     |   pre-buffer -> try_send(queue)
//!     |   pre-buffer and queue full? park(pause)
//!     |   no progress?     park(idle)
//!     | Draining: join in-flight block
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use orrery_core::{Predictor, PredictorError, Snapshot, TimeStep};
use orrery_physics::{BurnBlock, BurnSchedule, PhysicsStepper};

use crate::block::{compute_block, BlockOutput};
use crate::config::{BackpressureConfig, ConfigError, PredictorPolicy, QueueConfig};
use crate::metrics::{EngineMetrics, ProducerCounters};

// ── ProducerPhase ────────────────────────────────────────────────

/// Lifecycle of the producer thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum ProducerPhase {
    /// Computing the first block.
    Seeding = 0,
    /// Producing blocks and feeding the output queue.
    Running = 1,
    /// Shutdown requested; waiting for the in-flight block.
    Draining = 2,
    /// The thread has exited.
    Terminated = 3,
}

impl ProducerPhase {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Seeding,
            1 => Self::Running,
            2 => Self::Draining,
            _ => Self::Terminated,
        }
    }
}

// ── ProducerReport ───────────────────────────────────────────────

/// Returned by the producer thread when it exits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProducerReport {
    /// Blocks harvested, including the seed block.
    pub blocks_computed: u64,
    /// Snapshots moved into the output queue.
    pub snapshots_published: u64,
    /// Blocks recomputed with physics after a predictor failure.
    pub predictor_fallbacks: u64,
    /// Pauses taken with a full pre-buffer and a full queue.
    pub backpressure_pauses: u64,
    /// Last timestep computed.
    pub last_computed: TimeStep,
    /// Snapshots still in the pre-buffer at exit.
    pub unpublished: usize,
    /// Whether the predictor was still in use at exit.
    pub predictor_active: bool,
}

// ── ProducerParams ───────────────────────────────────────────────

/// Everything the producer thread takes ownership of.
pub struct ProducerParams {
    /// Shared physics.
    pub stepper: Arc<PhysicsStepper>,
    /// Optional satellite model.
    pub predictor: Option<Arc<dyn Predictor>>,
    /// Reaction to predictor failure.
    pub policy: PredictorPolicy,
    /// Burns not yet applied. The producer consumes it block by block.
    pub schedule: BurnSchedule,
    /// The most recent snapshots, oldest first. The first block starts
    /// right after the last one; its length is the history handed to
    /// every block.
    pub history: Vec<Arc<Snapshot>>,
    /// Snapshots per block.
    pub block_len: usize,
    /// Queue and pre-buffer sizing.
    pub queue: QueueConfig,
    /// Park durations.
    pub backpressure: BackpressureConfig,
}

// ── FutureProducer ───────────────────────────────────────────────

/// Handle to the running producer thread.
///
/// Dropping the handle shuts the thread down.
pub struct FutureProducer {
    output: Receiver<Arc<Snapshot>>,
    capacity: usize,
    shutdown_flag: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
    counters: Arc<ProducerCounters>,
    thread: Option<JoinHandle<ProducerReport>>,
    report: Option<ProducerReport>,
}

impl FutureProducer {
    /// Spawn the producer thread.
    ///
    /// # Panics
    ///
    /// Panics if `params.history` is empty or `params.block_len` is zero.
    pub fn spawn(params: ProducerParams) -> Result<Self, ConfigError> {
        assert!(!params.history.is_empty(), "producer needs history");
        assert!(params.block_len > 0, "producer needs a non-empty block");

        let capacity = params.queue.output_capacity;
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let phase = Arc::new(AtomicU8::new(ProducerPhase::Seeding as u8));
        let counters = Arc::new(ProducerCounters::default());

        let state = ProducerState::new(
            params,
            tx,
            Arc::clone(&shutdown_flag),
            Arc::clone(&phase),
            Arc::clone(&counters),
        );
        let thread = thread::Builder::new()
            .name("orrery-producer".into())
            .spawn(move || state.run())
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("orrery-producer: {e}"),
            })?;

        Ok(Self {
            output: rx,
            capacity,
            shutdown_flag,
            phase,
            counters,
            thread: Some(thread),
            report: None,
        })
    }

    /// The output queue, in timestep order.
    pub fn output(&self) -> &Receiver<Arc<Snapshot>> {
        &self.output
    }

    /// Snapshots waiting in the output queue.
    pub fn queue_len(&self) -> usize {
        self.output.len()
    }

    /// Capacity of the output queue.
    pub fn queue_capacity(&self) -> usize {
        self.capacity
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> ProducerPhase {
        ProducerPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    /// Whether the producer thread has exited (or was never joined back).
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Copy the producer's counters into `metrics`.
    pub fn fill_metrics(&self, metrics: &mut EngineMetrics) {
        self.counters.fill(metrics);
    }

    /// Stop the thread and collect its report.
    ///
    /// Sets the shutdown flag, wakes the thread, drains the output queue
    /// without blocking, and joins. The in-flight block is always joined
    /// to completion by the producer before it exits. Returns `None` if
    /// the thread panicked. Idempotent.
    pub fn shutdown(&mut self) -> Option<ProducerReport> {
        if let Some(handle) = self.thread.take() {
            self.shutdown_flag.store(true, Ordering::Release);
            handle.thread().unpark();
            let mut drained = self.output.try_iter().count();
            match handle.join() {
                Ok(report) => {
                    log::info!(
                        "producer stopped at timestep {} after {} blocks ({} fallbacks)",
                        report.last_computed,
                        report.blocks_computed,
                        report.predictor_fallbacks
                    );
                    self.report = Some(report);
                }
                Err(_) => log::error!("producer thread panicked"),
            }
            drained += self.output.try_iter().count();
            log::debug!("drained {drained} queued snapshots at shutdown");
        }
        self.report.clone()
    }
}

impl Drop for FutureProducer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for FutureProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FutureProducer")
            .field("phase", &self.phase())
            .field("queue_len", &self.queue_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

// ── Producer thread ──────────────────────────────────────────────

/// A block being computed, or one computed inline because its thread
/// could not be spawned.
enum PendingBlock {
    Running {
        handle: JoinHandle<BlockOutput>,
        history: Vec<Arc<Snapshot>>,
        burns: BurnBlock,
    },
    Ready(BlockOutput),
}

impl PendingBlock {
    fn is_finished(&self) -> bool {
        match self {
            Self::Running { handle, .. } => handle.is_finished(),
            Self::Ready(_) => true,
        }
    }
}

/// State owned by the producer thread's main loop.
struct ProducerState {
    stepper: Arc<PhysicsStepper>,
    predictor: Option<Arc<dyn Predictor>>,
    policy: PredictorPolicy,
    schedule: BurnSchedule,
    history: Vec<Arc<Snapshot>>,
    history_len: usize,
    block_len: usize,
    next_start: TimeStep,
    pre_buffer: VecDeque<Arc<Snapshot>>,
    pre_buffer_capacity: usize,
    pending: Option<PendingBlock>,
    output: Sender<Arc<Snapshot>>,
    shutdown_flag: Arc<AtomicBool>,
    phase: Arc<AtomicU8>,
    counters: Arc<ProducerCounters>,
    pause: Duration,
    idle_park: Duration,
}

impl ProducerState {
    fn new(
        params: ProducerParams,
        output: Sender<Arc<Snapshot>>,
        shutdown_flag: Arc<AtomicBool>,
        phase: Arc<AtomicU8>,
        counters: Arc<ProducerCounters>,
    ) -> Self {
        let next_start = params
            .history
            .last()
            .map_or(TimeStep::FIRST, |s| s.timestep.next());
        Self {
            stepper: params.stepper,
            predictor: params.predictor,
            policy: params.policy,
            schedule: params.schedule,
            history_len: params.history.len(),
            history: params.history,
            block_len: params.block_len,
            next_start,
            pre_buffer: VecDeque::new(),
            pre_buffer_capacity: params.queue.pre_buffer_capacity,
            pending: None,
            output,
            shutdown_flag,
            phase,
            counters,
            pause: params.backpressure.pause(),
            idle_park: params.backpressure.idle_park(),
        }
    }

    fn set_phase(&self, phase: ProducerPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Main loop. Runs until the shutdown flag is set or the consumer
    /// side of the queue disappears.
    fn run(mut self) -> ProducerReport {
        // Seeding: first block inline, then start the second.
        let burns = self.schedule.take_block(self.next_start, self.block_len);
        let seed = compute_block(
            &self.stepper,
            self.predictor.as_deref(),
            &self.history,
            &burns,
        );
        self.harvest(seed);
        self.launch_next();
        self.set_phase(ProducerPhase::Running);
        log::info!(
            "producer running from timestep {} in blocks of {}",
            self.next_start,
            self.block_len
        );

        while !self.shutdown_flag.load(Ordering::Acquire) {
            let mut progressed = false;

            // 1. Harvest a finished block if the pre-buffer has room.
            if self.pre_buffer.len() < self.pre_buffer_capacity
                && self.pending.as_ref().is_some_and(PendingBlock::is_finished)
            {
                if let Some(block) = self.join_pending() {
                    self.harvest(block);
                }
                self.launch_next();
                progressed = true;
            }

            // 2. Feed the output queue in order.
            match self.publish() {
                Some(moved) => progressed |= moved > 0,
                None => {
                    log::debug!("output queue disconnected; producer exiting");
                    break;
                }
            }

            // 3. Back off. Nothing can move until the consumer drains the
            // queue.
            if self.pre_buffer.len() >= self.pre_buffer_capacity && self.output.is_full() {
                ProducerCounters::bump(&self.counters.backpressure_pauses);
                thread::park_timeout(self.pause);
            } else if !progressed {
                thread::park_timeout(self.idle_park);
            }
        }

        // Draining: never abandon a block mid-computation.
        self.set_phase(ProducerPhase::Draining);
        drop(self.join_pending());
        self.set_phase(ProducerPhase::Terminated);
        self.report()
    }

    /// Spawn the block following the current history.
    fn launch_next(&mut self) {
        let burns = self.schedule.take_block(self.next_start, self.block_len);
        let history = self.history.clone();
        let stepper = Arc::clone(&self.stepper);
        let predictor = self.predictor.clone();
        let (thread_history, thread_burns) = (history.clone(), burns.clone());
        let spawned = thread::Builder::new()
            .name("orrery-block".into())
            .spawn(move || {
                compute_block(
                    &stepper,
                    predictor.as_deref(),
                    &thread_history,
                    &thread_burns,
                )
            });
        self.pending = Some(match spawned {
            Ok(handle) => PendingBlock::Running {
                handle,
                history,
                burns,
            },
            Err(e) => {
                log::warn!("could not spawn block thread ({e}); computing inline");
                PendingBlock::Ready(compute_block(
                    &self.stepper,
                    self.predictor.as_deref(),
                    &history,
                    &burns,
                ))
            }
        });
    }

    /// Wait for the pending block. A panicked block thread is replaced by
    /// a physics-only recomputation.
    fn join_pending(&mut self) -> Option<BlockOutput> {
        match self.pending.take()? {
            PendingBlock::Ready(block) => Some(block),
            PendingBlock::Running {
                handle,
                history,
                burns,
            } => match handle.join() {
                Ok(block) => Some(block),
                Err(_) => {
                    log::error!("block thread panicked; recomputing block with physics");
                    let mut block = compute_block(&self.stepper, None, &history, &burns);
                    block.fallback = Some(PredictorError::InferenceFailed {
                        reason: "block thread panicked".into(),
                    });
                    Some(block)
                }
            },
        }
    }

    /// Move a finished block into the pre-buffer and roll the history.
    fn harvest(&mut self, block: BlockOutput) {
        if let Some(err) = block.fallback {
            ProducerCounters::bump(&self.counters.predictor_fallbacks);
            match self.policy {
                PredictorPolicy::DisableOnFailure => {
                    if let Some(predictor) = self.predictor.take() {
                        log::warn!(
                            "predictor '{}' failed at timestep {} ({err}); physics only from now on",
                            predictor.name(),
                            self.next_start
                        );
                    }
                }
                PredictorPolicy::RetryEachBlock => log::warn!(
                    "predictor failed at timestep {} ({err}); block recomputed with physics",
                    self.next_start
                ),
            }
        }

        let Some(last) = block.snapshots.last().map(|s| s.timestep) else {
            return;
        };
        log::debug!("harvested block {}..={last}", self.next_start);
        ProducerCounters::bump(&self.counters.blocks_computed);

        for snap in block.snapshots {
            let snap = Arc::new(snap);
            self.history.push(Arc::clone(&snap));
            self.pre_buffer.push_back(snap);
        }
        let excess = self.history.len().saturating_sub(self.history_len);
        self.history.drain(..excess);
        self.next_start = last.next();
    }

    /// Move snapshots from the pre-buffer into the output queue until it
    /// is full. Returns `None` if the receiver is gone.
    fn publish(&mut self) -> Option<usize> {
        let mut moved = 0;
        while let Some(front) = self.pre_buffer.front() {
            match self.output.try_send(Arc::clone(front)) {
                Ok(()) => {
                    self.pre_buffer.pop_front();
                    ProducerCounters::bump(&self.counters.snapshots_published);
                    moved += 1;
                }
                Err(TrySendError::Full(_)) => break,
                Err(TrySendError::Disconnected(_)) => return None,
            }
        }
        Some(moved)
    }

    fn report(&self) -> ProducerReport {
        let mut m = EngineMetrics::default();
        self.counters.fill(&mut m);
        ProducerReport {
            blocks_computed: m.blocks_computed,
            snapshots_published: m.snapshots_published,
            predictor_fallbacks: m.predictor_fallbacks,
            backpressure_pauses: m.backpressure_pauses,
            last_computed: self.next_start.rewind(1),
            unpublished: self.pre_buffer.len(),
            predictor_active: self.predictor.is_some(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::{BurnManeuver, DVec3, SatelliteIndex, DEFAULT_DT};
    use orrery_test_utils::{
        sun_earth_satellite, sun_earth_satellite_with_burns, CoastPredictor, FailingPredictor,
    };
    use std::time::Instant;

    fn params(system: orrery_core::SystemConfig, queue: QueueConfig) -> ProducerParams {
        let stepper = Arc::new(PhysicsStepper::new(
            system.masses(),
            system.layout(),
            DEFAULT_DT,
        ));
        let mut history = vec![Arc::new(system.initial_snapshot())];
        for _ in 0..3 {
            let next = stepper.step(history.last().unwrap(), &[]);
            history.push(Arc::new(next));
        }
        ProducerParams {
            stepper,
            predictor: None,
            policy: PredictorPolicy::default(),
            schedule: BurnSchedule::new(system.maneuvers()),
            history,
            block_len: 10,
            queue,
            backpressure: BackpressureConfig::default(),
        }
    }

    fn small_queue() -> QueueConfig {
        QueueConfig {
            output_capacity: 16,
            pre_buffer_capacity: 64,
            low_water_mark: 4,
        }
    }

    fn recv(p: &FutureProducer) -> Arc<Snapshot> {
        p.output()
            .recv_timeout(Duration::from_secs(2))
            .expect("producer should publish")
    }

    #[test]
    fn publishes_in_timestep_order() {
        let mut producer = FutureProducer::spawn(params(sun_earth_satellite(), small_queue())).unwrap();
        for expected in 5..105 {
            assert_eq!(recv(&producer).timestep, TimeStep(expected));
        }
        let report = producer.shutdown().unwrap();
        assert!(report.blocks_computed >= 10);
        assert!(report.snapshots_published >= 100);
        assert_eq!(producer.phase(), ProducerPhase::Terminated);
    }

    #[test]
    fn queue_never_exceeds_capacity() {
        let mut producer = FutureProducer::spawn(params(sun_earth_satellite(), small_queue())).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while producer.queue_len() < 16 && Instant::now() < deadline {
            thread::yield_now();
        }
        for _ in 0..50 {
            assert!(producer.queue_len() <= producer.queue_capacity());
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(producer.queue_len(), 16);
        producer.shutdown();
    }

    #[test]
    fn pre_buffer_stops_growing() {
        let mut producer = FutureProducer::spawn(params(sun_earth_satellite(), small_queue())).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while producer.phase() != ProducerPhase::Running && Instant::now() < deadline {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(100));
        let report = producer.shutdown().unwrap();
        // Harvesting stops once the pre-buffer reaches capacity, so it can
        // exceed it by at most one block.
        assert!(report.unpublished <= 64 + 10, "unpublished {}", report.unpublished);
        assert!(report.last_computed.0 <= 4 + 16 + 64 + 10 + 10);
    }

    #[test]
    fn pauses_when_consumer_stops_draining() {
        let queue = QueueConfig {
            output_capacity: 4,
            pre_buffer_capacity: 20,
            low_water_mark: 1,
        };
        let mut producer = FutureProducer::spawn(params(sun_earth_satellite(), queue)).unwrap();
        let mut metrics = EngineMetrics::default();
        let deadline = Instant::now() + Duration::from_secs(2);
        while metrics.backpressure_pauses == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
            producer.fill_metrics(&mut metrics);
        }
        assert!(metrics.backpressure_pauses > 0);
        assert_eq!(producer.queue_len(), 4);

        // Draining the queue lets the producer resume.
        for expected in 5..40 {
            assert_eq!(recv(&producer).timestep, TimeStep(expected));
        }
        let report = producer.shutdown().unwrap();
        assert!(report.unpublished <= 20 + 10);
    }

    #[test]
    fn burns_are_applied_once() {
        let system = sun_earth_satellite_with_burns(vec![BurnManeuver::new(
            12u64,
            DVec3::new(5.0, 0.0, 0.0),
        )]);
        let mut producer = FutureProducer::spawn(params(system, small_queue())).unwrap();
        let mut fired = Vec::new();
        for _ in 0..30 {
            let snap = recv(&producer);
            if snap.burn_fired(SatelliteIndex(0)) {
                fired.push(snap.timestep);
            }
        }
        assert_eq!(fired, vec![TimeStep(12)]);
        producer.shutdown();
    }

    #[test]
    fn failing_predictor_is_disabled_after_first_block() {
        let mut p = params(sun_earth_satellite(), small_queue());
        p.predictor = Some(Arc::new(FailingPredictor));
        let mut producer = FutureProducer::spawn(p).unwrap();
        for _ in 0..40 {
            assert!(recv(&producer).is_finite());
        }
        let report = producer.shutdown().unwrap();
        assert_eq!(report.predictor_fallbacks, 1);
        assert!(!report.predictor_active);
    }

    #[test]
    fn retry_policy_keeps_trying() {
        let mut p = params(sun_earth_satellite(), small_queue());
        p.predictor = Some(Arc::new(FailingPredictor));
        p.policy = PredictorPolicy::RetryEachBlock;
        let mut producer = FutureProducer::spawn(p).unwrap();
        for _ in 0..40 {
            recv(&producer);
        }
        let report = producer.shutdown().unwrap();
        assert!(report.predictor_fallbacks >= 4);
        assert!(report.predictor_active);
    }

    #[test]
    fn working_predictor_stays_active() {
        let mut p = params(sun_earth_satellite(), small_queue());
        p.predictor = Some(Arc::new(CoastPredictor::new(DEFAULT_DT)));
        let mut producer = FutureProducer::spawn(p).unwrap();
        for expected in 5..45 {
            assert_eq!(recv(&producer).timestep, TimeStep(expected));
        }
        let report = producer.shutdown().unwrap();
        assert_eq!(report.predictor_fallbacks, 0);
        assert!(report.predictor_active);
    }

    #[test]
    fn shutdown_is_idempotent() {
        let mut producer = FutureProducer::spawn(params(sun_earth_satellite(), small_queue())).unwrap();
        let first = producer.shutdown();
        let second = producer.shutdown();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(producer.is_finished());
    }

    #[test]
    fn phase_round_trips_through_u8() {
        for phase in [
            ProducerPhase::Seeding,
            ProducerPhase::Running,
            ProducerPhase::Draining,
            ProducerPhase::Terminated,
        ] {
            assert_eq!(ProducerPhase::from_u8(phase as u8), phase);
        }
    }
}
