//! User-facing [`TimeController`] and its shutdown sequence.
//!
//! The controller is the only component the consumer talks to. It owns
//! the cache and the archive, and holds the receiving end of the
//! producer's queue. Every `next_state()` falls into one of three cases:
//!
//! - **A, at the frontier**: pull the next snapshot from the queue,
//!   flushing the cache to the archive first when it is full.
//! - **B, rewound inside the cache window**: serve from memory.
//! - **C, rewound outside the window**: flush, reload the cache around
//!   the requested timestep from the archive, then serve.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use orrery_archive::{system_hash, Archive, ArchiveError};
use orrery_core::{CacheError, Snapshot, SystemError, SystemLayout, TimeStep};
use orrery_physics::{BurnSchedule, PhysicsStepper};

use crate::cache::StateCache;
use crate::config::{ArchiveLocation, ConfigError, EngineConfig};
use crate::metrics::EngineMetrics;
use crate::producer::{FutureProducer, ProducerParams, ProducerPhase, ProducerReport};
use crate::seek::{percent_done, CancellationToken, SeekOutcome, SeekProgress};

// ── Error types ──────────────────────────────────────────────────

/// Errors returned by [`TimeController`].
#[derive(Debug)]
pub enum EngineError {
    /// Configuration was rejected or a thread could not start.
    Config(ConfigError),
    /// Archive I/O or format failure.
    Archive(ArchiveError),
    /// A cache lookup failed.
    Cache(CacheError),
    /// The producer thread is gone and the queue is empty.
    ProducerDisconnected,
    /// The queue stayed empty for the whole receive timeout.
    QueueTimeout {
        /// How long `next_state()` waited.
        waited: Duration,
    },
    /// The producer published nothing before the startup timeout.
    StartupTimeout {
        /// How long startup waited.
        waited: Duration,
    },
    /// The controller has been shut down.
    ShutDown,
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Archive(e) => write!(f, "archive: {e}"),
            Self::Cache(e) => write!(f, "cache: {e}"),
            Self::ProducerDisconnected => write!(f, "producer thread disconnected"),
            Self::QueueTimeout { waited } => {
                write!(f, "no snapshot produced within {waited:?}")
            }
            Self::StartupTimeout { waited } => {
                write!(f, "producer published nothing within {waited:?} of startup")
            }
            Self::ShutDown => write!(f, "time controller has shut down"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Archive(e) => Some(e),
            Self::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SystemError> for EngineError {
    fn from(e: SystemError) -> Self {
        Self::Config(ConfigError::System(e))
    }
}

impl From<ArchiveError> for EngineError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

impl From<CacheError> for EngineError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

// ── StateFrame ───────────────────────────────────────────────────

/// One served snapshot.
#[derive(Clone, Debug)]
pub struct StateFrame {
    /// The snapshot.
    pub snapshot: Arc<Snapshot>,
    /// The producer is falling behind; the consumer should request frames
    /// more slowly. Only ever set at the frontier.
    pub slow_down: bool,
}

// ── ControllerState / ShutdownReport ─────────────────────────────

/// Lifecycle of a [`TimeController`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// Seeding history and measuring the frame rate.
    Initializing,
    /// Serving frames.
    Steady,
    /// Fast-forwarding inside [`TimeController::seek`].
    Seeking,
    /// Shut down; every call fails with [`EngineError::ShutDown`].
    Terminated,
}

/// Report from [`TimeController::shutdown`].
#[derive(Debug)]
pub struct ShutdownReport {
    /// Total time spent shutting down.
    pub total_ms: u64,
    /// Time spent stopping and joining the producer.
    pub drain_ms: u64,
    /// Whether the producer thread was joined cleanly.
    pub producer_joined: bool,
    /// The producer's own report, if it was joined cleanly.
    pub producer: Option<ProducerReport>,
    /// Snapshots written to the archive by the final flush.
    pub archived_on_shutdown: usize,
    /// Highest archived timestep after the final flush.
    pub archived_through: TimeStep,
}

// ── TimeController ───────────────────────────────────────────────

/// Serves snapshots in order and lets the consumer move through time.
///
/// `current` is the timestep of the most recently served snapshot;
/// [`current_time_step`](Self::current_time_step) reports the one the next
/// [`next_state`](Self::next_state) will serve. Timesteps `1..=K` are the
/// seeded history; the first served timestep is `K + 1`.
///
/// # Examples
///
/// ```no_run
/// use orrery_core::{BodyConfig, DVec3, SystemConfig, TimeStep};
/// use orrery_engine::{EngineConfig, TimeController};
///
/// let sun = BodyConfig {
///     name: "sun".into(),
///     mass: 1.989e30,
///     position: DVec3::ZERO,
///     velocity: DVec3::ZERO,
/// };
/// let system = SystemConfig { planets: vec![sun], satellites: vec![] };
/// let mut engine = TimeController::new(EngineConfig::new(system)).unwrap();
///
/// let frame = engine.next_state().unwrap();
/// assert_eq!(frame.snapshot.timestep, TimeStep(5));
/// engine.set_time_step(TimeStep(500)).unwrap();
/// assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(500));
/// ```
pub struct TimeController {
    cache: StateCache,
    archive: Archive,
    producer: FutureProducer,
    names: Vec<String>,
    layout: SystemLayout,
    dt: f64,
    history_len: usize,
    low_water_mark: usize,
    recv_timeout: Duration,
    current: TimeStep,
    furthest: TimeStep,
    max_fps: f64,
    state: ControllerState,
    metrics: EngineMetrics,
}

impl TimeController {
    /// Validate `config`, seed the history, start the producer, and
    /// measure the achievable frame rate.
    ///
    /// Blocks until the output queue first fills (or `startup_timeout`
    /// elapses with at least one snapshot queued).
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let system = &config.system;
        let layout = system.layout();
        let names = system.registry()?.names();
        let masses = system.masses();
        let k = config.history_len;
        let stepper = Arc::new(PhysicsStepper::new(masses.clone(), layout, config.dt));

        let hash = system_hash(&names, &masses, config.dt);
        let archive = match &config.archive {
            ArchiveLocation::InMemory => Archive::in_memory(layout, hash)?,
            ArchiveLocation::Directory(dir) => Archive::create(dir, layout, hash)?,
        };

        // Timestep 1 is the configuration; 2..=K are stepped here so the
        // producer starts with a full history.
        let mut schedule = BurnSchedule::new(system.maneuvers());
        let seed_burns = schedule.take_block(TimeStep(2), k - 1);
        let mut cache = StateCache::new(config.cache_capacity, layout);
        let mut prev = Arc::new(system.initial_snapshot());
        cache.push(Arc::clone(&prev));
        for _ in 1..k {
            let next = Arc::new(stepper.step(&prev, seed_burns.at(prev.timestep.next())));
            cache.push(Arc::clone(&next));
            prev = next;
        }
        let furthest = prev.timestep;

        let started = Instant::now();
        let producer = FutureProducer::spawn(ProducerParams {
            stepper,
            predictor: config.predictor.clone(),
            policy: config.predictor_policy,
            schedule,
            history: cache.tail(k)?,
            block_len: config.block_len,
            queue: config.queue.clone(),
            backpressure: config.backpressure.clone(),
        })?;

        let mut controller = Self {
            cache,
            archive,
            producer,
            names,
            layout,
            dt: config.dt,
            history_len: k,
            low_water_mark: config.queue.low_water_mark,
            recv_timeout: config.recv_timeout,
            current: furthest,
            furthest,
            max_fps: config.max_fps_cap,
            state: ControllerState::Initializing,
            metrics: EngineMetrics::default(),
        };
        controller.max_fps =
            controller.measure_max_fps(started, config.startup_timeout, config.max_fps_cap)?;
        controller.state = ControllerState::Steady;

        log::info!(
            "engine started: {} planets, {} satellites, K={k}, M={}, dt={}s, max_fps={:.1}, predictor={}",
            layout.planets,
            layout.satellites,
            config.block_len,
            config.dt,
            controller.max_fps,
            config.predictor.as_ref().map_or("none", |p| p.name()),
        );
        Ok(controller)
    }

    /// Queue capacity divided by the time the producer took to fill it.
    fn measure_max_fps(
        &self,
        started: Instant,
        timeout: Duration,
        cap: f64,
    ) -> Result<f64, EngineError> {
        let capacity = self.producer.queue_capacity();
        let deadline = started + timeout;
        loop {
            let queued = self.producer.queue_len();
            if queued >= capacity {
                break;
            }
            if self.producer.is_finished() {
                return Err(EngineError::ProducerDisconnected);
            }
            if Instant::now() >= deadline {
                if queued == 0 {
                    return Err(EngineError::StartupTimeout { waited: timeout });
                }
                log::warn!(
                    "output queue held {queued}/{capacity} snapshots after {timeout:?}; \
                     estimating frame rate from a partial fill"
                );
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        let filled = self.producer.queue_len().min(capacity) as f64;
        let secs = started.elapsed().as_secs_f64();
        let fps = if secs > 0.0 { filled / secs } else { cap };
        Ok(fps.min(cap))
    }

    fn ensure_running(&self) -> Result<(), EngineError> {
        if self.state == ControllerState::Terminated {
            return Err(EngineError::ShutDown);
        }
        Ok(())
    }

    // ── Serving ──────────────────────────────────────────────────

    /// Serve the snapshot at [`current_time_step`](Self::current_time_step)
    /// and advance by one.
    pub fn next_state(&mut self) -> Result<StateFrame, EngineError> {
        self.ensure_running()?;

        // Case A.
        if self.current == self.furthest {
            let snapshot = self.advance_frontier()?;
            self.current = self.furthest;
            log::trace!("served {} from the frontier", self.current);
            return Ok(StateFrame {
                snapshot,
                slow_down: self.producer.queue_len() < self.low_water_mark,
            });
        }

        // Case C, then B.
        let target = self.current.next();
        if !self.cache.contains(target) {
            self.reload_around(target)?;
        }
        let snapshot = Arc::clone(self.cache.get(target)?);
        self.current = target;
        log::trace!("served {target} from the cache");
        Ok(StateFrame {
            snapshot,
            slow_down: false,
        })
    }

    /// Pull one snapshot from the producer and append it to the cache.
    fn advance_frontier(&mut self) -> Result<Arc<Snapshot>, EngineError> {
        // After a Case C reload the cache may end before the frontier.
        if self.cache.latest_timestep() != Some(self.furthest) {
            self.flush()?;
            let start = self
                .furthest
                .advance(1)
                .rewind(self.history_len as u64)
                .max(TimeStep::FIRST);
            self.reload(start..self.furthest.next())?;
        }
        if self.cache.is_full() {
            self.flush()?;
            self.cache.retain_tail(self.history_len);
        }

        if self.producer.queue_len() == 0 {
            self.metrics.queue_empty_waits += 1;
        }
        let snapshot = match self.producer.output().recv_timeout(self.recv_timeout) {
            Ok(snapshot) => snapshot,
            Err(RecvTimeoutError::Timeout) => {
                return Err(EngineError::QueueTimeout {
                    waited: self.recv_timeout,
                })
            }
            Err(RecvTimeoutError::Disconnected) => return Err(EngineError::ProducerDisconnected),
        };
        debug_assert_eq!(snapshot.timestep, self.furthest.next());
        self.cache.push(Arc::clone(&snapshot));
        self.furthest = snapshot.timestep;
        Ok(snapshot)
    }

    /// Append every cached snapshot the archive does not hold yet.
    fn flush(&mut self) -> Result<usize, EngineError> {
        let from = self.archive.latest_timestep().next();
        let pending: Vec<&Snapshot> = self.cache.iter_from(from).map(|s| &**s).collect();
        let (Some(first), Some(last)) = (pending.first(), pending.last()) else {
            return Ok(0);
        };
        let range = (first.timestep, last.timestep);
        let written = self.archive.append(pending)?;
        self.metrics.cache_flushes += 1;
        log::debug!("flushed timesteps {}..={} to the archive", range.0, range.1);
        Ok(written)
    }

    /// Replace the cache with archived `range`.
    fn reload(&mut self, range: Range<TimeStep>) -> Result<(), EngineError> {
        let rows = self.archive.read(range.clone())?;
        self.cache.reload(rows.into_iter().map(Arc::new));
        self.metrics.archive_reloads += 1;
        log::debug!("reloaded cache with timesteps {}..{}", range.start, range.end);
        Ok(())
    }

    /// Flush, then load the K snapshots before `target`, `target`, and as
    /// many following archived snapshots as fit.
    fn reload_around(&mut self, target: TimeStep) -> Result<(), EngineError> {
        self.flush()?;
        let start = target
            .rewind(self.history_len as u64)
            .max(TimeStep::FIRST);
        let end = start
            .advance(self.cache.capacity() as u64)
            .min(self.archive.latest_timestep().next());
        self.reload(start..end)
    }

    // ── Time travel ──────────────────────────────────────────────

    /// Move so the next [`next_state`](Self::next_state) serves `target`,
    /// without progress reporting or cancellation.
    pub fn set_time_step(&mut self, target: TimeStep) -> Result<SeekOutcome, EngineError> {
        self.seek(target, |_| {}, &CancellationToken::new())
    }

    /// Move so the next [`next_state`](Self::next_state) serves `target`.
    ///
    /// `target` is clamped below to `K + 1`. Targets up to
    /// [`furthest_computed`](Self::furthest_computed) only move the
    /// cursor. Later targets fast-forward the frontier one snapshot at a
    /// time, calling `progress` after each step and polling `cancel`
    /// before it, then wait for the output queue to refill so playback
    /// does not stall.
    ///
    /// A cancelled seek puts the cursor back where it was and takes one
    /// more step from there, so the next frame served is two past the last
    /// one the caller saw. Snapshots computed so far stay computed.
    pub fn seek<F>(
        &mut self,
        target: TimeStep,
        mut progress: F,
        cancel: &CancellationToken,
    ) -> Result<SeekOutcome, EngineError>
    where
        F: FnMut(SeekProgress),
    {
        self.ensure_running()?;
        let target = target.max(self.first_servable());

        if target <= self.furthest {
            self.current = target.rewind(1);
            log::debug!("repositioned to {target}");
            return Ok(SeekOutcome::Repositioned { target });
        }

        self.state = ControllerState::Seeking;
        let origin = self.current;
        let result = self.fast_forward(target, origin, &mut progress, cancel);
        self.state = ControllerState::Steady;
        result
    }

    fn fast_forward(
        &mut self,
        target: TimeStep,
        origin: TimeStep,
        progress: &mut dyn FnMut(SeekProgress),
        cancel: &CancellationToken,
    ) -> Result<SeekOutcome, EngineError> {
        let mut steps = 0;
        while self.furthest < target {
            if cancel.is_cancelled() {
                self.current = origin;
                self.next_state()?;
                let restored = self.current_time_step();
                log::info!("seek to {target} cancelled after {steps} steps; back at {restored}");
                return Ok(SeekOutcome::Cancelled { restored, steps });
            }
            self.advance_frontier()?;
            steps += 1;
            self.metrics.fast_forward_steps += 1;
            progress(SeekProgress {
                target,
                frontier: self.furthest,
                percent: percent_done(
                    self.furthest,
                    self.producer.queue_len(),
                    target,
                    self.producer.queue_capacity(),
                ),
            });
        }
        self.current = target.rewind(1);
        self.await_refill(cancel)?;
        log::debug!("fast-forwarded {steps} steps to {target}");
        Ok(SeekOutcome::FastForwarded { target, steps })
    }

    /// Block until the output queue is full again, the token is cancelled,
    /// or `recv_timeout` elapses.
    fn await_refill(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        let capacity = self.producer.queue_capacity();
        let deadline = Instant::now() + self.recv_timeout;
        while self.producer.queue_len() < capacity {
            if cancel.is_cancelled() {
                log::debug!("stopped waiting for the output queue to refill");
                return Ok(());
            }
            if self.producer.is_finished() {
                return Err(EngineError::ProducerDisconnected);
            }
            if Instant::now() >= deadline {
                log::warn!(
                    "output queue held {}/{capacity} snapshots {:?} after a seek",
                    self.producer.queue_len(),
                    self.recv_timeout
                );
                return Ok(());
            }
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    // ── Getters ──────────────────────────────────────────────────

    /// The timestep the next [`next_state`](Self::next_state) serves.
    pub fn current_time_step(&self) -> TimeStep {
        self.current.next()
    }

    /// The furthest timestep pulled from the producer.
    pub fn furthest_computed(&self) -> TimeStep {
        self.furthest
    }

    /// Earliest timestep a seek can land on (`K + 1`).
    pub fn first_servable(&self) -> TimeStep {
        TimeStep(self.history_len as u64 + 1)
    }

    /// Simulated seconds per timestep.
    pub fn time_step_duration(&self) -> f64 {
        self.dt
    }

    /// Body names, planets first.
    pub fn body_names(&self) -> &[String] {
        &self.names
    }

    /// Frame rate the producer sustained while first filling the queue,
    /// capped at `max_fps_cap`.
    pub fn max_fps(&self) -> f64 {
        self.max_fps
    }

    /// Body counts.
    pub fn layout(&self) -> SystemLayout {
        self.layout
    }

    /// Lifecycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Producer lifecycle phase.
    pub fn producer_phase(&self) -> ProducerPhase {
        self.producer.phase()
    }

    /// Highest archived timestep, `TimeStep(0)` if nothing is archived.
    pub fn archived_through(&self) -> TimeStep {
        self.archive.latest_timestep()
    }

    /// Controller and producer counters.
    pub fn metrics(&self) -> EngineMetrics {
        let mut metrics = self.metrics.clone();
        self.producer.fill_metrics(&mut metrics);
        metrics
    }

    // ── Shutdown ─────────────────────────────────────────────────

    /// Stop the producer, flush the cache to the archive, and release
    /// everything. Idempotent; later calls return an empty report.
    pub fn shutdown(&mut self) -> ShutdownReport {
        if self.state == ControllerState::Terminated {
            return ShutdownReport {
                total_ms: 0,
                drain_ms: 0,
                producer_joined: true,
                producer: None,
                archived_on_shutdown: 0,
                archived_through: self.archive.latest_timestep(),
            };
        }

        let start = Instant::now();
        self.state = ControllerState::Terminated;

        let producer = self.producer.shutdown();
        let drain_ms = start.elapsed().as_millis() as u64;

        let archived_on_shutdown = match self.flush() {
            Ok(n) => n,
            Err(e) => {
                log::warn!("final archive flush failed: {e}");
                0
            }
        };

        let report = ShutdownReport {
            total_ms: start.elapsed().as_millis() as u64,
            drain_ms,
            producer_joined: producer.is_some(),
            producer,
            archived_on_shutdown,
            archived_through: self.archive.latest_timestep(),
        };
        log::info!(
            "engine shut down in {}ms; archived through {}",
            report.total_ms,
            report.archived_through
        );
        report
    }
}

impl Drop for TimeController {
    fn drop(&mut self) {
        if self.state != ControllerState::Terminated {
            self.shutdown();
        }
    }
}

impl fmt::Debug for TimeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeController")
            .field("state", &self.state)
            .field("current", &self.current)
            .field("furthest", &self.furthest)
            .field("cache", &self.cache)
            .field("archive", &self.archive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueConfig;
    use orrery_test_utils::{single_planet, sun_earth_satellite};

    fn test_config() -> EngineConfig {
        let mut cfg = EngineConfig::new(sun_earth_satellite());
        cfg.cache_capacity = 20;
        cfg.queue = QueueConfig {
            output_capacity: 16,
            pre_buffer_capacity: 64,
            low_water_mark: 4,
        };
        cfg.recv_timeout = Duration::from_secs(5);
        cfg
    }

    #[test]
    fn lifecycle_start_and_shutdown() {
        let mut engine = TimeController::new(test_config()).unwrap();
        assert_eq!(engine.state(), ControllerState::Steady);
        assert_eq!(engine.current_time_step(), TimeStep(5));
        assert_eq!(engine.furthest_computed(), TimeStep(4));
        let report = engine.shutdown();
        assert!(report.producer_joined);
        assert_eq!(engine.state(), ControllerState::Terminated);
        assert_eq!(engine.producer_phase(), ProducerPhase::Terminated);
    }

    #[test]
    fn startup_measures_capped_fps() {
        let engine = TimeController::new(test_config()).unwrap();
        assert!(engine.max_fps() > 0.0);
        assert!(engine.max_fps() <= 50.0);
    }

    #[test]
    fn getters_describe_the_system() {
        let engine = TimeController::new(test_config()).unwrap();
        assert_eq!(engine.body_names(), ["sun", "earth", "relay"]);
        assert_eq!(engine.time_step_duration(), 21_600.0);
        assert_eq!(
            engine.layout(),
            SystemLayout {
                planets: 2,
                satellites: 1
            }
        );
    }

    #[test]
    fn invalid_config_fails_before_spawning() {
        let mut cfg = test_config();
        cfg.block_len = 0;
        match TimeController::new(cfg) {
            Err(EngineError::Config(ConfigError::BlockLenZero)) => {}
            other => panic!("expected Config(BlockLenZero), got {other:?}"),
        }
    }

    #[test]
    fn frontier_serves_in_order_and_flushes() {
        let mut engine = TimeController::new(test_config()).unwrap();
        for expected in 5..65 {
            let frame = engine.next_state().unwrap();
            assert_eq!(frame.snapshot.timestep, TimeStep(expected));
        }
        assert_eq!(engine.furthest_computed(), TimeStep(64));
        let m = engine.metrics();
        assert!(m.cache_flushes >= 3, "flushes {}", m.cache_flushes);
        assert!(engine.archived_through() >= TimeStep(40));
    }

    #[test]
    fn rewind_inside_window_reads_cache() {
        let mut engine = TimeController::new(test_config()).unwrap();
        let mut served = Vec::new();
        for _ in 0..10 {
            served.push(engine.next_state().unwrap().snapshot);
        }
        let reloads = engine.metrics().archive_reloads;
        engine.set_time_step(TimeStep(8)).unwrap();
        let again = engine.next_state().unwrap();
        assert_eq!(again.snapshot, served[3]);
        assert!(!again.slow_down);
        assert_eq!(engine.metrics().archive_reloads, reloads);
    }

    #[test]
    fn rewind_outside_window_reloads_from_archive() {
        let mut engine = TimeController::new(test_config()).unwrap();
        let mut served = Vec::new();
        for _ in 0..80 {
            served.push(engine.next_state().unwrap().snapshot);
        }
        engine.set_time_step(TimeStep(6)).unwrap();
        for original in &served[1..40] {
            let frame = engine.next_state().unwrap();
            assert_eq!(&frame.snapshot, original);
        }
        assert!(engine.metrics().archive_reloads >= 2);
    }

    #[test]
    fn seek_below_history_is_clamped() {
        let mut engine = TimeController::new(test_config()).unwrap();
        for _ in 0..5 {
            engine.next_state().unwrap();
        }
        let outcome = engine.set_time_step(TimeStep(1)).unwrap();
        assert_eq!(
            outcome,
            SeekOutcome::Repositioned {
                target: TimeStep(5)
            }
        );
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(5));
    }

    #[test]
    fn fast_forward_reports_progress() {
        let mut engine = TimeController::new(test_config()).unwrap();
        let mut seen = Vec::new();
        let outcome = engine
            .seek(TimeStep(60), |p| seen.push(p), &CancellationToken::new())
            .unwrap();
        assert_eq!(
            outcome,
            SeekOutcome::FastForwarded {
                target: TimeStep(60),
                steps: 56
            }
        );
        assert_eq!(seen.len(), 56);
        assert!(seen.windows(2).all(|w| w[0].frontier < w[1].frontier));
        assert!(seen.iter().all(|p| (0.0..=100.0).contains(&p.percent)));
        assert_eq!(engine.current_time_step(), TimeStep(60));
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(60));
        assert_eq!(engine.state(), ControllerState::Steady);
    }

    #[test]
    fn cancelled_seek_steps_once_from_origin() {
        let mut engine = TimeController::new(test_config()).unwrap();
        for _ in 0..3 {
            engine.next_state().unwrap();
        }
        // Last served: 7.
        let before = engine.current_time_step();
        assert_eq!(before, TimeStep(8));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        let outcome = engine
            .seek(
                TimeStep(500),
                |p| {
                    if p.frontier >= TimeStep(40) {
                        trigger.cancel();
                    }
                },
                &cancel,
            )
            .unwrap();
        match outcome {
            SeekOutcome::Cancelled { restored, steps } => {
                assert_eq!(restored, TimeStep(9));
                assert_eq!(steps, 33);
            }
            other => panic!("expected Cancelled, got {other:?}"),
        }
        assert_eq!(engine.current_time_step(), TimeStep(9));
        assert_eq!(engine.furthest_computed(), TimeStep(40));
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(9));
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(10));
        assert_eq!(engine.state(), ControllerState::Steady);
    }

    #[test]
    fn seek_cancelled_before_any_step_advances_frontier_once() {
        let mut engine = TimeController::new(test_config()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = engine.seek(TimeStep(300), |_| {}, &cancel).unwrap();
        assert_eq!(
            outcome,
            SeekOutcome::Cancelled {
                restored: TimeStep(6),
                steps: 0
            }
        );
        assert_eq!(engine.furthest_computed(), TimeStep(5));
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(6));
    }

    #[test]
    fn fast_forward_leaves_queue_full() {
        let mut engine = TimeController::new(test_config()).unwrap();
        engine.set_time_step(TimeStep(120)).unwrap();
        assert_eq!(engine.producer.queue_len(), engine.producer.queue_capacity());
        let waits = engine.metrics().queue_empty_waits;
        for expected in 120..130 {
            let frame = engine.next_state().unwrap();
            assert_eq!(frame.snapshot.timestep, TimeStep(expected));
        }
        assert_eq!(engine.metrics().queue_empty_waits, waits);
    }

    #[test]
    fn calls_after_shutdown_fail() {
        let mut engine = TimeController::new(test_config()).unwrap();
        engine.shutdown();
        match engine.next_state() {
            Err(EngineError::ShutDown) => {}
            other => panic!("expected ShutDown, got {other:?}"),
        }
        match engine.set_time_step(TimeStep(10)) {
            Err(EngineError::ShutDown) => {}
            other => panic!("expected ShutDown, got {other:?}"),
        }
        let again = engine.shutdown();
        assert_eq!(again.total_ms, 0);
    }

    #[test]
    fn shutdown_flushes_cache() {
        let mut engine = TimeController::new(test_config()).unwrap();
        for _ in 0..7 {
            engine.next_state().unwrap();
        }
        let report = engine.shutdown();
        assert_eq!(report.archived_through, TimeStep(11));
        assert_eq!(report.archived_on_shutdown, 11);
    }

    #[test]
    fn history_len_one_serves_from_two() {
        let mut cfg = test_config();
        cfg.system = single_planet();
        cfg.history_len = 1;
        let mut engine = TimeController::new(cfg).unwrap();
        assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(2));
    }
}
