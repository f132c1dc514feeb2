//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the builder-input for
//! [`TimeController::new`](crate::TimeController::new).
//! [`validate()`](EngineConfig::validate) checks every sizing invariant
//! and the system description before any thread is spawned.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use orrery_core::{Predictor, SystemConfig, SystemError, DEFAULT_DT};

// ── QueueConfig ────────────────────────────────────────────────────

/// Sizing of the producer's buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Capacity of the bounded queue between producer and consumer.
    /// Default: 100.
    pub output_capacity: usize,
    /// Pre-buffer size below which the producer keeps harvesting blocks.
    /// Once it is reached and the output queue is full, the producer
    /// pauses for [`BackpressureConfig::pause_ms`]. Default: 5000.
    pub pre_buffer_capacity: usize,
    /// Queue length under which `next_state()` reports `slow_down`.
    /// Default: 20.
    pub low_water_mark: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            output_capacity: 100,
            pre_buffer_capacity: 5000,
            low_water_mark: 20,
        }
    }
}

// ── BackpressureConfig ─────────────────────────────────────────────

/// How long the producer parks when it cannot make progress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackpressureConfig {
    /// Park duration when both the pre-buffer and the output queue are
    /// full, in milliseconds. Default: 50.
    pub pause_ms: u64,
    /// Park duration after a loop iteration that moved nothing,
    /// in microseconds. Default: 500.
    pub idle_park_us: u64,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            pause_ms: 50,
            idle_park_us: 500,
        }
    }
}

impl BackpressureConfig {
    /// [`pause_ms`](Self::pause_ms) as a duration.
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    /// [`idle_park_us`](Self::idle_park_us) as a duration.
    pub fn idle_park(&self) -> Duration {
        Duration::from_micros(self.idle_park_us)
    }
}

// ── ArchiveLocation ────────────────────────────────────────────────

/// Where aged-out snapshots are archived.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ArchiveLocation {
    /// Growable in-memory buffers, lost on drop.
    #[default]
    InMemory,
    /// A directory of table files, created (or replaced) at startup.
    Directory(PathBuf),
}

// ── PredictorPolicy ────────────────────────────────────────────────

/// What the producer does after the predictor fails on a block.
///
/// The failed block is always recomputed with physics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PredictorPolicy {
    /// Stop consulting the predictor for the rest of the run.
    #[default]
    DisableOnFailure,
    /// Try the predictor again on the next block.
    RetryEachBlock,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`] or while starting
/// the engine's threads.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// The body or maneuver description is invalid.
    System(SystemError),
    /// `history_len` is zero.
    HistoryLenZero,
    /// `block_len` is zero.
    BlockLenZero,
    /// The cache cannot hold the history plus one new snapshot.
    CacheTooSmall {
        /// The configured capacity.
        configured: usize,
        /// The smallest acceptable capacity (`history_len + 1`).
        minimum: usize,
    },
    /// Output queue capacity is zero.
    QueueCapacityZero,
    /// Pre-buffer capacity is zero.
    PreBufferZero,
    /// The low-water mark exceeds the output queue capacity.
    LowWaterAboveCapacity {
        /// The configured low-water mark.
        low_water_mark: usize,
        /// The output queue capacity.
        capacity: usize,
    },
    /// `dt` is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// `max_fps_cap` is NaN, infinite, zero, or negative.
    InvalidFpsCap {
        /// The invalid value.
        value: f64,
    },
    /// A timeout is zero.
    ZeroTimeout {
        /// Which timeout.
        name: &'static str,
    },
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System(e) => write!(f, "system: {e}"),
            Self::HistoryLenZero => write!(f, "history_len must be at least 1"),
            Self::BlockLenZero => write!(f, "block_len must be at least 1"),
            Self::CacheTooSmall {
                configured,
                minimum,
            } => write!(
                f,
                "cache_capacity {configured} is below minimum of {minimum}"
            ),
            Self::QueueCapacityZero => write!(f, "output queue capacity must be at least 1"),
            Self::PreBufferZero => write!(f, "pre-buffer capacity must be at least 1"),
            Self::LowWaterAboveCapacity {
                low_water_mark,
                capacity,
            } => write!(
                f,
                "low_water_mark {low_water_mark} exceeds output queue capacity {capacity}"
            ),
            Self::InvalidTimeStep { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::InvalidFpsCap { value } => {
                write!(f, "max_fps_cap must be finite and positive, got {value}")
            }
            Self::ZeroTimeout { name } => write!(f, "{name} must be non-zero"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "thread spawn failed: {reason}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::System(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SystemError> for ConfigError {
    fn from(e: SystemError) -> Self {
        Self::System(e)
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for a [`TimeController`](crate::TimeController).
///
/// Build one with [`EngineConfig::new`] and override fields as needed.
/// Consumed by the controller: the system's maneuvers move into the
/// producer's burn schedule.
#[derive(Clone)]
pub struct EngineConfig {
    /// Bodies and scheduled burns.
    pub system: SystemConfig,
    /// Seconds of simulated time per timestep. Default: 21,600.
    pub dt: f64,
    /// Snapshots of history handed to each block (K). Default: 4.
    pub history_len: usize,
    /// Snapshots per producer block (M). Default: 10.
    pub block_len: usize,
    /// Snapshots held in the in-memory cache. Default: 100.
    pub cache_capacity: usize,
    /// Producer buffer sizing.
    pub queue: QueueConfig,
    /// Producer park durations.
    pub backpressure: BackpressureConfig,
    /// Upper bound on the reported frame rate. Default: 50.
    pub max_fps_cap: f64,
    /// How long startup waits for the first queue fill. Default: 30 s.
    pub startup_timeout: Duration,
    /// How long `next_state()` waits on an empty queue. Default: 10 s.
    pub recv_timeout: Duration,
    /// Archive backing store.
    pub archive: ArchiveLocation,
    /// Optional satellite trajectory model; `None` means physics only.
    pub predictor: Option<Arc<dyn Predictor>>,
    /// Reaction to predictor failure.
    pub predictor_policy: PredictorPolicy,
}

impl EngineConfig {
    /// A configuration for `system` with every other field at its default.
    pub fn new(system: SystemConfig) -> Self {
        Self {
            system,
            dt: DEFAULT_DT,
            history_len: 4,
            block_len: 10,
            cache_capacity: 100,
            queue: QueueConfig::default(),
            backpressure: BackpressureConfig::default(),
            max_fps_cap: 50.0,
            startup_timeout: Duration::from_secs(30),
            recv_timeout: Duration::from_secs(10),
            archive: ArchiveLocation::InMemory,
            predictor: None,
            predictor_policy: PredictorPolicy::default(),
        }
    }

    /// Install a predictor.
    pub fn with_predictor(mut self, predictor: Arc<dyn Predictor>) -> Self {
        self.predictor = Some(predictor);
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. System.
        self.system.validate()?;

        // 2. Step length.
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimeStep { value: self.dt });
        }

        // 3. History and block sizes.
        if self.history_len == 0 {
            return Err(ConfigError::HistoryLenZero);
        }
        if self.block_len == 0 {
            return Err(ConfigError::BlockLenZero);
        }

        // 4. Cache must hold the history plus the snapshot being added.
        let minimum = self.history_len + 1;
        if self.cache_capacity < minimum {
            return Err(ConfigError::CacheTooSmall {
                configured: self.cache_capacity,
                minimum,
            });
        }

        // 5. Queues.
        if self.queue.output_capacity == 0 {
            return Err(ConfigError::QueueCapacityZero);
        }
        if self.queue.pre_buffer_capacity == 0 {
            return Err(ConfigError::PreBufferZero);
        }
        if self.queue.low_water_mark > self.queue.output_capacity {
            return Err(ConfigError::LowWaterAboveCapacity {
                low_water_mark: self.queue.low_water_mark,
                capacity: self.queue.output_capacity,
            });
        }

        // 6. Frame rate cap and timeouts.
        if !self.max_fps_cap.is_finite() || self.max_fps_cap <= 0.0 {
            return Err(ConfigError::InvalidFpsCap {
                value: self.max_fps_cap,
            });
        }
        if self.startup_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "startup_timeout",
            });
        }
        if self.recv_timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout {
                name: "recv_timeout",
            });
        }

        Ok(())
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("system", &self.system)
            .field("dt", &self.dt)
            .field("history_len", &self.history_len)
            .field("block_len", &self.block_len)
            .field("cache_capacity", &self.cache_capacity)
            .field("queue", &self.queue)
            .field("backpressure", &self.backpressure)
            .field("max_fps_cap", &self.max_fps_cap)
            .field("startup_timeout", &self.startup_timeout)
            .field("recv_timeout", &self.recv_timeout)
            .field("archive", &self.archive)
            .field("predictor", &self.predictor.as_ref().map(|p| p.name()))
            .field("predictor_policy", &self.predictor_policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_test_utils::{sun_earth_satellite, CoastPredictor};

    fn valid() -> EngineConfig {
        EngineConfig::new(sun_earth_satellite())
    }

    #[test]
    fn defaults_validate() {
        valid().validate().unwrap();
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = valid();
        assert_eq!(cfg.dt, 21_600.0);
        assert_eq!(cfg.history_len, 4);
        assert_eq!(cfg.block_len, 10);
        assert_eq!(cfg.cache_capacity, 100);
        assert_eq!(cfg.queue.output_capacity, 100);
        assert_eq!(cfg.queue.pre_buffer_capacity, 5000);
        assert_eq!(cfg.queue.low_water_mark, 20);
        assert_eq!(cfg.max_fps_cap, 50.0);
        assert!(cfg.predictor.is_none());
    }

    #[test]
    fn empty_system_rejected() {
        let cfg = EngineConfig::new(SystemConfig::default());
        match cfg.validate() {
            Err(ConfigError::System(SystemError::NoPlanets)) => {}
            other => panic!("expected System(NoPlanets), got {other:?}"),
        }
    }

    #[test]
    fn zero_history_rejected() {
        let mut cfg = valid();
        cfg.history_len = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::HistoryLenZero));
    }

    #[test]
    fn zero_block_rejected() {
        let mut cfg = valid();
        cfg.block_len = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::BlockLenZero));
    }

    #[test]
    fn cache_must_exceed_history() {
        let mut cfg = valid();
        cfg.cache_capacity = cfg.history_len;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::CacheTooSmall {
                configured: 4,
                minimum: 5
            })
        );
        cfg.cache_capacity = 5;
        cfg.validate().unwrap();
    }

    #[test]
    fn zero_queue_rejected() {
        let mut cfg = valid();
        cfg.queue.output_capacity = 0;
        cfg.queue.low_water_mark = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::QueueCapacityZero));
    }

    #[test]
    fn zero_pre_buffer_rejected() {
        let mut cfg = valid();
        cfg.queue.pre_buffer_capacity = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::PreBufferZero));
    }

    #[test]
    fn low_water_above_capacity_rejected() {
        let mut cfg = valid();
        cfg.queue.low_water_mark = 101;
        match cfg.validate() {
            Err(ConfigError::LowWaterAboveCapacity { .. }) => {}
            other => panic!("expected LowWaterAboveCapacity, got {other:?}"),
        }
    }

    #[test]
    fn bad_dt_rejected() {
        for value in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut cfg = valid();
            cfg.dt = value;
            match cfg.validate() {
                Err(ConfigError::InvalidTimeStep { .. }) => {}
                other => panic!("expected InvalidTimeStep for {value}, got {other:?}"),
            }
        }
    }

    #[test]
    fn bad_fps_cap_rejected() {
        let mut cfg = valid();
        cfg.max_fps_cap = 0.0;
        match cfg.validate() {
            Err(ConfigError::InvalidFpsCap { .. }) => {}
            other => panic!("expected InvalidFpsCap, got {other:?}"),
        }
    }

    #[test]
    fn zero_recv_timeout_rejected() {
        let mut cfg = valid();
        cfg.recv_timeout = Duration::ZERO;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroTimeout {
                name: "recv_timeout"
            })
        );
    }

    #[test]
    fn debug_shows_predictor_name() {
        let cfg = valid().with_predictor(Arc::new(CoastPredictor::new(1.0)));
        let text = format!("{cfg:?}");
        assert!(text.contains("coast"), "{text}");
    }

    #[test]
    fn system_error_is_source() {
        let err = ConfigError::from(SystemError::NoPlanets);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("system:"));
    }
}
