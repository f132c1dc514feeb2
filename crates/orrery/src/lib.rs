//! Orrery: a real-time, time-travelable N-body orbital simulation.
//!
//! This is the facade crate that re-exports the public API of the Orrery
//! sub-crates. Most users only need this one dependency.
//!
//! # Quick start
//!
//! ```rust
//! use orrery::prelude::*;
//!
//! let sun = BodyConfig {
//!     name: "sun".into(),
//!     mass: 1.989e30,
//!     position: DVec3::ZERO,
//!     velocity: DVec3::ZERO,
//! };
//! let earth = BodyConfig {
//!     name: "earth".into(),
//!     mass: 5.972e24,
//!     position: DVec3::new(1.496e11, 0.0, 0.0),
//!     velocity: DVec3::new(0.0, 29_780.0, 0.0),
//! };
//! let relay = SatelliteConfig::above(&earth, "relay", 1_000.0, 3.6e7, 3_070.0)
//!     .with_maneuver(BurnManeuver::new(40u64, DVec3::new(0.0, 50.0, 0.0)));
//! let system = SystemConfig {
//!     planets: vec![sun, earth],
//!     satellites: vec![relay],
//! };
//!
//! let mut config = EngineConfig::new(system);
//! config.queue.output_capacity = 16;
//! config.queue.pre_buffer_capacity = 64;
//! config.queue.low_water_mark = 4;
//! let mut engine = TimeController::new(config).unwrap();
//!
//! let frame = engine.next_state().unwrap();
//! assert_eq!(frame.snapshot.timestep, TimeStep(5));
//!
//! engine.set_time_step(TimeStep(60)).unwrap();
//! assert_eq!(engine.next_state().unwrap().snapshot.timestep, TimeStep(60));
//! engine.shutdown();
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `orrery-core` | Timesteps, bodies, snapshots, system config, predictor trait |
//! | [`physics`] | `orrery-physics` | Gravity, the physics stepper, burn schedules |
//! | [`archive`] | `orrery-archive` | Durable append-only snapshot archive |
//! | [`engine`] | `orrery-engine` | Cache, producer thread, time controller |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and traits (`orrery-core`).
///
/// Contains [`types::TimeStep`], [`types::Snapshot`], [`types::SystemConfig`],
/// and the [`types::Predictor`] extension point.
pub use orrery_core as types;

/// Physics stepping (`orrery-physics`).
///
/// [`physics::PhysicsStepper`] advances a snapshot by one timestep.
pub use orrery_physics as physics;

/// Durable snapshot storage (`orrery-archive`).
///
/// [`archive::Archive`] stores every computed snapshot, in memory or in
/// a directory of fixed-width tables.
pub use orrery_archive as archive;

/// Serving and time travel (`orrery-engine`).
///
/// [`engine::TimeController`] is the entry point: it owns the cache, the
/// archive, and the background producer.
pub use orrery_engine as engine;

/// Common imports for typical Orrery usage.
///
/// ```rust
/// use orrery::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use orrery_core::{
        BodyConfig, BurnManeuver, DVec3, SatelliteConfig, SatelliteIndex, Snapshot,
        SystemConfig, SystemLayout, TimeStep,
    };

    // Predictors
    pub use orrery_core::{Forecast, Predictor, PredictorError, PredictorSample};

    // Engine
    pub use orrery_engine::{
        ArchiveLocation, CancellationToken, EngineConfig, EngineError, PredictorPolicy,
        SeekOutcome, SeekProgress, StateFrame, TimeController,
    };
}
