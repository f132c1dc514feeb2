//! Core types and traits for the Orrery N-body simulation engine.
//!
//! This is the leaf crate of the workspace. It defines the vocabulary
//! shared by the stepper, archive, and engine: timestep identifiers,
//! body descriptors, burn maneuvers, the [`Snapshot`] state record, the
//! pluggable [`Predictor`] capability, and the common error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod body;
pub mod error;
pub mod id;
pub mod predictor;
pub mod snapshot;
pub mod system;

pub use body::{Body, BodyKind, BodyRegistry, BurnManeuver};
pub use error::{CacheError, PredictorError};
pub use id::{SatelliteIndex, TimeStep};
pub use predictor::{check_forecast, Forecast, Predictor, PredictorSample};
pub use snapshot::{Snapshot, SystemLayout};
pub use system::{BodyConfig, SatelliteConfig, SystemConfig, SystemError};

pub use glam::DVec3;

/// Newtonian gravitational constant in m³·kg⁻¹·s⁻².
pub const GRAVITATIONAL_CONSTANT: f64 = 6.67408e-11;

/// Default integration step: six hours, in seconds.
pub const DEFAULT_DT: f64 = 21_600.0;

/// Mean Earth radius in metres, used when placing satellites by altitude.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
