//! Newtonian N-body stepping for Orrery.
//!
//! - [`gravity::accelerations`] computes pairwise gravitational
//!   acceleration for every body.
//! - [`PhysicsStepper`] advances a [`Snapshot`](orrery_core::Snapshot) by
//!   one `dt` with semi-implicit Euler, folding scheduled burns into the
//!   acceleration term and re-centring on the primary.
//! - [`BurnSchedule`] owns each satellite's pending maneuvers and hands
//!   them out one block at a time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod burns;
pub mod gravity;
pub mod stepper;

pub use burns::{BurnBlock, BurnSchedule, StepBurns};
pub use stepper::PhysicsStepper;
