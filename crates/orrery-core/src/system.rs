//! Fully resolved system description used to seed a simulation.
//!
//! Parsing configuration files is the caller's job; this module only
//! holds the resolved bodies and checks them before anything is stepped.

use std::error::Error;
use std::fmt;

use glam::DVec3;
use smallvec::SmallVec;

use crate::body::{Body, BodyKind, BodyRegistry, BurnManeuver};
use crate::id::TimeStep;
use crate::snapshot::{Snapshot, SystemLayout};
use crate::EARTH_RADIUS_M;

// ── SystemError ──────────────────────────────────────────────────

/// Problems found by [`SystemConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum SystemError {
    /// At least one planet is required to anchor the frame.
    NoPlanets,
    /// Two bodies share a name.
    DuplicateName {
        /// The repeated name.
        name: String,
    },
    /// A mass is NaN, infinite, zero, or negative.
    InvalidMass {
        /// Body name.
        body: String,
        /// The offending mass.
        value: f64,
    },
    /// A position or velocity has a non-finite component.
    NonFiniteState {
        /// Body name.
        body: String,
    },
    /// A maneuver is scheduled before the first step or has a
    /// non-finite delta-v.
    InvalidManeuver {
        /// Satellite name.
        satellite: String,
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPlanets => write!(f, "system has no planets"),
            Self::DuplicateName { name } => write!(f, "duplicate body name '{name}'"),
            Self::InvalidMass { body, value } => {
                write!(f, "body '{body}' mass must be finite and positive, got {value}")
            }
            Self::NonFiniteState { body } => {
                write!(f, "body '{body}' has a non-finite position or velocity")
            }
            Self::InvalidManeuver { satellite, reason } => {
                write!(f, "satellite '{satellite}' maneuver: {reason}")
            }
        }
    }
}

impl Error for SystemError {}

// ── Body configs ─────────────────────────────────────────────────

/// Initial state of a planet.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyConfig {
    /// Unique name.
    pub name: String,
    /// Mass in kilograms.
    pub mass: f64,
    /// Position in metres.
    pub position: DVec3,
    /// Velocity in m/s.
    pub velocity: DVec3,
}

/// Initial state and burn schedule of a satellite.
#[derive(Clone, Debug, PartialEq)]
pub struct SatelliteConfig {
    /// Unique name.
    pub name: String,
    /// Mass in kilograms.
    pub mass: f64,
    /// Position in metres.
    pub position: DVec3,
    /// Velocity in m/s.
    pub velocity: DVec3,
    /// Scheduled burns, any order.
    pub maneuvers: Vec<BurnManeuver>,
}

impl SatelliteConfig {
    /// Place a satellite `altitude` metres above the surface of `planet`.
    ///
    /// The satellite sits on the line from the origin through the planet
    /// at `altitude + EARTH_RADIUS_M` from the planet's centre. Its velocity
    /// is the planet's velocity plus `speed` along the in-plane direction
    /// obtained by rotating that line a quarter turn clockwise about z.
    pub fn above(
        planet: &BodyConfig,
        name: impl Into<String>,
        mass: f64,
        altitude: f64,
        speed: f64,
    ) -> Self {
        let radial = planet.position.normalize_or(DVec3::X);
        let position = planet.position + radial * (altitude + EARTH_RADIUS_M);
        let tangent = DVec3::new(radial.y, -radial.x, 0.0).normalize_or(DVec3::Y);
        Self {
            name: name.into(),
            mass,
            position,
            velocity: planet.velocity + tangent * speed,
            maneuvers: Vec::new(),
        }
    }

    /// Add a burn to the schedule.
    pub fn with_maneuver(mut self, maneuver: BurnManeuver) -> Self {
        self.maneuvers.push(maneuver);
        self
    }
}

// ── SystemConfig ─────────────────────────────────────────────────

/// Every body of a simulation, planets first.
///
/// Planet 0 is the primary: each snapshot is re-centred on it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SystemConfig {
    /// Planets in snapshot order.
    pub planets: Vec<BodyConfig>,
    /// Satellites in snapshot order.
    pub satellites: Vec<SatelliteConfig>,
}

impl SystemConfig {
    /// Body counts.
    pub fn layout(&self) -> SystemLayout {
        SystemLayout {
            planets: self.planets.len(),
            satellites: self.satellites.len(),
        }
    }

    /// Check every body and maneuver.
    pub fn validate(&self) -> Result<(), SystemError> {
        // 1. A primary is required.
        if self.planets.is_empty() {
            return Err(SystemError::NoPlanets);
        }
        // 2. Masses and initial vectors.
        let states = self
            .planets
            .iter()
            .map(|p| (&p.name, p.mass, p.position, p.velocity))
            .chain(
                self.satellites
                    .iter()
                    .map(|s| (&s.name, s.mass, s.position, s.velocity)),
            );
        for (name, mass, position, velocity) in states {
            if !mass.is_finite() || mass <= 0.0 {
                return Err(SystemError::InvalidMass {
                    body: name.clone(),
                    value: mass,
                });
            }
            if !position.is_finite() || !velocity.is_finite() {
                return Err(SystemError::NonFiniteState { body: name.clone() });
            }
        }
        // 3. Maneuvers fire on a computed step, never on the initial state.
        for sat in &self.satellites {
            for m in &sat.maneuvers {
                if m.at_timestep <= TimeStep::FIRST {
                    return Err(SystemError::InvalidManeuver {
                        satellite: sat.name.clone(),
                        reason: format!("timestep {} precedes the first step", m.at_timestep),
                    });
                }
                if !m.delta_v.is_finite() {
                    return Err(SystemError::InvalidManeuver {
                        satellite: sat.name.clone(),
                        reason: "non-finite delta-v".into(),
                    });
                }
            }
        }
        // 4. Names are unique.
        self.registry().map(|_| ())
    }

    /// Name registry in snapshot order.
    pub fn registry(&self) -> Result<BodyRegistry, SystemError> {
        let planets = self
            .planets
            .iter()
            .map(|p| Body {
                name: p.name.clone(),
                mass: p.mass,
                kind: BodyKind::Planet,
            })
            .collect();
        let satellites = self
            .satellites
            .iter()
            .map(|s| Body {
                name: s.name.clone(),
                mass: s.mass,
                kind: BodyKind::Satellite,
            })
            .collect();
        BodyRegistry::new(planets, satellites).map_err(|name| SystemError::DuplicateName { name })
    }

    /// Masses in snapshot order.
    pub fn masses(&self) -> Vec<f64> {
        self.planets
            .iter()
            .map(|p| p.mass)
            .chain(self.satellites.iter().map(|s| s.mass))
            .collect()
    }

    /// Per-satellite maneuver lists, in satellite order.
    pub fn maneuvers(&self) -> Vec<Vec<BurnManeuver>> {
        self.satellites.iter().map(|s| s.maneuvers.clone()).collect()
    }

    /// Timestep 1: the configured state, centred on the primary, with
    /// zero satellite acceleration.
    pub fn initial_snapshot(&self) -> Snapshot {
        let origin = self.planets.first().map_or(DVec3::ZERO, |p| p.position);
        Snapshot {
            timestep: TimeStep::FIRST,
            planet_pos: self.planets.iter().map(|p| p.position - origin).collect(),
            planet_vel: self.planets.iter().map(|p| p.velocity).collect(),
            sat_pos: self.satellites.iter().map(|s| s.position - origin).collect(),
            sat_vel: self.satellites.iter().map(|s| s.velocity).collect(),
            sat_acc: vec![DVec3::ZERO; self.satellites.len()],
            maneuvers: SmallVec::new(),
        }
    }
}
