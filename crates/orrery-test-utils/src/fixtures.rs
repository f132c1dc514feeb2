//! Reference systems for tests and benchmarks.

use orrery_core::{BodyConfig, BurnManeuver, DVec3, SatelliteConfig, SystemConfig};

pub const SUN_MASS: f64 = 1.989e30;
pub const EARTH_MASS: f64 = 5.972e24;
pub const EARTH_ORBIT_M: f64 = 1.496e11;
pub const EARTH_SPEED: f64 = 29_780.0;
/// Roughly lunar distance, so a six-hour step still resolves the orbit.
pub const SAT_ALTITUDE_M: f64 = 3.8e8;
pub const SAT_SPEED: f64 = 1_022.0;

pub fn sun() -> BodyConfig {
    BodyConfig {
        name: "sun".into(),
        mass: SUN_MASS,
        position: DVec3::ZERO,
        velocity: DVec3::ZERO,
    }
}

pub fn earth() -> BodyConfig {
    BodyConfig {
        name: "earth".into(),
        mass: EARTH_MASS,
        position: DVec3::new(EARTH_ORBIT_M, 0.0, 0.0),
        velocity: DVec3::new(0.0, EARTH_SPEED, 0.0),
    }
}

/// Sun, Earth, and one satellite parked far above Earth.
pub fn sun_earth_satellite() -> SystemConfig {
    let earth = earth();
    let sat = SatelliteConfig::above(&earth, "relay", 1_000.0, SAT_ALTITUDE_M, SAT_SPEED);
    SystemConfig {
        planets: vec![sun(), earth],
        satellites: vec![sat],
    }
}

/// [`sun_earth_satellite`] with burns on the satellite.
pub fn sun_earth_satellite_with_burns(burns: Vec<BurnManeuver>) -> SystemConfig {
    let mut cfg = sun_earth_satellite();
    cfg.satellites[0].maneuvers = burns;
    cfg
}

/// Sun and Earth only.
pub fn two_planets() -> SystemConfig {
    SystemConfig {
        planets: vec![sun(), earth()],
        satellites: Vec::new(),
    }
}

/// A lone primary: nothing ever moves.
pub fn single_planet() -> SystemConfig {
    SystemConfig {
        planets: vec![sun()],
        satellites: Vec::new(),
    }
}
