//! Benchmark profiles for the Orrery simulation engine.
//!
//! - [`random_system`]: a seeded system of planets in near-circular orbits
//!   around a heavy primary, each with optional satellites
//! - [`reference_profile`]: engine config for the 8-planet reference system
//! - [`warm_history`]: a contiguous run of physics snapshots

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use orrery_core::{
    BodyConfig, DVec3, SatelliteConfig, Snapshot, SystemConfig, DEFAULT_DT,
    GRAVITATIONAL_CONSTANT,
};
use orrery_engine::EngineConfig;
use orrery_physics::PhysicsStepper;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

const PRIMARY_MASS: f64 = 1.989e30;
const AU: f64 = 1.496e11;

/// Uniform sample in `[0, 1)` from the top 53 bits of a `u64`.
fn unit(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64
}

/// Build a seeded system: one primary, `planets` orbiting bodies, and
/// `satellites` craft spread over those bodies.
///
/// Orbits are coplanar and circular at radii between 0.4 and 5 AU, with
/// random phase. The same seed always yields the same system.
pub fn random_system(seed: u64, planets: usize, satellites: usize) -> SystemConfig {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut bodies = vec![BodyConfig {
        name: "primary".into(),
        mass: PRIMARY_MASS,
        position: DVec3::ZERO,
        velocity: DVec3::ZERO,
    }];
    for i in 0..planets {
        let radius = AU * (0.4 + 4.6 * unit(&mut rng));
        let phase = std::f64::consts::TAU * unit(&mut rng);
        let speed = (GRAVITATIONAL_CONSTANT * PRIMARY_MASS / radius).sqrt();
        let (sin, cos) = phase.sin_cos();
        bodies.push(BodyConfig {
            name: format!("planet-{i}"),
            mass: 1e23 + 1e25 * unit(&mut rng),
            position: DVec3::new(radius * cos, radius * sin, 0.0),
            velocity: DVec3::new(-speed * sin, speed * cos, 0.0),
        });
    }

    let orbiting = (bodies.len() - 1).max(1);
    let sats = (0..satellites)
        .map(|i| {
            let host = &bodies[(1 + i % orbiting).min(bodies.len() - 1)];
            let mass = 500.0 + 5e3 * unit(&mut rng);
            let altitude = 2e5 + 3.5e7 * unit(&mut rng);
            SatelliteConfig::above(host, format!("sat-{i}"), mass, altitude, 3e3)
        })
        .collect();

    SystemConfig {
        planets: bodies,
        satellites: sats,
    }
}

/// Engine configuration for the reference system: 8 planets, 4 satellites,
/// physics only.
pub fn reference_profile(seed: u64) -> EngineConfig {
    EngineConfig::new(random_system(seed, 8, 4))
}

/// `len` consecutive physics snapshots starting from the initial state.
pub fn warm_history(system: &SystemConfig, len: usize) -> Vec<Arc<Snapshot>> {
    let stepper = PhysicsStepper::new(system.masses(), system.layout(), DEFAULT_DT);
    let mut out = vec![Arc::new(system.initial_snapshot())];
    while out.len() < len {
        let Some(last) = out.last() else { break };
        let next = stepper.step(last, &[]);
        out.push(Arc::new(next));
    }
    out
}
