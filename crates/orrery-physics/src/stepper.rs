//! The [`PhysicsStepper`]: one semi-implicit Euler step of the system.

use glam::DVec3;
use orrery_core::{Forecast, SatelliteIndex, Snapshot, SystemLayout};
use smallvec::SmallVec;

use crate::gravity;

/// Advances a [`Snapshot`] by one timestep.
///
/// Holds the per-body masses and `dt`; stepping itself is a pure
/// function of the previous snapshot and the burns firing on the step.
///
/// # Integration
///
/// 1. Gravity on every body from every other body.
/// 2. Each burn adds `delta_v / dt` to its satellite's acceleration, so
///    the integrated velocity changes by exactly `delta_v`.
/// 3. `v += a * dt`, then `p += v * dt`.
/// 4. All positions are shifted so planet 0 sits at the origin.
///
/// Non-finite inputs propagate per IEEE-754; stepping never fails.
#[derive(Clone, Debug)]
pub struct PhysicsStepper {
    masses: Vec<f64>,
    layout: SystemLayout,
    dt: f64,
}

impl PhysicsStepper {
    /// Create a stepper.
    ///
    /// # Panics
    ///
    /// Panics if `masses` does not hold one entry per body of `layout`
    /// or if `layout` has no planets.
    pub fn new(masses: Vec<f64>, layout: SystemLayout, dt: f64) -> Self {
        assert_eq!(
            masses.len(),
            layout.bodies(),
            "PhysicsStepper needs one mass per body"
        );
        assert!(layout.planets > 0, "PhysicsStepper needs a primary planet");
        Self { masses, layout, dt }
    }

    /// Seconds per step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The system shape this stepper accepts.
    pub fn layout(&self) -> SystemLayout {
        self.layout
    }

    /// Mass of satellite `sat`.
    pub fn satellite_mass(&self, sat: SatelliteIndex) -> f64 {
        self.masses[self.layout.planets + sat.0 as usize]
    }

    /// Advance every body with physics.
    pub fn step(&self, prev: &Snapshot, burns: &[(SatelliteIndex, DVec3)]) -> Snapshot {
        self.advance(prev, burns, &[])
    }

    /// Advance planets with physics and satellites with `forecasts`.
    ///
    /// `forecasts[s]` drives satellite `s` when present: its position
    /// becomes `prev + displacement` and its velocity is taken verbatim.
    /// Satellites without a forecast, or beyond the slice, use physics.
    /// The recorded acceleration of a forecast satellite is still the
    /// gravity (plus burn) acting on it.
    pub fn predicted_step(
        &self,
        prev: &Snapshot,
        burns: &[(SatelliteIndex, DVec3)],
        forecasts: &[Option<Forecast>],
    ) -> Snapshot {
        self.advance(prev, burns, forecasts)
    }

    fn advance(
        &self,
        prev: &Snapshot,
        burns: &[(SatelliteIndex, DVec3)],
        forecasts: &[Option<Forecast>],
    ) -> Snapshot {
        debug_assert!(prev.matches(self.layout), "snapshot layout mismatch");
        let np = self.layout.planets;
        let positions: Vec<DVec3> = prev.positions().collect();
        let velocities: Vec<DVec3> = prev.velocities().collect();
        let mut acc = gravity::accelerations(&positions, &self.masses);

        let mut maneuvers: SmallVec<[SatelliteIndex; 4]> = SmallVec::new();
        for &(sat, delta_v) in burns {
            acc[np + sat.0 as usize] += delta_v / self.dt;
            if !maneuvers.contains(&sat) {
                maneuvers.push(sat);
            }
        }

        let mut next_pos = Vec::with_capacity(positions.len());
        let mut next_vel = Vec::with_capacity(velocities.len());
        for i in 0..positions.len() {
            let forecast = i
                .checked_sub(np)
                .and_then(|s| forecasts.get(s))
                .copied()
                .flatten();
            let (p, v) = match forecast {
                Some(f) => (positions[i] + f.displacement, f.velocity),
                None => {
                    let v = velocities[i] + acc[i] * self.dt;
                    (positions[i] + v * self.dt, v)
                }
            };
            next_pos.push(p);
            next_vel.push(v);
        }

        let origin = next_pos[0];
        for p in &mut next_pos {
            *p -= origin;
        }

        let sat_pos = next_pos.split_off(np);
        let sat_vel = next_vel.split_off(np);
        Snapshot {
            timestep: prev.timestep.next(),
            planet_pos: next_pos,
            planet_vel: next_vel,
            sat_pos,
            sat_vel,
            sat_acc: acc.split_off(np),
            maneuvers,
        }
    }
}
