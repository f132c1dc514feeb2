//! The [`Snapshot`] state record and its [`SystemLayout`].

use glam::DVec3;
use smallvec::SmallVec;

use crate::id::{SatelliteIndex, TimeStep};

/// Body counts of a simulated system.
///
/// Every snapshot, cache, and archive is bound to one layout and rejects
/// data of another shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SystemLayout {
    /// Number of planets.
    pub planets: usize,
    /// Number of satellites.
    pub satellites: usize,
}

impl SystemLayout {
    /// Total body count.
    pub fn bodies(&self) -> usize {
        self.planets + self.satellites
    }
}

/// Complete state of every body at one timestep.
///
/// Positions are expressed in a frame re-centred each step so that the
/// primary (planet 0) sits at the origin. Snapshots are immutable once
/// produced and are shared as `Arc<Snapshot>`.
#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// The timestep this state belongs to.
    pub timestep: TimeStep,
    /// Planet positions in metres.
    pub planet_pos: Vec<DVec3>,
    /// Planet velocities in m/s.
    pub planet_vel: Vec<DVec3>,
    /// Satellite positions in metres.
    pub sat_pos: Vec<DVec3>,
    /// Satellite velocities in m/s.
    pub sat_vel: Vec<DVec3>,
    /// Acceleration applied to each satellite during the step that
    /// produced this snapshot, burns included.
    pub sat_acc: Vec<DVec3>,
    /// Satellites whose burn fired on the step that produced this snapshot.
    pub maneuvers: SmallVec<[SatelliteIndex; 4]>,
}

impl Snapshot {
    /// The body counts of this snapshot.
    pub fn layout(&self) -> SystemLayout {
        SystemLayout {
            planets: self.planet_pos.len(),
            satellites: self.sat_pos.len(),
        }
    }

    /// Whether every per-body vector has the length `layout` demands.
    pub fn matches(&self, layout: SystemLayout) -> bool {
        self.planet_pos.len() == layout.planets
            && self.planet_vel.len() == layout.planets
            && self.sat_pos.len() == layout.satellites
            && self.sat_vel.len() == layout.satellites
            && self.sat_acc.len() == layout.satellites
    }

    /// Positions of all bodies, planets first.
    pub fn positions(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.planet_pos.iter().chain(&self.sat_pos).copied()
    }

    /// Velocities of all bodies, planets first.
    pub fn velocities(&self) -> impl Iterator<Item = DVec3> + '_ {
        self.planet_vel.iter().chain(&self.sat_vel).copied()
    }

    /// Whether satellite `sat` executed a burn on this step.
    pub fn burn_fired(&self, sat: SatelliteIndex) -> bool {
        self.maneuvers.contains(&sat)
    }

    /// Whether every component of every vector is finite.
    pub fn is_finite(&self) -> bool {
        self.positions()
            .chain(self.velocities())
            .chain(self.sat_acc.iter().copied())
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn two_body() -> Snapshot {
        Snapshot {
            timestep: TimeStep(1),
            planet_pos: vec![DVec3::ZERO, DVec3::X],
            planet_vel: vec![DVec3::ZERO, DVec3::Y],
            sat_pos: vec![DVec3::new(2.0, 0.0, 0.0)],
            sat_vel: vec![DVec3::Y],
            sat_acc: vec![DVec3::ZERO],
            maneuvers: smallvec![SatelliteIndex(0)],
        }
    }

    #[test]
    fn layout_counts_bodies() {
        let snap = two_body();
        let layout = snap.layout();
        assert_eq!(layout.planets, 2);
        assert_eq!(layout.satellites, 1);
        assert_eq!(layout.bodies(), 3);
        assert!(snap.matches(layout));
    }

    #[test]
    fn mismatched_acc_length_fails_match() {
        let mut snap = two_body();
        snap.sat_acc.clear();
        assert!(!snap.matches(snap.layout()));
    }

    #[test]
    fn positions_are_planets_then_satellites() {
        let snap = two_body();
        let xs: Vec<f64> = snap.positions().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn burn_flag_and_finiteness() {
        let mut snap = two_body();
        assert!(snap.burn_fired(SatelliteIndex(0)));
        assert!(snap.is_finite());
        snap.sat_vel[0].z = f64::NAN;
        assert!(!snap.is_finite());
    }
}
