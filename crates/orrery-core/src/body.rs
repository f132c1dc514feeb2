//! Body descriptors, burn maneuvers, and the name registry.

use glam::DVec3;
use indexmap::IndexMap;

use crate::id::TimeStep;

/// Whether a body is a massive planet or a steerable satellite.
///
/// Planets are always advanced by the physics stepper. Satellites may
/// carry burn maneuvers and may be driven by a [`Predictor`](crate::Predictor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyKind {
    /// A massive body; index 0 is the primary every snapshot is centred on.
    Planet,
    /// A light body that may execute burns.
    Satellite,
}

/// An immutable simulated body.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    /// Unique display name.
    pub name: String,
    /// Mass in kilograms.
    pub mass: f64,
    /// Planet or satellite.
    pub kind: BodyKind,
}

/// A one-time velocity impulse scheduled on a satellite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurnManeuver {
    /// The timestep whose snapshot first reflects the burn.
    pub at_timestep: TimeStep,
    /// Velocity change in m/s.
    pub delta_v: DVec3,
}

impl BurnManeuver {
    /// Create a maneuver firing at `at_timestep`.
    pub fn new(at_timestep: impl Into<TimeStep>, delta_v: DVec3) -> Self {
        Self {
            at_timestep: at_timestep.into(),
            delta_v,
        }
    }
}

/// Ordered registry of body names.
///
/// Planets come first, then satellites. The position of a name in the
/// registry matches the position of that body's data in a
/// [`Snapshot`](crate::Snapshot) (planet and satellite blocks
/// concatenated).
#[derive(Clone, Debug, Default)]
pub struct BodyRegistry {
    bodies: IndexMap<String, Body>,
    planets: usize,
}

impl BodyRegistry {
    /// Build a registry from planets then satellites.
    ///
    /// Returns the first duplicated name on conflict.
    pub fn new(planets: Vec<Body>, satellites: Vec<Body>) -> Result<Self, String> {
        let mut bodies = IndexMap::with_capacity(planets.len() + satellites.len());
        let planet_count = planets.len();
        for body in planets.into_iter().chain(satellites) {
            if bodies.contains_key(&body.name) {
                return Err(body.name);
            }
            bodies.insert(body.name.clone(), body);
        }
        Ok(Self {
            bodies,
            planets: planet_count,
        })
    }

    /// Number of planets.
    pub fn planet_count(&self) -> usize {
        self.planets
    }

    /// Number of satellites.
    pub fn satellite_count(&self) -> usize {
        self.bodies.len() - self.planets
    }

    /// All names in snapshot order.
    pub fn names(&self) -> Vec<String> {
        self.bodies.keys().cloned().collect()
    }

    /// Masses in snapshot order.
    pub fn masses(&self) -> Vec<f64> {
        self.bodies.values().map(|b| b.mass).collect()
    }

    /// Position of `name` in snapshot order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.bodies.get_index_of(name)
    }

    /// Look up a body by name.
    pub fn get(&self, name: &str) -> Option<&Body> {
        self.bodies.get(name)
    }

    /// Iterate bodies in snapshot order.
    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, kind: BodyKind) -> Body {
        Body {
            name: name.into(),
            mass: 1.0,
            kind,
        }
    }

    #[test]
    fn registry_orders_planets_before_satellites() {
        let reg = BodyRegistry::new(
            vec![body("sun", BodyKind::Planet), body("earth", BodyKind::Planet)],
            vec![body("probe", BodyKind::Satellite)],
        )
        .unwrap();
        assert_eq!(reg.names(), vec!["sun", "earth", "probe"]);
        assert_eq!(reg.planet_count(), 2);
        assert_eq!(reg.satellite_count(), 1);
        assert_eq!(reg.index_of("probe"), Some(2));
        assert_eq!(reg.get("earth").map(|b| b.kind), Some(BodyKind::Planet));
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let err = BodyRegistry::new(
            vec![body("sun", BodyKind::Planet)],
            vec![body("sun", BodyKind::Satellite)],
        )
        .unwrap_err();
        assert_eq!(err, "sun");
    }
}
