//! Strongly-typed identifiers.

use std::fmt;
use std::ops::Range;

/// Absolute simulation timestep.
///
/// Timestep 1 is the initial configuration; each step advances the
/// simulation by one `dt`. Timestep 0 is never produced and is used as
/// the "nothing archived yet" sentinel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimeStep(pub u64);

impl TimeStep {
    /// The timestep of the initial configuration.
    pub const FIRST: TimeStep = TimeStep(1);

    /// The timestep immediately after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The timestep `n` steps after this one.
    pub fn advance(self, n: u64) -> Self {
        Self(self.0 + n)
    }

    /// The timestep `n` steps before this one, saturating at zero.
    pub fn rewind(self, n: u64) -> Self {
        Self(self.0.saturating_sub(n))
    }

    /// Half-open range of `len` timesteps starting here.
    pub fn span(self, len: u64) -> Range<u64> {
        self.0..self.0 + len
    }
}

impl fmt::Display for TimeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TimeStep {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Index of a satellite within the satellite block of a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SatelliteIndex(pub u32);

impl fmt::Display for SatelliteIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SatelliteIndex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
