//! Burn maneuver scheduling.
//!
//! [`BurnSchedule`] keeps one time-ordered queue per satellite. Each
//! producer cycle calls [`take_block`](BurnSchedule::take_block) for the
//! timesteps it is about to compute; maneuvers falling in that window
//! are popped into a [`BurnBlock`] and never seen again.

use std::collections::VecDeque;

use glam::DVec3;
use orrery_core::{BurnManeuver, SatelliteIndex, TimeStep};
use smallvec::SmallVec;

/// Burns that fire on a single step: `(satellite, delta_v)` pairs.
pub type StepBurns = SmallVec<[(SatelliteIndex, DVec3); 2]>;

/// Burns for a run of consecutive timesteps.
#[derive(Clone, Debug, PartialEq)]
pub struct BurnBlock {
    start: TimeStep,
    steps: Vec<StepBurns>,
}

impl BurnBlock {
    /// A block of `len` steps from `start` with no burns.
    pub fn empty(start: TimeStep, len: usize) -> Self {
        Self {
            start,
            steps: vec![StepBurns::new(); len],
        }
    }

    /// First timestep covered.
    pub fn start(&self) -> TimeStep {
        self.start
    }

    /// Number of timesteps covered.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the block covers no timesteps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Burns firing at `timestep`; empty outside the block.
    pub fn at(&self, timestep: TimeStep) -> &[(SatelliteIndex, DVec3)] {
        timestep
            .0
            .checked_sub(self.start.0)
            .and_then(|offset| self.steps.get(offset as usize))
            .map_or(&[][..], |s| s.as_slice())
    }
}

/// Pending maneuvers for every satellite.
#[derive(Clone, Debug, Default)]
pub struct BurnSchedule {
    queues: Vec<VecDeque<BurnManeuver>>,
}

impl BurnSchedule {
    /// Build a schedule from per-satellite maneuver lists.
    ///
    /// Each list is sorted by timestep; equal timesteps keep their
    /// configured order.
    pub fn new(per_satellite: Vec<Vec<BurnManeuver>>) -> Self {
        let queues = per_satellite
            .into_iter()
            .map(|mut list| {
                list.sort_by_key(|m| m.at_timestep);
                VecDeque::from(list)
            })
            .collect();
        Self { queues }
    }

    /// Number of satellites tracked.
    pub fn satellites(&self) -> usize {
        self.queues.len()
    }

    /// Maneuvers not yet consumed.
    pub fn pending(&self) -> usize {
        self.queues.iter().map(VecDeque::len).sum()
    }

    /// Pop every maneuver firing in `[start, start + len)`.
    ///
    /// Maneuvers scheduled before `start` can no longer be applied; they
    /// are dropped with a warning.
    pub fn take_block(&mut self, start: TimeStep, len: usize) -> BurnBlock {
        let mut block = BurnBlock::empty(start, len);
        let end = start.advance(len as u64);
        for (idx, queue) in self.queues.iter_mut().enumerate() {
            let sat = SatelliteIndex(idx as u32);
            while let Some(front) = queue.front().copied() {
                if front.at_timestep >= end {
                    break;
                }
                queue.pop_front();
                if front.at_timestep < start {
                    log::warn!(
                        "dropping burn for satellite {sat} at timestep {}: already computed up to {start}",
                        front.at_timestep
                    );
                    continue;
                }
                let offset = (front.at_timestep.0 - start.0) as usize;
                block.steps[offset].push((sat, front.delta_v));
            }
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burn(at: u64, x: f64) -> BurnManeuver {
        BurnManeuver::new(at, DVec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn take_block_pops_only_window() {
        let mut sched = BurnSchedule::new(vec![vec![burn(12, 1.0), burn(5, 2.0), burn(30, 3.0)]]);
        let block = sched.take_block(TimeStep(5), 10);
        assert_eq!(block.at(TimeStep(5)), &[(SatelliteIndex(0), DVec3::new(2.0, 0.0, 0.0))]);
        assert_eq!(block.at(TimeStep(12)).len(), 1);
        assert!(block.at(TimeStep(6)).is_empty());
        assert_eq!(sched.pending(), 1);
    }

    #[test]
    fn maneuvers_are_consumed_once() {
        let mut sched = BurnSchedule::new(vec![vec![burn(3, 1.0)]]);
        assert_eq!(sched.take_block(TimeStep(2), 4).at(TimeStep(3)).len(), 1);
        assert!(sched.take_block(TimeStep(2), 4).at(TimeStep(3)).is_empty());
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn stale_maneuvers_are_dropped() {
        let mut sched = BurnSchedule::new(vec![vec![burn(2, 1.0), burn(25, 1.0)]]);
        let block = sched.take_block(TimeStep(20), 10);
        assert_eq!(sched.pending(), 0);
        assert!(block.at(TimeStep(2)).is_empty());
        assert_eq!(block.at(TimeStep(25)).len(), 1);
    }

    #[test]
    fn satellites_are_tracked_independently() {
        let mut sched = BurnSchedule::new(vec![vec![burn(4, 1.0)], vec![burn(4, -2.0), burn(4, 0.5)]]);
        let block = sched.take_block(TimeStep(4), 1);
        assert_eq!(block.at(TimeStep(4)).len(), 3);
        let total = |sat: SatelliteIndex| -> DVec3 {
            block
                .at(TimeStep(4))
                .iter()
                .filter(|(s, _)| *s == sat)
                .map(|(_, dv)| *dv)
                .sum()
        };
        assert_eq!(total(SatelliteIndex(1)), DVec3::new(-1.5, 0.0, 0.0));
        assert_eq!(total(SatelliteIndex(0)), DVec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn at_outside_block_is_empty() {
        let block = BurnBlock::empty(TimeStep(10), 3);
        assert!(block.at(TimeStep(9)).is_empty());
        assert!(block.at(TimeStep(13)).is_empty());
        assert_eq!(block.len(), 3);
        assert!(!block.is_empty());
    }
}
