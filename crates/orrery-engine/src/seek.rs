//! Progress reporting and cancellation for time jumps.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use orrery_core::TimeStep;

/// Cooperative cancellation flag for [`TimeController::seek`].
///
/// Clones share the flag, so one clone can be handed to a UI thread while
/// the seek polls another.
///
/// [`TimeController::seek`]: crate::TimeController::seek
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Reported after every fast-forward step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SeekProgress {
    /// Where the seek is heading.
    pub target: TimeStep,
    /// Furthest timestep computed so far.
    pub frontier: TimeStep,
    /// Completion estimate in `[0, 100]`.
    pub percent: f64,
}

/// How a seek ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The target was already computed; only the cursor moved.
    Repositioned {
        /// The timestep the next `next_state()` serves.
        target: TimeStep,
    },
    /// The frontier was advanced to reach the target.
    FastForwarded {
        /// The timestep the next `next_state()` serves.
        target: TimeStep,
        /// Frontier steps taken.
        steps: u64,
    },
    /// The seek was cancelled; the cursor went back to where it was and
    /// took one more step.
    Cancelled {
        /// The timestep the next `next_state()` serves.
        restored: TimeStep,
        /// Frontier steps taken before cancellation; they stay computed.
        steps: u64,
    },
}

impl SeekOutcome {
    /// The timestep the next `next_state()` call will serve.
    pub fn next_timestep(&self) -> TimeStep {
        match *self {
            Self::Repositioned { target } | Self::FastForwarded { target, .. } => target,
            Self::Cancelled { restored, .. } => restored,
        }
    }
}

/// Completion estimate counting queued snapshots as done.
pub(crate) fn percent_done(
    frontier: TimeStep,
    queued: usize,
    target: TimeStep,
    queue_capacity: usize,
) -> f64 {
    let done = (frontier.0 + queued as u64) as f64;
    let total = (target.0 + queue_capacity as u64) as f64;
    (done / total * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn percent_is_bounded() {
        assert_eq!(percent_done(TimeStep(0), 0, TimeStep(100), 100), 0.0);
        assert_eq!(percent_done(TimeStep(100), 100, TimeStep(100), 100), 100.0);
        assert_eq!(percent_done(TimeStep(500), 100, TimeStep(100), 100), 100.0);
        let mid = percent_done(TimeStep(50), 50, TimeStep(100), 100);
        assert!((mid - 50.0).abs() < 1e-12);
    }

    #[test]
    fn outcome_reports_next_timestep() {
        assert_eq!(
            SeekOutcome::Cancelled {
                restored: TimeStep(9),
                steps: 3
            }
            .next_timestep(),
            TimeStep(9)
        );
        assert_eq!(
            SeekOutcome::Repositioned {
                target: TimeStep(6)
            }
            .next_timestep(),
            TimeStep(6)
        );
    }
}
