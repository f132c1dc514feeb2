//! Computation of one block of future snapshots.

use std::sync::Arc;

use orrery_core::{
    check_forecast, Forecast, Predictor, PredictorError, PredictorSample, SatelliteIndex, Snapshot,
};
use orrery_physics::{BurnBlock, PhysicsStepper};

/// Result of [`compute_block`].
#[derive(Debug)]
pub struct BlockOutput {
    /// The block's snapshots, in timestep order.
    pub snapshots: Vec<Snapshot>,
    /// Set when a predictor was supplied but the block fell back to
    /// physics.
    pub fallback: Option<PredictorError>,
}

/// Compute `burns.len()` snapshots following the last entry of `history`.
///
/// `history` holds the most recent snapshots, oldest first, and must end at
/// `burns.start() - 1`. With a predictor, every satellite's
/// `(mass, acceleration, velocity)` history is forecast for the whole
/// block and planets advance with physics. If any forecast fails, has the
/// wrong length, or is non-finite, the whole block is recomputed with
/// physics and the error is returned in [`BlockOutput::fallback`].
///
/// # Panics
///
/// Panics if `history` is empty.
pub fn compute_block(
    stepper: &PhysicsStepper,
    predictor: Option<&dyn Predictor>,
    history: &[Arc<Snapshot>],
    burns: &BurnBlock,
) -> BlockOutput {
    let Some(last) = history.last() else {
        panic!("compute_block needs at least one snapshot of history");
    };
    debug_assert_eq!(last.timestep.next(), burns.start());

    let Some(predictor) = predictor else {
        return BlockOutput {
            snapshots: physics_block(stepper, last, burns),
            fallback: None,
        };
    };

    match forecast_all(stepper, predictor, history, burns.len()) {
        Ok(forecasts) => BlockOutput {
            snapshots: predicted_block(stepper, last, burns, &forecasts),
            fallback: None,
        },
        Err(err) => BlockOutput {
            snapshots: physics_block(stepper, last, burns),
            fallback: Some(err),
        },
    }
}

fn physics_block(stepper: &PhysicsStepper, last: &Snapshot, burns: &BurnBlock) -> Vec<Snapshot> {
    let mut out: Vec<Snapshot> = Vec::with_capacity(burns.len());
    for _ in 0..burns.len() {
        let prev = out.last().unwrap_or(last);
        let next = stepper.step(prev, burns.at(prev.timestep.next()));
        out.push(next);
    }
    out
}

/// Per-satellite forecasts, each exactly `horizon` long and finite.
fn forecast_all(
    stepper: &PhysicsStepper,
    predictor: &dyn Predictor,
    history: &[Arc<Snapshot>],
    horizon: usize,
) -> Result<Vec<Vec<Forecast>>, PredictorError> {
    let satellites = stepper.layout().satellites;
    let mut forecasts = Vec::with_capacity(satellites);
    for s in 0..satellites {
        let sat = SatelliteIndex(s as u32);
        let mass = stepper.satellite_mass(sat);
        let samples: Vec<PredictorSample> = history
            .iter()
            .map(|snap| PredictorSample {
                mass,
                acceleration: snap.sat_acc[s],
                velocity: snap.sat_vel[s],
            })
            .collect();
        let forecast = predictor.predict(&samples, horizon)?;
        check_forecast(&forecast, horizon)?;
        forecasts.push(forecast);
    }
    Ok(forecasts)
}

fn predicted_block(
    stepper: &PhysicsStepper,
    last: &Snapshot,
    burns: &BurnBlock,
    forecasts: &[Vec<Forecast>],
) -> Vec<Snapshot> {
    let mut out: Vec<Snapshot> = Vec::with_capacity(burns.len());
    let mut step_forecasts: Vec<Option<Forecast>> = vec![None; forecasts.len()];
    for i in 0..burns.len() {
        for (slot, forecast) in step_forecasts.iter_mut().zip(forecasts) {
            *slot = Some(forecast[i]);
        }
        let prev = out.last().unwrap_or(last);
        let next = stepper.predicted_step(prev, burns.at(prev.timestep.next()), &step_forecasts);
        out.push(next);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::{TimeStep, DEFAULT_DT};
    use orrery_physics::BurnSchedule;
    use orrery_test_utils::{
        sun_earth_satellite, CoastPredictor, CountingPredictor, FailingPredictor, ShortPredictor,
    };

    fn setup() -> (PhysicsStepper, Vec<Arc<Snapshot>>) {
        let cfg = sun_earth_satellite();
        let stepper = PhysicsStepper::new(cfg.masses(), cfg.layout(), DEFAULT_DT);
        let mut history = vec![Arc::new(cfg.initial_snapshot())];
        for _ in 0..3 {
            let next = stepper.step(history.last().unwrap(), &[]);
            history.push(Arc::new(next));
        }
        (stepper, history)
    }

    fn no_burns(len: usize) -> BurnBlock {
        BurnSchedule::new(vec![Vec::new()]).take_block(TimeStep(5), len)
    }

    #[test]
    fn physics_block_is_contiguous() {
        let (stepper, history) = setup();
        let out = compute_block(&stepper, None, &history, &no_burns(10));
        assert!(out.fallback.is_none());
        let ts: Vec<u64> = out.snapshots.iter().map(|s| s.timestep.0).collect();
        assert_eq!(ts, (5..15).collect::<Vec<_>>());
    }

    #[test]
    fn physics_block_matches_stepping() {
        let (stepper, history) = setup();
        let out = compute_block(&stepper, None, &history, &no_burns(3));
        let manual = stepper.step(history.last().unwrap(), &[]);
        assert_eq!(out.snapshots[0], manual);
    }

    #[test]
    fn predictor_sees_full_history_once_per_satellite() {
        let (stepper, history) = setup();
        let counting = CountingPredictor::new(CoastPredictor::new(DEFAULT_DT));
        let calls = counting.calls();
        let seen = counting.last_history_len();
        let out = compute_block(&stepper, Some(&counting), &history, &no_burns(10));
        assert!(out.fallback.is_none());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 4);
        assert_eq!(out.snapshots.len(), 10);
    }

    #[test]
    fn coast_forecast_moves_satellite_by_velocity() {
        let (stepper, history) = setup();
        let predictor = CoastPredictor::new(DEFAULT_DT);
        let out = compute_block(&stepper, Some(&predictor), &history, &no_burns(2));
        let first = &out.snapshots[0];
        assert_eq!(first.sat_vel[0], history[3].sat_vel[0]);
        assert!(first.is_finite());
    }

    #[test]
    fn failing_predictor_falls_back_to_physics() {
        let (stepper, history) = setup();
        let out = compute_block(&stepper, Some(&FailingPredictor), &history, &no_burns(10));
        match out.fallback {
            Some(PredictorError::InferenceFailed { .. }) => {}
            other => panic!("expected InferenceFailed, got {other:?}"),
        }
        let physics = compute_block(&stepper, None, &history, &no_burns(10));
        assert_eq!(out.snapshots, physics.snapshots);
    }

    #[test]
    fn short_forecast_falls_back_to_physics() {
        let (stepper, history) = setup();
        let out = compute_block(&stepper, Some(&ShortPredictor), &history, &no_burns(10));
        match out.fallback {
            Some(PredictorError::HorizonMismatch { expected, got }) => {
                assert_eq!(expected, 10);
                assert_eq!(got, 9);
            }
            other => panic!("expected HorizonMismatch, got {other:?}"),
        }
        assert_eq!(out.snapshots.len(), 10);
    }
}
