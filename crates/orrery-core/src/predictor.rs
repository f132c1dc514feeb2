//! The [`Predictor`] capability.
//!
//! A predictor refines satellite trajectories from a short window of
//! recent motion. It is consulted only for satellites; planets are always
//! advanced by physics. When no predictor is configured the engine runs
//! in physics-only mode.

use glam::DVec3;

use crate::error::PredictorError;

/// One history entry for a single satellite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredictorSample {
    /// Satellite mass in kilograms.
    pub mass: f64,
    /// Acceleration recorded at this timestep.
    pub acceleration: DVec3,
    /// Velocity at this timestep.
    pub velocity: DVec3,
}

/// One forecast step for a single satellite.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Forecast {
    /// Position change relative to the previous step, in metres.
    pub displacement: DVec3,
    /// Velocity at this step, in m/s.
    pub velocity: DVec3,
}

/// Forecasts a satellite's next `horizon` steps from its recent history.
///
/// # Contract
///
/// - `history` holds the last K samples, oldest first, where K is the
///   engine's configured history length.
/// - On success the returned vector has exactly `horizon` entries.
/// - Implementations run on a background thread and must be `Send + Sync`.
///
/// Any error, a wrong-length result, or a non-finite value causes the
/// engine to recompute the block with physics.
///
/// # Examples
///
/// A predictor that coasts at the last observed velocity:
///
/// ```
/// use orrery_core::{DVec3, Forecast, Predictor, PredictorError, PredictorSample};
///
/// struct Coast { dt: f64 }
///
/// impl Predictor for Coast {
///     fn name(&self) -> &str { "coast" }
///
///     fn predict(
///         &self,
///         history: &[PredictorSample],
///         horizon: usize,
///     ) -> Result<Vec<Forecast>, PredictorError> {
///         let last = history.last().ok_or(PredictorError::HistoryLength {
///             expected: 1,
///             got: 0,
///         })?;
///         let step = Forecast { displacement: last.velocity * self.dt, velocity: last.velocity };
///         Ok(vec![step; horizon])
///     }
/// }
///
/// let p = Coast { dt: 2.0 };
/// let sample = PredictorSample { mass: 1.0, acceleration: DVec3::ZERO, velocity: DVec3::X };
/// let out = p.predict(&[sample], 3).unwrap();
/// assert_eq!(out.len(), 3);
/// assert_eq!(out[0].displacement, DVec3::new(2.0, 0.0, 0.0));
/// ```
pub trait Predictor: Send + Sync + 'static {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Forecast `horizon` steps for one satellite.
    fn predict(
        &self,
        history: &[PredictorSample],
        horizon: usize,
    ) -> Result<Vec<Forecast>, PredictorError>;
}

/// Check a forecast against the requested horizon and finiteness.
pub fn check_forecast(forecast: &[Forecast], horizon: usize) -> Result<(), PredictorError> {
    if forecast.len() != horizon {
        return Err(PredictorError::HorizonMismatch {
            expected: horizon,
            got: forecast.len(),
        });
    }
    if let Some(step) = forecast
        .iter()
        .position(|f| !f.displacement.is_finite() || !f.velocity.is_finite())
    {
        return Err(PredictorError::NonFinite { step });
    }
    Ok(())
}
