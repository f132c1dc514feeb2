//! Error types shared across the workspace.

use std::error::Error;
use std::fmt;

use crate::id::TimeStep;

/// Errors reported by a [`Predictor`](crate::Predictor).
///
/// Any of these makes the producer fall back to physics for the
/// affected block.
#[derive(Clone, Debug, PartialEq)]
pub enum PredictorError {
    /// The model failed to run.
    InferenceFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The history window did not have the length the model expects.
    HistoryLength {
        /// Samples the model needs.
        expected: usize,
        /// Samples supplied.
        got: usize,
    },
    /// The model returned the wrong number of forecast steps.
    HorizonMismatch {
        /// Steps the engine asked for.
        expected: usize,
        /// Steps returned.
        got: usize,
    },
    /// A forecast contained NaN or infinity.
    NonFinite {
        /// Forecast step (0-based) holding the first bad value.
        step: usize,
    },
}

impl fmt::Display for PredictorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InferenceFailed { reason } => write!(f, "inference failed: {reason}"),
            Self::HistoryLength { expected, got } => {
                write!(f, "history length {got}, model expects {expected}")
            }
            Self::HorizonMismatch { expected, got } => {
                write!(f, "forecast has {got} steps, expected {expected}")
            }
            Self::NonFinite { step } => write!(f, "non-finite forecast at step {step}"),
        }
    }
}

impl Error for PredictorError {}

/// Errors from the in-memory state cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheError {
    /// The requested timestep is outside the cached window.
    OutOfRange {
        /// The requested timestep.
        requested: TimeStep,
        /// First cached timestep, if any.
        base: Option<TimeStep>,
        /// Number of cached snapshots.
        len: usize,
    },
    /// Fewer snapshots are cached than were asked for.
    InsufficientHistory {
        /// Snapshots requested.
        requested: usize,
        /// Snapshots available.
        available: usize,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                requested,
                base: Some(base),
                len,
            } => write!(
                f,
                "timestep {requested} outside cache window [{base}, {})",
                base.0 + *len as u64
            ),
            Self::OutOfRange {
                requested,
                base: None,
                ..
            } => write!(f, "timestep {requested} requested from an empty cache"),
            Self::InsufficientHistory {
                requested,
                available,
            } => write!(
                f,
                "requested {requested} snapshots of history, {available} cached"
            ),
        }
    }
}

impl Error for CacheError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_names_window() {
        let err = CacheError::OutOfRange {
            requested: TimeStep(3),
            base: Some(TimeStep(10)),
            len: 5,
        };
        assert_eq!(err.to_string(), "timestep 3 outside cache window [10, 15)");
    }

    #[test]
    fn predictor_error_display() {
        let err = PredictorError::HorizonMismatch {
            expected: 10,
            got: 3,
        };
        assert!(err.to_string().contains("expected 10"));
    }
}
