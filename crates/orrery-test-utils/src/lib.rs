//! Test utilities and mock types for Orrery development.
//!
//! Provides reference systems ([`fixtures`]), mock [`Predictor`]
//! implementations, and a self-cleaning [`ScratchDir`] for archive tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orrery_core::{Forecast, Predictor, PredictorError, PredictorSample};

pub use fixtures::{single_planet, sun_earth_satellite, sun_earth_satellite_with_burns, two_planets};

/// Coasts at the last observed velocity: `displacement = velocity * dt`.
pub struct CoastPredictor {
    dt: f64,
}

impl CoastPredictor {
    pub fn new(dt: f64) -> Self {
        Self { dt }
    }
}

impl Predictor for CoastPredictor {
    fn name(&self) -> &str {
        "coast"
    }

    fn predict(
        &self,
        history: &[PredictorSample],
        horizon: usize,
    ) -> Result<Vec<Forecast>, PredictorError> {
        let last = history.last().ok_or(PredictorError::HistoryLength {
            expected: 1,
            got: 0,
        })?;
        let step = Forecast {
            displacement: last.velocity * self.dt,
            velocity: last.velocity,
        };
        Ok(vec![step; horizon])
    }
}

/// Always fails with [`PredictorError::InferenceFailed`].
pub struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn name(&self) -> &str {
        "failing"
    }

    fn predict(&self, _: &[PredictorSample], _: usize) -> Result<Vec<Forecast>, PredictorError> {
        Err(PredictorError::InferenceFailed {
            reason: "mock failure".into(),
        })
    }
}

/// Returns one step fewer than asked.
pub struct ShortPredictor;

impl Predictor for ShortPredictor {
    fn name(&self) -> &str {
        "short"
    }

    fn predict(
        &self,
        history: &[PredictorSample],
        horizon: usize,
    ) -> Result<Vec<Forecast>, PredictorError> {
        let v = history.last().map(|s| s.velocity).unwrap_or_default();
        Ok(vec![
            Forecast {
                displacement: v,
                velocity: v,
            };
            horizon.saturating_sub(1)
        ])
    }
}

/// Wraps another predictor, counting calls and recording history lengths.
pub struct CountingPredictor<P> {
    inner: P,
    calls: Arc<AtomicUsize>,
    last_history_len: Arc<AtomicUsize>,
}

impl<P: Predictor> CountingPredictor<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
            last_history_len: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared call counter, readable after the predictor moves into the engine.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Shared record of the most recent history length.
    pub fn last_history_len(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.last_history_len)
    }
}

impl<P: Predictor> Predictor for CountingPredictor<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn predict(
        &self,
        history: &[PredictorSample],
        horizon: usize,
    ) -> Result<Vec<Forecast>, PredictorError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.last_history_len
            .store(history.len(), Ordering::Relaxed);
        self.inner.predict(history, horizon)
    }
}

/// Sleeps before delegating, to simulate an expensive model.
pub struct SlowPredictor<P> {
    inner: P,
    delay: Duration,
}

impl<P: Predictor> SlowPredictor<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl<P: Predictor> Predictor for SlowPredictor<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn predict(
        &self,
        history: &[PredictorSample],
        horizon: usize,
    ) -> Result<Vec<Forecast>, PredictorError> {
        std::thread::sleep(self.delay);
        self.inner.predict(history, horizon)
    }
}

static SCRATCH_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A unique temporary directory removed on drop.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(label: &str) -> Self {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "orrery-{label}-{}-{n}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&path);
        std::fs::create_dir_all(&path).expect("create scratch dir");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
