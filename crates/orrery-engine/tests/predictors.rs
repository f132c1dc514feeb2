//! Serving with a predictor: fallback, policy, and throttling.

use std::sync::Arc;
use std::time::Duration;

use orrery_archive::snapshot_hash;
use orrery_core::TimeStep;
use orrery_engine::{EngineConfig, PredictorPolicy, QueueConfig, TimeController};
use orrery_test_utils::{
    sun_earth_satellite, CoastPredictor, FailingPredictor, ShortPredictor, SlowPredictor,
};

fn small_queue(cfg: &mut EngineConfig) {
    cfg.queue = QueueConfig {
        output_capacity: 16,
        pre_buffer_capacity: 64,
        low_water_mark: 4,
    };
    cfg.cache_capacity = 24;
}

#[test]
fn failing_predictor_serves_physics_frames() {
    let mut physics_cfg = EngineConfig::new(sun_earth_satellite());
    small_queue(&mut physics_cfg);
    let mut failing_cfg =
        EngineConfig::new(sun_earth_satellite()).with_predictor(Arc::new(FailingPredictor));
    small_queue(&mut failing_cfg);

    let mut physics = TimeController::new(physics_cfg).unwrap();
    let mut failing = TimeController::new(failing_cfg).unwrap();
    for _ in 0..80 {
        let a = physics.next_state().unwrap().snapshot;
        let b = failing.next_state().unwrap().snapshot;
        assert_eq!(a.timestep, b.timestep);
        assert_eq!(snapshot_hash(&a), snapshot_hash(&b));
    }

    let report = failing.shutdown();
    let producer = report.producer.unwrap();
    assert_eq!(producer.predictor_fallbacks, 1);
    assert!(!producer.predictor_active);
}

#[test]
fn retry_policy_keeps_consulting_the_predictor() {
    let mut cfg = EngineConfig::new(sun_earth_satellite()).with_predictor(Arc::new(ShortPredictor));
    cfg.predictor_policy = PredictorPolicy::RetryEachBlock;
    small_queue(&mut cfg);

    let mut engine = TimeController::new(cfg).unwrap();
    for _ in 0..40 {
        engine.next_state().unwrap();
    }
    assert!(engine.metrics().predictor_fallbacks >= 4);
    let report = engine.shutdown();
    assert!(report.producer.unwrap().predictor_active);
}

#[test]
fn predicted_frames_are_reproducible_after_rewind() {
    let mut cfg = EngineConfig::new(sun_earth_satellite())
        .with_predictor(Arc::new(CoastPredictor::new(orrery_core::DEFAULT_DT)));
    small_queue(&mut cfg);

    let mut engine = TimeController::new(cfg).unwrap();
    let served: Vec<_> = (0..100)
        .map(|_| engine.next_state().unwrap().snapshot)
        .collect();
    assert_eq!(engine.metrics().predictor_fallbacks, 0);

    engine.set_time_step(TimeStep(12)).unwrap();
    for expected in &served[7..40] {
        let frame = engine.next_state().unwrap().snapshot;
        assert_eq!(frame.timestep, expected.timestep);
        assert_eq!(snapshot_hash(&frame), snapshot_hash(expected));
    }
}

#[test]
fn slow_producer_asks_consumer_to_slow_down() {
    let slow = SlowPredictor::new(
        CoastPredictor::new(orrery_core::DEFAULT_DT),
        Duration::from_millis(20),
    );
    let mut cfg = EngineConfig::new(sun_earth_satellite()).with_predictor(Arc::new(slow));
    small_queue(&mut cfg);

    let mut engine = TimeController::new(cfg).unwrap();
    let throttled = (0..60)
        .map(|_| engine.next_state().unwrap().slow_down)
        .filter(|&slow| slow)
        .count();
    assert!(throttled > 0);
    assert!(engine.max_fps() <= 50.0);
}
