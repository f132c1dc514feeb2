//! Pairwise Newtonian gravity.

use glam::DVec3;
use orrery_core::GRAVITATIONAL_CONSTANT;

/// Gravitational acceleration on every body from every other body.
///
/// `a_i = G * Σ_j m_j * (p_j - p_i) / r_ij³`. Coincident pairs
/// (`r_ij == 0`, which includes `i == j`) contribute nothing.
///
/// # Panics
///
/// Panics if `positions` and `masses` differ in length.
pub fn accelerations(positions: &[DVec3], masses: &[f64]) -> Vec<DVec3> {
    assert_eq!(
        positions.len(),
        masses.len(),
        "one mass per position required"
    );
    let n = positions.len();
    let mut acc = vec![DVec3::ZERO; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = positions[j] - positions[i];
            let r2 = d.length_squared();
            if r2 == 0.0 {
                continue;
            }
            let inv_r3 = 1.0 / (r2 * r2.sqrt());
            let pull = d * (GRAVITATIONAL_CONSTANT * inv_r3);
            acc[i] += pull * masses[j];
            acc[j] -= pull * masses[i];
        }
    }
    acc
}
