//! FNV-1a fingerprints of snapshots and systems.
//!
//! Not cryptographic. Used for bit-identity checks in tests and to stop an
//! archive written for one system being reopened for another.

use glam::DVec3;
use orrery_core::Snapshot;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

#[inline]
fn fnv1a_u32(mut hash: u64, v: u32) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

#[inline]
fn fnv1a_u64(mut hash: u64, v: u64) -> u64 {
    for &b in &v.to_le_bytes() {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

fn fnv1a_vectors(mut hash: u64, vs: &[DVec3]) -> u64 {
    hash = fnv1a_u64(hash, vs.len() as u64);
    for v in vs {
        hash = fnv1a_u64(hash, v.x.to_bits());
        hash = fnv1a_u64(hash, v.y.to_bits());
        hash = fnv1a_u64(hash, v.z.to_bits());
    }
    hash
}

/// Hash every bit of a snapshot.
///
/// Two snapshots hash equal only if their timestep, all vector
/// components (by `f64::to_bits`) and burn flags match. `-0.0` and `0.0`
/// hash differently.
pub fn snapshot_hash(snapshot: &Snapshot) -> u64 {
    let mut hash = fnv1a_u64(FNV_OFFSET, snapshot.timestep.0);
    hash = fnv1a_vectors(hash, &snapshot.planet_pos);
    hash = fnv1a_vectors(hash, &snapshot.planet_vel);
    hash = fnv1a_vectors(hash, &snapshot.sat_pos);
    hash = fnv1a_vectors(hash, &snapshot.sat_vel);
    hash = fnv1a_vectors(hash, &snapshot.sat_acc);
    hash = fnv1a_u32(hash, snapshot.maneuvers.len() as u32);
    for sat in &snapshot.maneuvers {
        hash = fnv1a_u32(hash, sat.0);
    }
    hash
}

/// Hash the identity of a system: body names and masses in order, and the
/// step length.
pub fn system_hash<S: AsRef<str>>(names: &[S], masses: &[f64], dt: f64) -> u64 {
    let mut hash = fnv1a_u64(FNV_OFFSET, dt.to_bits());
    hash = fnv1a_u32(hash, names.len() as u32);
    for name in names {
        for &b in name.as_ref().as_bytes() {
            hash = fnv1a_byte(hash, b);
        }
        // Separator so ["ab", "c"] and ["a", "bc"] differ.
        hash = fnv1a_byte(hash, 0);
    }
    for &m in masses {
        hash = fnv1a_u64(hash, m.to_bits());
    }
    hash
}
