//! Math utilities
//!
//! Re-exports glam with the steering helpers and the seedable random source
//! shared by the simulation crates.

pub use glam::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Random source used by every probabilistic decision in the simulation.
///
/// All randomness flows through one generator so a fixed seed replays a run
/// exactly.
pub type SimRng = StdRng;

/// Build the simulation RNG. `None` seeds from OS entropy.
pub fn sim_rng(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Scale `v` down so its length does not exceed `cap`.
#[inline]
pub fn clamp_speed(v: &mut Vec2, cap: f32) {
    let speed = v.length();
    if speed > cap {
        *v *= cap / speed;
    }
}

/// Unit vector from `from` toward `to` plus the distance between them.
///
/// Coincident points report a tiny distance along +x so callers can divide
/// safely.
#[inline]
pub fn direction_to(from: Vec2, to: Vec2) -> (Vec2, f32) {
    let delta = to - from;
    let distance = delta.length();
    if distance > 0.0 {
        (delta / distance, distance)
    } else {
        (Vec2::X, 0.0001)
    }
}
