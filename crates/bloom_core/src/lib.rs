//! Bloom Core
//!
//! Shared foundations for the simulation crates:
//! - Simulated clock with a fixed 60Hz tick
//! - Vector math (glam) and small steering helpers
//! - Seedable random source

pub mod math;
pub mod time;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
