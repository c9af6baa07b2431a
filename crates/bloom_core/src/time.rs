//! Simulated time
//!
//! Fixed 60Hz tick rate. All simulation timestamps are milliseconds on this
//! clock; nothing inside the simulation reads the wall clock.

use std::time::Duration;

/// Fixed simulation tick rate (60 Hz = 16.666ms per tick)
pub const TICK_RATE_HZ: u32 = 60;
pub const TICK_DURATION: Duration = Duration::from_micros(16_666); // ~16.666ms

/// Timestamp or span on the simulated clock, in milliseconds.
pub type Millis = f64;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self {
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Advance by one fixed tick.
    pub fn advance_tick(&mut self) {
        self.advance(TICK_DURATION);
    }

    /// Advance by an arbitrary frame delta (display refresh driven callers).
    pub fn advance(&mut self, dt: Duration) {
        self.tick_count += 1;
        self.accumulated_time += dt;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }

    /// Current timestamp in milliseconds.
    pub fn now_ms(&self) -> Millis {
        self.accumulated_time.as_secs_f64() * 1000.0
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}
