//! Bloom Metrics - tick timing and simulation event counters
//!
//! Instrumentation compiles to no-op stubs unless the `metrics` feature is on.
//!
//! # Usage
//!
//! ```ignore
//! use bloom_metrics::{EventCounter, TickTimer};
//!
//! let mut timer = TickTimer::new(120);
//! timer.begin();
//! // ... run one simulation tick ...
//! timer.end();
//! println!("tick: {:.3}ms", timer.tick_time_ms());
//! ```

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counter::EventCounter;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use tick_timer::TickTimer;

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct TickTimer;

#[cfg(not(feature = "metrics"))]
impl TickTimer {
    pub fn new(_capacity: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) {}
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct EventCounter;

#[cfg(not(feature = "metrics"))]
impl EventCounter {
    pub fn new() -> Self { Self }
    pub fn record(&mut self, _name: &'static str, _count: usize) {}
    pub fn get(&self, _name: &'static str) -> usize { 0 }
    pub fn summary(&self) -> Vec<(&'static str, usize)> { Vec::new() }
}

#[cfg(not(feature = "metrics"))]
impl Default for EventCounter {
    fn default() -> Self {
        Self::new()
    }
}
