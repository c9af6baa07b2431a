//! Per-tick wall time

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct TickTimer {
    tick_start: Instant,
    tick_times: RingBuffer<Duration>,
}

impl TickTimer {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick_start: Instant::now(),
            tick_times: RingBuffer::new(capacity),
        }
    }

    pub fn begin(&mut self) {
        self.tick_start = Instant::now();
    }

    pub fn end(&mut self) {
        self.tick_times.push(self.tick_start.elapsed());
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.tick_times.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.tick_times.min_max();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}
