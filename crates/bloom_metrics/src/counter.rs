//! Named counters for simulation events (bonds, deaths, respawns)

use std::collections::BTreeMap;

#[derive(Default)]
pub struct EventCounter {
    counts: BTreeMap<&'static str, usize>,
}

impl EventCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: &'static str, count: usize) {
        if count > 0 {
            *self.counts.entry(name).or_insert(0) += count;
        }
    }

    pub fn get(&self, name: &'static str) -> usize {
        self.counts.get(name).copied().unwrap_or(0)
    }

    /// Counters in name order.
    pub fn summary(&self) -> Vec<(&'static str, usize)> {
        self.counts.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
