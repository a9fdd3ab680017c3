//! Per-system timing

use super::SystemTiming;
use std::collections::HashMap;
use std::time::Instant;

#[derive(Default)]
pub struct SystemProfiler {
    order: Vec<String>,
    timings: HashMap<String, SystemTiming>,
}

impl SystemProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_system<F, R>(&mut self, name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        if !self.timings.contains_key(name) {
            self.order.push(name.to_owned());
        }
        let timing = self.timings.entry(name.to_owned()).or_default();
        timing.calls += 1;
        timing.total += elapsed;
        timing.last = elapsed;
        result
    }

    pub fn timing(&self, name: &str) -> Option<SystemTiming> {
        self.timings.get(name).copied()
    }

    /// Timings in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, SystemTiming)> + '_ {
        self.order
            .iter()
            .filter_map(|name| self.timings.get(name).map(|t| (name.as_str(), *t)))
    }

    pub fn reset(&mut self) {
        self.order.clear();
        self.timings.clear();
    }
}
