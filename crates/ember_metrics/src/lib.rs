//! Ember Metrics - tick and system timing
//!
//! Instrumentation used by the runtime's tick loop. Everything here compiles
//! to no-op stubs unless the `metrics` feature is enabled.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use ember_metrics::{FrameTimer, SystemProfiler};
//!
//! let mut timer = FrameTimer::new(120);
//! let mut profiler = SystemProfiler::new();
//! timer.begin();
//! profiler.time_system("movement", || step());
//! timer.end();
//! println!("tick: {:.3} ms", timer.tick_time_ms());
//! ```

use std::time::Duration;

#[cfg(feature = "metrics")]
mod counter;
#[cfg(feature = "metrics")]
mod ring_buffer;
#[cfg(feature = "metrics")]
mod system_profiler;
#[cfg(feature = "metrics")]
mod tick_timer;

#[cfg(feature = "metrics")]
pub use counter::Counter;
#[cfg(feature = "metrics")]
pub use ring_buffer::RingBuffer;
#[cfg(feature = "metrics")]
pub use system_profiler::SystemProfiler;
#[cfg(feature = "metrics")]
pub use tick_timer::FrameTimer;

/// Whether instrumentation is compiled in.
pub const ENABLED: bool = cfg!(feature = "metrics");

/// Accumulated timing of one named system.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemTiming {
    pub calls: u64,
    pub total: Duration,
    pub last: Duration,
}

impl SystemTiming {
    pub fn average(&self) -> Duration {
        if self.calls == 0 {
            Duration::ZERO
        } else {
            self.total / self.calls as u32
        }
    }
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
pub struct FrameTimer;

#[cfg(not(feature = "metrics"))]
impl FrameTimer {
    pub fn new(_window: usize) -> Self { Self }
    pub fn begin(&mut self) {}
    pub fn end(&mut self) -> Duration { Duration::ZERO }
    pub fn ticks(&self) -> u64 { 0 }
    pub fn average(&self) -> Duration { Duration::ZERO }
    pub fn ticks_per_second(&self) -> f64 { 0.0 }
    pub fn tick_time_ms(&self) -> f64 { 0.0 }
    pub fn tick_time_range_ms(&self) -> (f64, f64) { (0.0, 0.0) }
}

#[cfg(not(feature = "metrics"))]
pub struct RingBuffer<T>(std::marker::PhantomData<T>);

#[cfg(not(feature = "metrics"))]
impl<T> RingBuffer<T> {
    pub fn new(_capacity: usize) -> Self { Self(std::marker::PhantomData) }
    pub fn push(&mut self, _sample: T) {}
    pub fn latest(&self) -> Option<T> { None }
    pub fn len(&self) -> usize { 0 }
    pub fn is_empty(&self) -> bool { true }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub fn new() -> Self { Self }
    pub fn increment(&mut self, _name: &'static str, _by: u64) {}
    pub fn set(&mut self, _name: &'static str, _value: u64) {}
    pub fn get(&self, _name: &str) -> u64 { 0 }
    pub fn reset_all(&mut self) {}
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ { std::iter::empty() }
}

#[cfg(not(feature = "metrics"))]
#[derive(Default)]
pub struct SystemProfiler;

#[cfg(not(feature = "metrics"))]
impl SystemProfiler {
    pub fn new() -> Self { Self }
    pub fn time_system<F, R>(&mut self, _name: &str, f: F) -> R where F: FnOnce() -> R { f() }
    pub fn timing(&self, _name: &str) -> Option<SystemTiming> { None }
    pub fn iter(&self) -> impl Iterator<Item = (&str, SystemTiming)> + '_ { std::iter::empty() }
    pub fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_surface_is_available_in_both_modes() {
        let mut timer = FrameTimer::new(60);
        timer.begin();
        timer.end();
        let mut counter = Counter::new();
        counter.increment("ticks", 1);
        let mut profiler = SystemProfiler::new();
        assert_eq!(profiler.time_system("noop", || 3), 3);
        let _ = RingBuffer::<f64>::new(8);
    }

    #[test]
    fn timing_average_handles_zero_calls() {
        assert_eq!(SystemTiming::default().average(), Duration::ZERO);
        let timing = SystemTiming {
            calls: 4,
            total: Duration::from_millis(8),
            last: Duration::from_millis(1),
        };
        assert_eq!(timing.average(), Duration::from_millis(2));
    }
}
