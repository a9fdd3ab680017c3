//! Fixed-step simulation time

use std::time::Duration;

/// Default simulation tick rate.
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;

/// Timing handed to systems on every update and draw.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickTime {
    /// Tick number, starting at 1 for the first tick.
    pub tick: u64,
    pub delta: Duration,
    pub total: Duration,
}

impl TickTime {
    #[inline]
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Fixed-rate clock driving `Runtime::tick`.
pub struct SimulationTime {
    tick_rate_hz: u32,
    tick_duration: Duration,
    tick_count: u64,
    accumulated_time: Duration,
}

impl SimulationTime {
    /// A rate of 0 is treated as 1 Hz.
    pub fn new(tick_rate_hz: u32) -> Self {
        let tick_rate_hz = tick_rate_hz.max(1);
        Self {
            tick_rate_hz,
            tick_duration: Duration::from_secs(1) / tick_rate_hz,
            tick_count: 0,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_rate_hz(&self) -> u32 {
        self.tick_rate_hz
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }

    pub fn advance_tick(&mut self) -> TickTime {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
        TickTime {
            tick: self.tick_count,
            delta: self.tick_duration,
            total: self.accumulated_time,
        }
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_by_fixed_step() {
        let mut clock = SimulationTime::new(50);
        let first = clock.advance_tick();
        let second = clock.advance_tick();

        assert_eq!(first.tick, 1);
        assert_eq!(first.delta, Duration::from_millis(20));
        assert_eq!(second.total, Duration::from_millis(40));
        assert_eq!(clock.tick_count(), 2);
    }

    #[test]
    fn zero_rate_is_clamped() {
        assert_eq!(SimulationTime::new(0).tick_duration(), Duration::from_secs(1));
    }
}
