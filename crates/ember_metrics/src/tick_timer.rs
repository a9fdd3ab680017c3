//! Rolling tick timing

use super::ring_buffer::RingBuffer;
use std::time::{Duration, Instant};

pub struct FrameTimer {
    started: Option<Instant>,
    samples: RingBuffer<Duration>,
    ticks: u64,
}

impl FrameTimer {
    /// Averages over the last `window` ticks.
    pub fn new(window: usize) -> Self {
        Self {
            started: None,
            samples: RingBuffer::new(window),
            ticks: 0,
        }
    }

    pub fn begin(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Records the time since `begin`. Without a matching `begin` nothing is
    /// recorded.
    pub fn end(&mut self) -> Duration {
        let Some(started) = self.started.take() else {
            return Duration::ZERO;
        };
        let elapsed = started.elapsed();
        self.samples.push(elapsed);
        self.ticks += 1;
        elapsed
    }

    /// Ticks recorded since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn average(&self) -> Duration {
        self.samples.average()
    }

    /// Ticks per second the measured work could sustain.
    pub fn ticks_per_second(&self) -> f64 {
        let average = self.average().as_secs_f64();
        if average > 0.0 {
            1.0 / average
        } else {
            0.0
        }
    }

    pub fn tick_time_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }

    pub fn tick_time_range_ms(&self) -> (f64, f64) {
        let (min, max) = self.samples.min_max().unwrap_or_default();
        (min.as_secs_f64() * 1000.0, max.as_secs_f64() * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_without_begin_is_ignored() {
        let mut timer = FrameTimer::new(4);
        assert_eq!(timer.end(), Duration::ZERO);
        assert_eq!(timer.ticks(), 0);

        timer.begin();
        timer.end();
        assert_eq!(timer.ticks(), 1);
        assert!(timer.tick_time_ms() >= 0.0);
    }
}
