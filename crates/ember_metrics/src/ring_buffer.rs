//! Fixed-capacity sample window

use std::time::Duration;

pub struct RingBuffer<T> {
    samples: Vec<T>,
    capacity: usize,
    next: usize,
}

impl<T: Copy> RingBuffer<T> {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            next: 0,
        }
    }

    /// Adds a sample, overwriting the oldest once full.
    pub fn push(&mut self, sample: T) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.next] = sample;
        }
        self.next = (self.next + 1) % self.capacity;
    }

    /// Most recent sample.
    pub fn latest(&self) -> Option<T> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.samples[(self.next + self.capacity - 1) % self.capacity])
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.next = 0;
    }
}

impl RingBuffer<Duration> {
    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.samples.iter().sum();
        sum / self.samples.len() as u32
    }

    pub fn min_max(&self) -> Option<(Duration, Duration)> {
        let min = self.samples.iter().min()?;
        let max = self.samples.iter().max()?;
        Some((*min, *max))
    }
}

impl RingBuffer<f64> {
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_keeps_newest_samples() {
        let mut window = RingBuffer::new(3);
        for ms in [10, 20, 30, 40] {
            window.push(Duration::from_millis(ms));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), Duration::from_millis(30));
        assert_eq!(window.latest(), Some(Duration::from_millis(40)));
        assert_eq!(
            window.min_max(),
            Some((Duration::from_millis(20), Duration::from_millis(40)))
        );
    }

    #[test]
    fn empty_window_reports_nothing() {
        let window = RingBuffer::<f64>::new(0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.latest(), None);
        assert_eq!(window.average(), 0.0);
    }
}
