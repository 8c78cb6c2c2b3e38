//! Streaming signal smoothing for the phase tracker.
//!
//! The tracker sees one frame at a time, so smoothing is a trailing moving
//! average over the last few defined samples. Undefined samples are simply
//! not pushed: the signal holds its last value across an occlusion.

use std::collections::VecDeque;

/// Number of smoothed values retained for velocity lookups.
const HISTORY: usize = 16;

/// Trailing moving average over a scalar signal.
#[derive(Debug, Clone)]
pub struct SignalSmoother {
    window: usize,
    raw: VecDeque<f64>,
    smoothed: VecDeque<f64>,
}

impl SignalSmoother {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            raw: VecDeque::with_capacity(window),
            smoothed: VecDeque::with_capacity(HISTORY),
        }
    }

    /// Push a raw sample and return the new smoothed value.
    pub fn push(&mut self, value: f64) -> f64 {
        if self.raw.len() == self.window {
            self.raw.pop_front();
        }
        self.raw.push_back(value);
        let value = mean(self.raw.make_contiguous());

        if self.smoothed.len() == HISTORY {
            self.smoothed.pop_front();
        }
        self.smoothed.push_back(value);
        value
    }

    /// Latest smoothed value.
    pub fn current(&self) -> Option<f64> {
        self.smoothed.back().copied()
    }

    /// Smoothed change over the last sample.
    pub fn delta(&self) -> Option<f64> {
        self.change_over(1)
    }

    /// Smoothed change over the last `samples` samples, falling back to the
    /// oldest retained value when the history is shorter.
    pub fn change_over(&self, samples: usize) -> Option<f64> {
        let len = self.smoothed.len();
        if len < 2 || samples == 0 {
            return None;
        }
        let back = samples.min(len - 1);
        Some(self.smoothed[len - 1] - self.smoothed[len - 1 - back])
    }

    pub fn len(&self) -> usize {
        self.smoothed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.smoothed.is_empty()
    }

    pub fn clear(&mut self) {
        self.raw.clear();
        self.smoothed.clear();
    }
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_mean() {
        let mut s = SignalSmoother::new(3);
        assert_eq!(s.push(3.0), 3.0);
        assert_eq!(s.push(6.0), 4.5);
        assert_eq!(s.push(9.0), 6.0);
        assert_eq!(s.push(12.0), 9.0);
        assert_eq!(s.current(), Some(9.0));
    }

    #[test]
    fn test_delta_and_change_over() {
        let mut s = SignalSmoother::new(1);
        assert_eq!(s.delta(), None);
        for v in [1.0, 2.0, 4.0, 7.0] {
            s.push(v);
        }
        assert_eq!(s.delta(), Some(3.0));
        assert_eq!(s.change_over(2), Some(5.0));
        // Clamped to the oldest sample
        assert_eq!(s.change_over(10), Some(6.0));
    }

    #[test]
    fn test_history_is_bounded() {
        let mut s = SignalSmoother::new(1);
        for i in 0..100 {
            s.push(i as f64);
        }
        assert_eq!(s.len(), HISTORY);
        assert_eq!(s.change_over(100), Some((HISTORY - 1) as f64));
    }

    #[test]
    fn test_clear() {
        let mut s = SignalSmoother::new(2);
        s.push(1.0);
        s.clear();
        assert!(s.is_empty());
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(&[]), 0.0);
    }
}
