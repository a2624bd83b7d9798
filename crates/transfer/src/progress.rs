use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default sliding window for rate calculation.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Default maximum retained samples.
const DEFAULT_MAX_SAMPLES: usize = 100;

/// Calculates transfer speed over a sliding window of samples.
///
/// Feeds the upload dialog's rate and ETA readouts.
pub struct SpeedCalculator {
    inner: Mutex<SpeedInner>,
}

struct SpeedInner {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    max_samples: usize,
}

impl Default for SpeedCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_SAMPLES)
    }
}

impl SpeedCalculator {
    pub fn new(window: Duration, max_samples: usize) -> Self {
        Self {
            inner: Mutex::new(SpeedInner {
                samples: VecDeque::new(),
                window,
                max_samples,
            }),
        }
    }

    /// Records `bytes` transferred at the current instant.
    pub fn record(&self, bytes: u64) {
        let mut s = self.inner.lock().unwrap();
        let now = Instant::now();
        s.samples.push_back((now, bytes));

        // Prune samples outside the window.
        let cutoff = now - s.window;
        while s.samples.front().is_some_and(|(t, _)| *t < cutoff) {
            s.samples.pop_front();
        }
        while s.samples.len() > s.max_samples {
            s.samples.pop_front();
        }
    }

    /// Returns the average speed in bytes/second within the window.
    ///
    /// Returns 0.0 if fewer than 2 samples.
    pub fn bytes_per_second(&self) -> f64 {
        let s = self.inner.lock().unwrap();
        let (Some((first, _)), Some((last, _))) = (s.samples.front(), s.samples.back()) else {
            return 0.0;
        };
        if s.samples.len() < 2 {
            return 0.0;
        }

        let elapsed = last.duration_since(*first);
        if elapsed.is_zero() {
            return 0.0;
        }

        let total: u64 = s.samples.iter().map(|(_, b)| b).sum();
        total as f64 / elapsed.as_secs_f64()
    }

    /// Estimates time remaining to transfer `remaining_bytes`.
    ///
    /// Returns `None` if speed is zero.
    pub fn eta(&self, remaining_bytes: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining_bytes as f64 / speed))
    }

    /// Clears all recorded samples.
    pub fn reset(&self) {
        self.inner.lock().unwrap().samples.clear();
    }
}
