//! Shared progress accumulator and the projections the watchdog renders.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Integer percentage of `completed` over `total`, clamped to `0..=100`.
///
/// A zero total renders as 0; callers report the final 100 explicitly.
pub fn percentage(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = completed.min(total) as u128;
    ((completed * 100) / total as u128) as u8
}

/// A point-in-time copy of an operation's progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressState {
    /// Work units done so far. May overshoot `total` by estimation error.
    pub completed: u64,
    /// Work units the operation expects to do.
    pub total: u64,
}

impl ProgressState {
    /// Create a state with nothing completed.
    pub fn new(total: u64) -> Self {
        Self {
            completed: 0,
            total,
        }
    }

    /// Rendered percentage, clamped at the boundary.
    pub fn percentage(&self) -> u8 {
        percentage(self.completed, self.total)
    }

    /// Check if the completed count has reached the target.
    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

/// The single progress accumulator one operation writes and one watchdog reads.
///
/// `completed` and `total` are independent atomics. The writer is always the
/// driver thread and the reader is always the watchdog, so a reader may see a
/// `completed` from slightly after the `total` it paired it with; that is fine
/// for a UI signal and is why every read path clamps.
#[derive(Debug, Default)]
pub struct ProgressSink {
    completed: AtomicU64,
    total: AtomicU64,
}

impl ProgressSink {
    /// Create a sink for an operation of `total` units.
    pub fn new(total: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total: AtomicU64::new(total),
        }
    }

    /// Reinitialize to `{0, total}`.
    ///
    /// Must not race an in-flight operation.
    pub fn reset(&self, total: u64) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    /// Add `delta` completed units.
    pub fn advance(&self, delta: u64) {
        if delta == 0 {
            return;
        }
        let _ = self
            .completed
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |c| {
                Some(c.saturating_add(delta))
            });
    }

    /// Raw completed count; may exceed `total`.
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Copy out the current state.
    pub fn snapshot(&self) -> ProgressState {
        ProgressState {
            completed: self.completed(),
            total: self.total(),
        }
    }

    /// Rendered percentage of the current state.
    pub fn percentage(&self) -> u8 {
        percentage(self.completed(), self.total())
    }
}

/// A displayed transfer rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Throughput {
    /// At least 1024 KB/s.
    MegabytesPerSec(f64),
    /// Above 0.1 KB/s.
    KilobytesPerSec(f64),
    /// Too slow to be worth a number.
    Processing,
}

impl Throughput {
    /// Classify a rate given in bytes per second.
    pub fn from_bytes_per_sec(rate: f64) -> Self {
        let kbs = rate / 1024.0;
        if kbs >= 1024.0 {
            Self::MegabytesPerSec(kbs / 1024.0)
        } else if kbs > 0.1 {
            Self::KilobytesPerSec(kbs)
        } else {
            Self::Processing
        }
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MegabytesPerSec(mbs) => write!(f, "{mbs:.1} MB/s"),
            Self::KilobytesPerSec(kbs) => write!(f, "{kbs:.0} KB/s"),
            Self::Processing => write!(f, "Processing..."),
        }
    }
}

/// Rolling window the watchdog derives throughput from.
#[derive(Debug, Clone, Copy)]
pub struct ThroughputSample {
    window_start: Instant,
    bytes_at_window_start: u64,
}

impl ThroughputSample {
    /// Open a window at `now` with `completed` units already done.
    pub fn start(now: Instant, completed: u64) -> Self {
        Self {
            window_start: now,
            bytes_at_window_start: completed,
        }
    }

    /// Close the window if `window` has elapsed and return the rate over it.
    ///
    /// Returns `None` while the window is still open, when no time has passed,
    /// and when `completed` has not moved past the previous sample, so the
    /// display never shows a regression.
    pub fn observe(&mut self, now: Instant, completed: u64, window: Duration) -> Option<Throughput> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < window || elapsed.is_zero() {
            return None;
        }
        self.window_start = now;

        if completed <= self.bytes_at_window_start {
            return None;
        }
        let delta = completed - self.bytes_at_window_start;
        self.bytes_at_window_start = completed;

        Some(Throughput::from_bytes_per_sec(
            delta as f64 / elapsed.as_secs_f64(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_clamps() {
        assert_eq!(percentage(0, 10), 0);
        assert_eq!(percentage(5, 10), 50);
        assert_eq!(percentage(10, 10), 100);
        assert_eq!(percentage(25, 10), 100);
        assert_eq!(percentage(3, 0), 0);
        assert_eq!(percentage(u64::MAX, u64::MAX), 100);
    }

    #[test]
    fn test_sink_advance_and_reset() {
        let sink = ProgressSink::new(100);
        sink.advance(40);
        sink.advance(0);
        sink.advance(20);
        assert_eq!(sink.completed(), 60);
        assert_eq!(sink.percentage(), 60);

        sink.advance(80);
        assert_eq!(sink.completed(), 140);
        assert_eq!(sink.percentage(), 100);
        assert!(sink.snapshot().is_complete());

        sink.reset(7);
        assert_eq!(sink.snapshot(), ProgressState::new(7));
    }

    #[test]
    fn test_throughput_labels() {
        assert_eq!(
            Throughput::from_bytes_per_sec(3.0 * 1024.0 * 1024.0).to_string(),
            "3.0 MB/s"
        );
        assert_eq!(
            Throughput::from_bytes_per_sec(512.0 * 1024.0).to_string(),
            "512 KB/s"
        );
        assert_eq!(Throughput::from_bytes_per_sec(10.0).to_string(), "Processing...");
    }

    #[test]
    fn test_throughput_window() {
        let window = Duration::from_secs(2);
        let t0 = Instant::now();
        let mut sample = ThroughputSample::start(t0, 0);

        // Window still open.
        assert!(sample.observe(t0 + Duration::from_secs(1), 1024, window).is_none());

        let rate = sample
            .observe(t0 + Duration::from_secs(2), 4 * 1024 * 1024, window)
            .unwrap();
        assert_eq!(rate, Throughput::MegabytesPerSec(2.0));

        // No progress in the next window: nothing to show.
        assert!(
            sample
                .observe(t0 + Duration::from_secs(4), 4 * 1024 * 1024, window)
                .is_none()
        );
    }
}
