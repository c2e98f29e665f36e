//! Byte-rate and total-bytes counter
//!
//! While started, a tokio task samples the counters once per second and emits
//! `ThroughputSample`. Idle seconds emit zero samples.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::events::{EventSender, TerminalEvent};

/// Sampling period
pub const SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Counter values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThroughputState {
    /// Bytes since the last reset
    pub cumulative_total: u64,
    /// Bytes since the last tick
    pub interval_accumulator: u64,
}

/// Rolling throughput counter
#[derive(Debug, Default)]
pub struct ThroughputMonitor {
    state: Arc<Mutex<ThroughputState>>,
    ticker: Option<JoinHandle<()>>,
}

fn lock(state: &Mutex<ThroughputState>) -> MutexGuard<'_, ThroughputState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Take one sample: report the interval count, then zero it
fn take_sample(state: &Mutex<ThroughputState>) -> (u64, u64) {
    let mut s = lock(state);
    let sample = (s.interval_accumulator, s.cumulative_total);
    s.interval_accumulator = 0;
    sample
}

impl ThroughputMonitor {
    /// Monitor with zeroed counters, not ticking
    pub fn new() -> Self {
        Self::default()
    }

    /// Count `n` received bytes. Non-positive values are ignored.
    pub fn record_bytes(&self, n: i64) {
        if n <= 0 {
            return;
        }
        let n = n as u64;
        let mut s = lock(&self.state);
        s.cumulative_total = s.cumulative_total.saturating_add(n);
        s.interval_accumulator = s.interval_accumulator.saturating_add(n);
    }

    /// Zero both counters
    pub fn reset(&self) {
        *lock(&self.state) = ThroughputState::default();
    }

    /// Current counter values
    pub fn snapshot(&self) -> ThroughputState {
        *lock(&self.state)
    }

    /// Bytes since the last reset
    pub fn total_bytes(&self) -> u64 {
        lock(&self.state).cumulative_total
    }

    /// One tick by hand: returns `(interval_bytes, total_bytes)` and zeroes the interval
    pub fn tick(&self) -> (u64, u64) {
        take_sample(&self.state)
    }

    /// Whether the sampling task is active
    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Begin emitting one sample per second. Must be called within a tokio runtime.
    pub fn start(&mut self, events: EventSender) {
        if self.is_running() {
            return;
        }

        let state = self.state.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + SAMPLE_INTERVAL, SAMPLE_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let (interval_bytes, total_bytes) = take_sample(&state);
                if events
                    .send(TerminalEvent::ThroughputSample {
                        interval_bytes,
                        total_bytes,
                    })
                    .is_err()
                {
                    break;
                }
            }
        }));
    }

    /// Halt ticking. Counters are kept.
    pub fn stop(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
    }
}

impl Drop for ThroughputMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

/// `"<int> bytes/s"` below 1 KiB/s, else `"<x.y> KB/s"`
pub fn format_speed(bytes_per_second: f64) -> String {
    if bytes_per_second >= 1024.0 {
        format!("{:.1} KB/s", bytes_per_second / 1024.0)
    } else {
        format!("{} bytes/s", bytes_per_second as i64)
    }
}

/// `"<int> B"`, `"<x.y> KB"` or `"<x.y> MB"`
pub fn format_total(bytes: u64) -> String {
    if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_ignored() {
        let monitor = ThroughputMonitor::new();
        monitor.record_bytes(500);
        monitor.record_bytes(-10);
        monitor.record_bytes(0);
        assert_eq!(monitor.tick(), (500, 500));
        assert_eq!(monitor.tick(), (0, 500));
    }

    #[test]
    fn test_reset() {
        let monitor = ThroughputMonitor::new();
        monitor.record_bytes(42);
        monitor.reset();
        assert_eq!(monitor.snapshot(), ThroughputState::default());
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(0.0), "0 bytes/s");
        assert_eq!(format_speed(1023.0), "1023 bytes/s");
        assert_eq!(format_speed(1024.0), "1.0 KB/s");
        assert_eq!(format_speed(1536.0), "1.5 KB/s");
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(1023), "1023 B");
        assert_eq!(format_total(2048), "2.0 KB");
        assert_eq!(format_total(1_048_576), "1.0 MB");
        assert_eq!(format_total(5 * 1_048_576 + 524_288), "5.5 MB");
    }
}
