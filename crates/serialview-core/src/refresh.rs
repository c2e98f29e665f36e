//! Fixed-cadence display batching
//!
//! Formatted text is appended to one pending accumulator. A ~30 Hz tick drains
//! it into the display in a single operation, so bursty arrivals never cost more
//! than one display update per tick.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Refresh period (about 30 ticks per second)
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(33);

/// Scroll offsets within this distance of the maximum count as "at bottom"
pub const AT_BOTTOM_TOLERANCE: u32 = 10;

/// The display surface owned by the collaborator
pub trait DisplaySink: Send {
    /// Append text at the end of the view
    fn append(&mut self, text: &str);

    /// Bring the end of the view into sight
    fn scroll_to_bottom(&mut self);

    /// Remove all displayed text
    fn clear(&mut self) {}
}

struct Inner<D> {
    pending: String,
    sink: D,
    follow_tail: bool,
}

/// Batches formatted text into fixed-cadence display updates
pub struct RefreshScheduler<D: DisplaySink> {
    inner: Arc<Mutex<Inner<D>>>,
    timer: Option<JoinHandle<()>>,
}

fn lock<D>(inner: &Mutex<Inner<D>>) -> MutexGuard<'_, Inner<D>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Apply pending text to the sink. Returns whether anything was applied.
fn flush<D: DisplaySink>(inner: &mut Inner<D>) -> bool {
    if inner.pending.is_empty() {
        return false;
    }
    let text = std::mem::take(&mut inner.pending);
    inner.sink.append(&text);
    if inner.follow_tail {
        inner.sink.scroll_to_bottom();
    }
    true
}

impl<D: DisplaySink + 'static> RefreshScheduler<D> {
    /// Scheduler over `sink`, following the tail, timer not started
    pub fn new(sink: D) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                pending: String::new(),
                sink,
                follow_tail: true,
            })),
            timer: None,
        }
    }

    /// Queue text for the next tick
    pub fn push(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        lock(&self.inner).pending.push_str(text);
    }

    /// Bytes of text waiting for the next tick
    pub fn pending_len(&self) -> usize {
        lock(&self.inner).pending.len()
    }

    /// One refresh tick. Empty ticks touch nothing.
    pub fn tick(&self) -> bool {
        flush(&mut lock(&self.inner))
    }

    /// Record a user scroll; new content follows the tail only while at the bottom
    pub fn on_user_scroll(&self, offset: u32, maximum: u32) {
        lock(&self.inner).follow_tail = offset >= maximum.saturating_sub(AT_BOTTOM_TOLERANCE);
    }

    /// Whether new content scrolls the view to the bottom
    pub fn is_following_tail(&self) -> bool {
        lock(&self.inner).follow_tail
    }

    /// Whether the refresh timer is active
    pub fn is_running(&self) -> bool {
        self.timer.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the refresh timer. Must be called within a tokio runtime.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        let inner = self.inner.clone();
        self.timer = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                flush(&mut lock(&inner));
            }
        }));
    }

    /// Session ended: flush residual text immediately and halt the timer
    pub fn stop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
        flush(&mut lock(&self.inner));
    }

    /// Drop pending text and clear the display
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        inner.pending.clear();
        inner.sink.clear();
    }

    /// Run `f` against the sink
    pub fn with_sink<R>(&self, f: impl FnOnce(&mut D) -> R) -> R {
        f(&mut lock(&self.inner).sink)
    }
}

impl<D: DisplaySink> Drop for RefreshScheduler<D> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.take() {
            handle.abort();
        }
    }
}

/// In-memory display, useful for headless collaborators and tests
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TextDisplay {
    /// Everything appended since the last clear
    pub text: String,
    /// Number of append operations applied
    pub appends: usize,
    /// Number of scroll-to-bottom requests
    pub scrolls: usize,
}

impl DisplaySink for TextDisplay {
    fn append(&mut self, text: &str) {
        self.text.push_str(text);
        self.appends += 1;
    }

    fn scroll_to_bottom(&mut self) {
        self.scrolls += 1;
    }

    fn clear(&mut self) {
        self.text.clear();
    }
}
