//! Bounded byte store shared between the I/O worker and the display path
//!
//! Newest data wins: once full, every write discards the oldest bytes. Each
//! operation holds the lock only for the copy in or out.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::DEFAULT_RING_CAPACITY;

/// Thread-safe bounded FIFO of bytes
#[derive(Debug)]
pub struct RingBuffer {
    capacity: usize,
    contents: Mutex<VecDeque<u8>>,
}

impl RingBuffer {
    /// Create a buffer holding at most `capacity` bytes. Zero selects the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity > 0 {
            capacity
        } else {
            DEFAULT_RING_CAPACITY
        };
        Self {
            capacity,
            contents: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<u8>> {
        // Plain bytes; a panic mid-copy cannot leave them in a state worse than truncated
        self.contents.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `data`, discarding the oldest bytes beyond capacity
    pub fn write(&self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let mut buf = self.lock();

        if data.len() >= self.capacity {
            buf.clear();
            buf.extend(&data[data.len() - self.capacity..]);
            return;
        }

        buf.extend(data);
        if buf.len() > self.capacity {
            let excess = buf.len() - self.capacity;
            buf.drain(..excess);
            tracing::trace!(excess, "ring buffer discarded oldest bytes");
        }
    }

    /// Take everything, oldest first, leaving the buffer empty
    pub fn read_all(&self) -> Vec<u8> {
        let mut buf = self.lock();
        let out: Vec<u8> = buf.drain(..).collect();
        out
    }

    /// Discard everything retained
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Whether no bytes are retained
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of bytes currently retained
    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Fixed at construction
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for RingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_overflow_keeps_newest() {
        let rb = RingBuffer::new(4);
        rb.write(b"abc");
        rb.write(b"de");
        assert_eq!(rb.size(), 4);
        assert_eq!(rb.read_all(), b"bcde");
        assert!(rb.is_empty());
    }

    #[test]
    fn test_large_write_replaces() {
        let rb = RingBuffer::new(3);
        rb.write(b"xy");
        rb.write(b"12345");
        assert_eq!(rb.read_all(), b"345");
    }

    #[test]
    fn test_zero_capacity_uses_default() {
        let rb = RingBuffer::new(0);
        assert_eq!(rb.capacity(), 65536);
    }

    #[test]
    fn test_clear() {
        let rb = RingBuffer::default();
        rb.write(b"hello");
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.read_all(), Vec::<u8>::new());
    }

    #[test]
    fn test_concurrent_writers_never_exceed_capacity() {
        let rb = Arc::new(RingBuffer::new(100));
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let rb = rb.clone();
                std::thread::spawn(move || {
                    for _ in 0..500 {
                        rb.write(&[i as u8; 7]);
                        assert!(rb.size() <= 100);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(rb.size(), 100);
    }
}
