//! Ring buffer retention

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serialview_core::buffer::RingBuffer;
use serialview_core::DEFAULT_RING_CAPACITY;
use std::sync::Arc;

proptest! {
    #[test]
    fn retains_newest_bytes(
        capacity in 1usize..64,
        writes in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..100), 0..20),
    ) {
        let ring = RingBuffer::new(capacity);
        let mut all = Vec::new();
        for w in &writes {
            ring.write(w);
            all.extend_from_slice(w);
            prop_assert!(ring.size() <= capacity);
        }
        let keep = all.len().min(capacity);
        prop_assert_eq!(ring.read_all(), all[all.len() - keep..].to_vec());
        prop_assert!(ring.is_empty());
    }
}

#[test]
fn test_zero_capacity_selects_default() {
    assert_eq!(RingBuffer::new(0).capacity(), DEFAULT_RING_CAPACITY);
}

#[test]
fn test_oversized_write_replaces_contents() {
    let ring = RingBuffer::new(4);
    ring.write(b"ab");
    ring.write(b"0123456789");
    assert_eq!(ring.read_all(), b"6789");
}

#[test]
fn test_eviction_keeps_tail() {
    let ring = RingBuffer::new(5);
    ring.write(b"abc");
    ring.write(b"def");
    assert_eq!(ring.size(), 5);
    assert_eq!(ring.read_all(), b"bcdef");
}

#[test]
fn test_reader_and_writer_threads() {
    let ring = Arc::new(RingBuffer::new(1024));
    let writer = {
        let ring = ring.clone();
        std::thread::spawn(move || {
            for i in 0..1000u32 {
                ring.write(&i.to_le_bytes());
            }
        })
    };

    let mut drained = Vec::new();
    while !writer.is_finished() {
        drained.extend(ring.read_all());
    }
    writer.join().unwrap();
    drained.extend(ring.read_all());

    // The reader keeps up often enough that whole 4-byte records survive in order
    assert_eq!(drained.len() % 4, 0);
    let values: Vec<u32> = drained
        .chunks(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert!(values.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(values.last(), Some(&999));
}
