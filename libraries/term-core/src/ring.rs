// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Serial ring buffer.
//!
//! A fixed-capacity circular byte store shared between the UART interrupt handler (producer) and
//! the foreground drain loop (consumer). The ring is empty when both cursors are equal, so at most
//! `capacity - 1` bytes are buffered at any time.
//!
//! When the producer wraps onto unread data, the oldest unread byte is dropped. The producer
//! never blocks and never fails.
//!
//! # Ownership
//!
//! Cursor-mutating access is only possible through the two handles returned by
//! [`SerialRing::split`]. Since `split` needs a unique borrow of the ring, there is never more than
//! one [`Producer`] or [`Consumer`] alive.
//!
//! - `write_cursor` is written by the [`Producer`] only.
//! - `read_cursor` is advanced by the [`Consumer`]. The producer's drop-oldest step is a
//!   compare-and-swap on it that gives way if the consumer moved first.
//!
//! # Ordering
//!
//! Slots are written with relaxed stores and published by a `Release` store of `write_cursor`.
//! The consumer loads `write_cursor` with `Acquire` before it reads a slot.
//!
//! The consumer reads a slot before it claims it. If the producer laps the ring while a claim is
//! pending, the claim fails and is retried. A stale byte could only be returned if the producer
//! pushed `capacity` bytes during a single `pop()`, which the UART's line rate rules out.

use alloc::boxed::Box;
use core::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Ring capacity used by the terminal.
pub const DEFAULT_CAPACITY: usize = 16 * 1024;

/// Outcome of [`Producer::push`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Push {
    /// The byte was stored.
    Stored,

    /// The byte was stored and the oldest unread byte was discarded to make room.
    DroppedOldest,
}

/// The ring itself.
pub struct SerialRing {
    storage: Box<[AtomicU8]>,
    write_cursor: AtomicUsize,
    read_cursor: AtomicUsize,
}

/// The writing end. Owned by the ingestion path.
pub struct Producer<'ring> {
    ring: &'ring SerialRing,
}

/// The reading end. Owned by the drain loop.
pub struct Consumer<'ring> {
    ring: &'ring SerialRing,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl SerialRing {
    /// Allocate a ring with room for `capacity - 1` unread bytes.
    pub fn new(capacity: usize) -> Result<Self, &'static str> {
        if capacity < 2 {
            return Err("Ring capacity must be at least 2");
        }

        let storage: Box<[AtomicU8]> = (0..capacity).map(|_| AtomicU8::new(0)).collect();

        Ok(Self {
            storage,
            write_cursor: AtomicUsize::new(0),
            read_cursor: AtomicUsize::new(0),
        })
    }

    /// Hand out the producer and consumer handles.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let ring: &SerialRing = self;

        (Producer { ring }, Consumer { ring })
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Next slot the producer fills.
    pub fn write_cursor(&self) -> usize {
        self.write_cursor.load(Ordering::Acquire)
    }

    /// Next slot the consumer drains.
    pub fn read_cursor(&self) -> usize {
        self.read_cursor.load(Ordering::Acquire)
    }

    /// Number of unread bytes, as of the moment of the call.
    pub fn len(&self) -> usize {
        let w = self.write_cursor();
        let r = self.read_cursor();

        (w + self.capacity() - r) % self.capacity()
    }

    /// Whether no unread byte is buffered.
    pub fn is_empty(&self) -> bool {
        self.write_cursor() == self.read_cursor()
    }

    #[inline(always)]
    fn next(&self, cursor: usize) -> usize {
        let next = cursor + 1;
        if next == self.capacity() {
            0
        } else {
            next
        }
    }
}

impl Producer<'_> {
    /// Store a byte, discarding the oldest unread byte if the ring is full.
    pub fn push(&mut self, byte: u8) -> Push {
        let ring = self.ring;

        // Only this handle writes the cursor, so a relaxed load sees the latest value.
        let w = ring.write_cursor.load(Ordering::Relaxed);
        ring.storage[w].store(byte, Ordering::Relaxed);
        let next_w = ring.next(w);

        let mut outcome = Push::Stored;
        let r = ring.read_cursor.load(Ordering::Acquire);
        if next_w == r
            && ring
                .read_cursor
                .compare_exchange(r, ring.next(r), Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            outcome = Push::DroppedOldest;
        }

        ring.write_cursor.store(next_w, Ordering::Release);

        outcome
    }

    /// The ring this handle writes to.
    pub fn ring(&self) -> &SerialRing {
        self.ring
    }
}

impl Consumer<'_> {
    /// Take the oldest unread byte.
    pub fn pop(&mut self) -> Option<u8> {
        let ring = self.ring;
        let mut r = ring.read_cursor.load(Ordering::Acquire);

        loop {
            if r == ring.write_cursor.load(Ordering::Acquire) {
                return None;
            }

            let byte = ring.storage[r].load(Ordering::Relaxed);

            match ring.read_cursor.compare_exchange(
                r,
                ring.next(r),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(byte),
                // The producer dropped the byte under our feet. Retry with the new oldest one.
                Err(current) => r = current,
            }
        }
    }

    /// The ring this handle reads from.
    pub fn ring(&self) -> &SerialRing {
        self.ring
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn drain(consumer: &mut Consumer) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(b) = consumer.pop() {
            out.push(b);
        }
        out
    }

    #[test]
    fn tiny_capacity_is_rejected() {
        assert!(SerialRing::new(1).is_err());
        assert!(SerialRing::new(2).is_ok());
    }

    #[test]
    fn new_ring_is_empty() {
        let ring = SerialRing::new(8).unwrap();

        assert!(ring.is_empty());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.read_cursor(), ring.write_cursor());
    }

    #[test]
    fn drained_ring_is_empty_again() {
        let mut ring = SerialRing::new(8).unwrap();
        let (mut producer, mut consumer) = ring.split();

        for b in b"xyz" {
            producer.push(*b);
        }
        assert_eq!(drain(&mut consumer), b"xyz");
        assert!(consumer.ring().is_empty());
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn fifo_order_without_overflow() {
        let mut ring = SerialRing::new(8).unwrap();
        let (mut producer, mut consumer) = ring.split();
        let mut expected = Vec::new();
        let mut got = Vec::new();

        // Bursts of up to capacity - 1 bytes, drained between bursts, across many wraps.
        let mut value = 0u8;
        for burst in 0..40 {
            for _ in 0..(burst % 8) {
                assert_eq!(producer.push(value), Push::Stored);
                expected.push(value);
                value = value.wrapping_add(1);
            }
            got.extend(drain(&mut consumer));
        }

        assert_eq!(got, expected);
    }

    #[test]
    fn full_ring_drops_exactly_the_oldest_byte() {
        let capacity = 8;
        let mut ring = SerialRing::new(capacity).unwrap();
        let (mut producer, mut consumer) = ring.split();

        for b in 0..capacity as u8 {
            producer.push(b);
        }
        let read_before = producer.ring().read_cursor();

        assert_eq!(producer.push(capacity as u8), Push::DroppedOldest);
        assert_eq!(producer.ring().read_cursor(), (read_before + 1) % capacity);
        assert_eq!(producer.ring().len(), capacity - 1);

        // The most recent capacity - 1 bytes survive.
        let expected: Vec<u8> = (2..=capacity as u8).collect();
        assert_eq!(drain(&mut consumer), expected);
    }

    #[test]
    fn cursors_stay_in_bounds() {
        let capacity = 5;
        let mut ring = SerialRing::new(capacity).unwrap();
        let (mut producer, mut consumer) = ring.split();

        // Deterministic pseudo-random interleaving of pushes and pops.
        let mut seed = 0x2545_f491_u32;
        for i in 0..2000u32 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;

            if seed % 3 == 0 {
                consumer.pop();
            } else {
                producer.push(i as u8);
            }

            let ring = producer.ring();
            assert!(ring.write_cursor() < capacity);
            assert!(ring.read_cursor() < capacity);
            assert!(ring.len() < capacity);
        }
    }

    #[test]
    fn producer_and_consumer_on_separate_threads() {
        use std::{sync::atomic::AtomicBool, thread};

        let mut ring = SerialRing::new(64).unwrap();
        let (mut producer, mut consumer) = ring.split();
        let done = AtomicBool::new(false);

        let received = thread::scope(|s| {
            s.spawn(|| {
                for i in 0..10_000u32 {
                    producer.push(i as u8);
                }
                done.store(true, Ordering::Release);
            });

            let mut received = Vec::new();
            loop {
                let finished = done.load(Ordering::Acquire);
                received.extend(drain(&mut consumer));
                if finished {
                    break;
                }
            }
            received
        });

        // Old bytes may be lost, the newest one never is.
        assert!(!received.is_empty());
        assert!(received.len() <= 10_000);
        assert_eq!(*received.last().unwrap(), 9_999u32 as u8);
        assert!(ring.is_empty());
    }
}
