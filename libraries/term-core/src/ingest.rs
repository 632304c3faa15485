// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Serial ingestion.
//!
//! Moves everything the UART has received into the serial ring. Runs from the UART interrupt
//! handler and, a second time per drain-loop iteration, from the foreground.

use crate::ring::{Producer, Push};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Ingestion interfaces.
pub mod interface {
    /// Receive side of a UART.
    pub trait RxFifo {
        /// Whether the receive FIFO holds at least one byte.
        fn rx_data_available(&self) -> bool;

        /// Pop one byte from the receive FIFO. Only called after `rx_data_available()`.
        fn read_rx_byte(&self) -> u8;

        /// Acknowledge all pending interrupt conditions of the device.
        fn clear_pending_interrupts(&self);
    }
}

/// What a single [`ingest`] call did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Bytes moved into the ring.
    pub stored: usize,

    /// Unread bytes that were discarded because the ring was full.
    pub dropped: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Drain the hardware FIFO into the ring, then clear the device's pending interrupts.
///
/// Clearing happens unconditionally, so calling this with an empty FIFO is harmless.
pub fn ingest(fifo: &impl interface::RxFifo, producer: &mut Producer<'_>) -> IngestReport {
    let mut report = IngestReport::default();

    while fifo.rx_data_available() {
        if producer.push(fifo.read_rx_byte()) == Push::DroppedOldest {
            report.dropped += 1;
        }
        report.stored += 1;
    }

    fifo.clear_pending_interrupts();

    report
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{interface::RxFifo, *};
    use crate::ring::SerialRing;
    use core::cell::{Cell, RefCell};
    use std::{collections::VecDeque, vec::Vec};

    #[derive(Default)]
    struct FakeFifo {
        rx: RefCell<VecDeque<u8>>,
        clears: Cell<usize>,
    }

    impl FakeFifo {
        fn receive(&self, bytes: &[u8]) {
            self.rx.borrow_mut().extend(bytes.iter().copied())
        }
    }

    impl RxFifo for FakeFifo {
        fn rx_data_available(&self) -> bool {
            !self.rx.borrow().is_empty()
        }

        fn read_rx_byte(&self) -> u8 {
            self.rx.borrow_mut().pop_front().unwrap_or(0)
        }

        fn clear_pending_interrupts(&self) {
            self.clears.set(self.clears.get() + 1)
        }
    }

    #[test]
    fn drains_fifo_completely_and_clears() {
        let fifo = FakeFifo::default();
        let mut ring = SerialRing::new(16).unwrap();
        let (mut producer, mut consumer) = ring.split();

        fifo.receive(b"AB\n");
        let report = ingest(&fifo, &mut producer);

        assert_eq!(report, IngestReport { stored: 3, dropped: 0 });
        assert!(!fifo.rx_data_available());
        assert_eq!(fifo.clears.get(), 1);

        let mut out = Vec::new();
        while let Some(b) = consumer.pop() {
            out.push(b);
        }
        assert_eq!(out, b"AB\n");
    }

    #[test]
    fn empty_fifo_still_clears_interrupts() {
        let fifo = FakeFifo::default();
        let mut ring = SerialRing::new(4).unwrap();
        let (mut producer, _consumer) = ring.split();

        assert_eq!(ingest(&fifo, &mut producer), IngestReport::default());
        assert_eq!(ingest(&fifo, &mut producer), IngestReport::default());
        assert_eq!(fifo.clears.get(), 2);
    }

    #[test]
    fn overflow_is_reported_not_raised() {
        let fifo = FakeFifo::default();
        let mut ring = SerialRing::new(4).unwrap();
        let (mut producer, _consumer) = ring.split();

        fifo.receive(b"123456");
        let report = ingest(&fifo, &mut producer);

        assert_eq!(report.stored, 6);
        assert_eq!(report.dropped, 3);
        assert_eq!(producer.ring().len(), 3);
    }
}
