// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Target-independent core of the serial terminal.
//!
//! Everything in here is free of hardware access. The kernel plugs its drivers in through the
//! `interface` traits of the respective modules, and the host test suite plugs in mocks.
//!
//! # Data flow
//!
//! ```text
//! UART RX FIFO --ingest()--> SerialRing --DrainLoop--> Render
//! keyboard --KeyboardBridge--> UART TX
//!                |
//!                +--BackspaceMailbox--> DrainLoop
//! timer IRQ --TimerRegistry--> Heartbeat --> StatusIndicator
//! ```
//!
//! The ring is the only structure that an interrupt handler and the foreground loop mutate
//! concurrently. It is split into a [`ring::Producer`] and a [`ring::Consumer`], so each cursor
//! has exactly one owner.

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod backspace;
pub mod cancel;
pub mod drain;
pub mod heartbeat;
pub mod ingest;
pub mod keyboard;
pub mod ring;
pub mod timer;

/// Contracts shared by more than one module.
pub mod interface {
    use core::time::Duration;

    /// Display engine entry points.
    pub trait Render {
        /// Render one terminal byte.
        fn render_char(&self, byte: u8) {
            self.render_string(&[byte])
        }

        /// Render a string of terminal bytes, control sequences included.
        fn render_string(&self, bytes: &[u8]);
    }

    /// A monotonic clock.
    pub trait MonotonicClock {
        /// Time elapsed since an arbitrary but fixed point in the past.
        fn uptime(&self) -> Duration;
    }
}

pub use cancel::CancelToken;

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test_support {
    use super::interface::{MonotonicClock, Render};
    use core::{cell::Cell, time::Duration};
    use std::{cell::RefCell, vec::Vec};

    /// Clock that only moves when told to.
    pub struct ManualClock(Cell<Duration>);

    impl ManualClock {
        pub fn new() -> Self {
            Self(Cell::new(Duration::ZERO))
        }

        pub fn set(&self, t: Duration) {
            self.0.set(t)
        }

        pub fn advance(&self, d: Duration) {
            self.0.set(self.0.get() + d)
        }
    }

    impl MonotonicClock for ManualClock {
        fn uptime(&self) -> Duration {
            self.0.get()
        }
    }

    /// Display that records every rendered byte.
    #[derive(Default)]
    pub struct RecordingDisplay(pub RefCell<Vec<u8>>);

    impl Render for RecordingDisplay {
        fn render_string(&self, bytes: &[u8]) {
            self.0.borrow_mut().extend_from_slice(bytes)
        }
    }
}
