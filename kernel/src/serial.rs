// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! The serial link to the remote peer.
//!
//! Inbound, the link owns the producer side of the serial ring. Outbound, it transmits the bytes
//! the keyboard bridge forwards.

use crate::synchronization::{self, InitStateLock};
use term_core::{ingest::IngestReport, keyboard::interface::UartTx, ring::Producer};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Serial link interfaces.
pub mod interface {
    use term_core::{ingest::IngestReport, ring::Producer};

    /// A full-duplex serial line.
    pub trait Link {
        /// Hand over the ring's producer. Accepted only once.
        fn attach_producer(&self, producer: Producer<'static>) -> Result<(), &'static str>;

        /// Drain the receive FIFO into the ring.
        ///
        /// Safe to call from the IRQ handler and from the foreground alike.
        fn ingest(&self) -> IngestReport;

        /// Send one byte. Busy-waits until the hardware accepts it.
        fn write_byte(&self, byte: u8);
    }
}

/// [`UartTx`] on top of whatever link is registered.
pub struct LinkTx;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

struct NullLink;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static NULL_LINK: NullLink = NullLink;

static CUR_LINK: InitStateLock<&'static (dyn interface::Link + Sync)> =
    InitStateLock::new(&NULL_LINK);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl interface::Link for NullLink {
    fn attach_producer(&self, _producer: Producer<'static>) -> Result<(), &'static str> {
        Err("No serial link registered")
    }

    fn ingest(&self) -> IngestReport {
        IngestReport::default()
    }

    fn write_byte(&self, _byte: u8) {}
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

/// Register a new serial link.
pub fn register_link(new_link: &'static (dyn interface::Link + Sync)) {
    CUR_LINK.write(|link| *link = new_link);
}

/// Return a reference to the currently registered serial link.
pub fn link() -> &'static dyn interface::Link {
    CUR_LINK.read(|link| *link)
}

impl UartTx for LinkTx {
    fn write_byte(&self, byte: u8) {
        link().write_byte(byte)
    }
}
