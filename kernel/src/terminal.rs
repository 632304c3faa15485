// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! The terminal.
//!
//! Binds the target-independent terminal core to the kernel's collaborators. The serial ring is
//! created here. Its producer goes to the serial link, while its consumer is handed back to the
//! caller and ends up owned by the drain loop.

pub mod heartbeat;
pub mod keyboard;

use crate::{display, dma, serial, time};
use alloc::boxed::Box;
use core::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};
use term_core::{
    backspace::BackspaceMailbox,
    cancel::CancelToken,
    drain::{interface::TerminalPorts, DrainLoop},
    ring::{Consumer, Producer, SerialRing},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// The drain loop's view of the kernel.
struct KernelPorts;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

/// Backspace presses, from the keyboard context to the drain loop.
static BACKSPACE_EVENTS: BackspaceMailbox = BackspaceMailbox::new();

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl TerminalPorts for KernelPorts {
    fn dma_busy(&self) -> bool {
        dma::dma_status().is_busy()
    }

    fn render_char(&self, byte: u8) {
        display::display().render_char(byte)
    }

    fn ingest(&self) {
        let report = serial::link().ingest();

        if report.dropped > 0 {
            crate::debug!("Serial ring overrun, {} bytes lost", report.dropped);
        }
    }

    fn service_timers(&self) {
        time::time_manager().poll();
    }

    fn uptime(&self) -> Duration {
        time::time_manager().uptime()
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Allocate the serial ring and split it into its two handles.
///
/// The ring lives for the rest of the kernel's life. Can only succeed once.
pub fn init(capacity: usize) -> Result<(Producer<'static>, Consumer<'static>), &'static str> {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        return Err("Init already done");
    }

    let ring: &'static mut SerialRing = Box::leak(Box::new(SerialRing::new(capacity)?));

    INIT_DONE.store(true, Ordering::Relaxed);
    Ok(ring.split())
}

/// Drain `consumer` into the display until `cancel` is cancelled.
pub fn run(consumer: Consumer<'static>, cancel: &CancelToken) {
    DrainLoop::new(consumer, &BACKSPACE_EVENTS).run(&KernelPorts, cancel)
}

/// The terminal's foreground loop.
pub fn run_forever(consumer: Consumer<'static>) -> ! {
    DrainLoop::new(consumer, &BACKSPACE_EVENTS).run_forever(&KernelPorts)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// Without drivers, the loop sees an idle DMA engine and an empty link.
    #[kernel_test]
    fn ports_default_to_idle_collaborators() {
        assert!(!KernelPorts.dma_busy());

        KernelPorts.ingest();
        KernelPorts.render_char(b'x');
    }

    /// The ring is handed out exactly once.
    #[kernel_test]
    fn ring_is_created_once() {
        let (mut producer, mut consumer) = init(16).unwrap();

        producer.push(b'a');
        assert_eq!(consumer.pop(), Some(b'a'));
        assert!(init(16).is_err());
    }
}
