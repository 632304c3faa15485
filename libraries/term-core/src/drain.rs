// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Terminal drain loop.
//!
//! The foreground loop after boot. Each iteration:
//!
//! 1. Forwards at most one buffered byte to the display, unless a DMA transfer is in flight.
//! 2. Re-runs ingestion synchronously.
//! 3. Services due timers.

use crate::{
    backspace::{BackspaceFilter, BackspaceMailbox},
    cancel::CancelToken,
    ring::Consumer,
};
use core::time::Duration;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Drain loop interfaces.
pub mod interface {
    use core::time::Duration;

    /// Everything one iteration touches outside the ring.
    pub trait TerminalPorts {
        /// Whether the DMA engine is busy.
        fn dma_busy(&self) -> bool;

        /// Forward a byte to the display engine.
        fn render_char(&self, byte: u8);

        /// Drain the UART into the ring.
        fn ingest(&self);

        /// Run timer callbacks that are due.
        fn service_timers(&self);

        /// Current monotonic time.
        fn uptime(&self) -> Duration;
    }
}

/// What one iteration did with the ring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Nothing buffered.
    Idle,

    /// DMA busy, the ring was not touched.
    DmaBusy,

    /// The byte was rendered.
    Rendered(u8),

    /// The byte was swallowed by backspace echo suppression.
    Suppressed(u8),
}

/// The loop state. Sole owner of the ring's consumer and of the backspace filter.
pub struct DrainLoop<'a> {
    consumer: Consumer<'a>,
    filter: BackspaceFilter,
    backspace: &'a BackspaceMailbox,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'a> DrainLoop<'a> {
    /// Create an instance.
    pub fn new(consumer: Consumer<'a>, backspace: &'a BackspaceMailbox) -> Self {
        Self {
            consumer,
            filter: BackspaceFilter::default(),
            backspace,
        }
    }

    /// Same as [`Self::new`], with a custom suppression window.
    pub fn with_window(
        consumer: Consumer<'a>,
        backspace: &'a BackspaceMailbox,
        window: Duration,
    ) -> Self {
        Self {
            consumer,
            filter: BackspaceFilter::new(window),
            backspace,
        }
    }

    /// Run exactly one iteration.
    pub fn step(&mut self, ports: &dyn interface::TerminalPorts) -> Step {
        if let Some(pressed_at) = self.backspace.take() {
            self.filter.arm(pressed_at);
        }

        let step = if ports.dma_busy() {
            Step::DmaBusy
        } else {
            match self.consumer.pop() {
                None => Step::Idle,
                Some(byte) => self.forward(byte, ports),
            }
        };

        ports.ingest();
        ports.service_timers();

        step
    }

    /// Iterate until `cancel` is cancelled.
    pub fn run(&mut self, ports: &dyn interface::TerminalPorts, cancel: &CancelToken) {
        while !cancel.is_cancelled() {
            self.step(ports);
        }
    }

    /// Iterate forever.
    pub fn run_forever(&mut self, ports: &dyn interface::TerminalPorts) -> ! {
        loop {
            self.step(ports);
        }
    }

    fn forward(&mut self, byte: u8, ports: &dyn interface::TerminalPorts) -> Step {
        let rendered = if self.filter.is_armed() {
            self.filter.filter(byte, ports.uptime())
        } else {
            Some(byte)
        };

        match rendered {
            Some(b) => {
                ports.render_char(b);
                Step::Rendered(b)
            }
            None => Step::Suppressed(byte),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{interface::TerminalPorts, *};
    use crate::{
        backspace::{DEL, SUPPRESSION_WINDOW},
        interface::{MonotonicClock, Render},
        keyboard::{interface::UartTx, KeyboardBridge, TransformConfig},
        ring::{Producer, SerialRing},
        test_support::{ManualClock, RecordingDisplay},
    };
    use core::cell::{Cell, RefCell};
    use std::{collections::VecDeque, vec::Vec};

    /// Ports that feed a scripted byte stream into the ring on `ingest()`.
    struct FakePorts<'r> {
        producer: RefCell<Producer<'r>>,
        wire: RefCell<VecDeque<u8>>,
        dma_busy: Cell<bool>,
        display: RecordingDisplay,
        clock: ManualClock,
        ingests: Cell<usize>,
        timer_polls: Cell<usize>,
    }

    impl<'r> FakePorts<'r> {
        fn new(producer: Producer<'r>) -> Self {
            Self {
                producer: RefCell::new(producer),
                wire: RefCell::new(VecDeque::new()),
                dma_busy: Cell::new(false),
                display: RecordingDisplay::default(),
                clock: ManualClock::new(),
                ingests: Cell::new(0),
                timer_polls: Cell::new(0),
            }
        }

        fn send(&self, bytes: &[u8]) {
            self.wire.borrow_mut().extend(bytes.iter().copied())
        }

        fn rendered(&self) -> Vec<u8> {
            self.display.0.borrow().clone()
        }
    }

    impl TerminalPorts for FakePorts<'_> {
        fn dma_busy(&self) -> bool {
            self.dma_busy.get()
        }

        fn render_char(&self, byte: u8) {
            self.display.render_char(byte)
        }

        fn ingest(&self) {
            self.ingests.set(self.ingests.get() + 1);
            let mut producer = self.producer.borrow_mut();
            while let Some(b) = self.wire.borrow_mut().pop_front() {
                producer.push(b);
            }
        }

        fn service_timers(&self) {
            self.timer_polls.set(self.timer_polls.get() + 1)
        }

        fn uptime(&self) -> Duration {
            self.clock.uptime()
        }
    }

    impl UartTx for FakePorts<'_> {
        fn write_byte(&self, _byte: u8) {}
    }

    #[test]
    fn inbound_bytes_are_rendered_unchanged_and_in_order() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);

        ports.send(b"AB\n");
        ports.ingest();
        while drain.step(&ports) != Step::Idle {}

        assert_eq!(ports.rendered(), b"AB\n");
    }

    #[test]
    fn one_byte_per_iteration_and_ingest_plus_timers_every_time() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);

        ports.send(b"xyz");
        ports.ingest();

        assert_eq!(drain.step(&ports), Step::Rendered(b'x'));
        assert_eq!(ports.rendered(), b"x");
        assert_eq!(drain.step(&ports), Step::Rendered(b'y'));
        assert_eq!(ports.ingests.get(), 3);
        assert_eq!(ports.timer_polls.get(), 2);
    }

    #[test]
    fn busy_dma_leaves_ring_untouched() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);

        ports.send(b"q");
        ports.dma_busy.set(true);

        // The iteration still ingests and polls timers.
        assert_eq!(drain.step(&ports), Step::DmaBusy);
        assert!(ports.rendered().is_empty());
        assert_eq!(ports.producer.borrow().ring().len(), 1);
        assert_eq!(ports.timer_polls.get(), 1);

        ports.dma_busy.set(false);
        assert_eq!(drain.step(&ports), Step::Rendered(b'q'));
    }

    #[test]
    fn keyboard_del_suppresses_remote_echo() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);
        let config = TransformConfig {
            skip_backspace_echo: true,
            ..Default::default()
        };

        ports.clock.set(Duration::from_secs(1));
        KeyboardBridge::new(config, &ports, &ports.display, &ports.clock, &mailbox)
            .on_key_press("\x7f");

        // Remote answers with BS, SPACE, then the user types on.
        ports.send(b"\x08 k");
        ports.ingest();
        ports.clock.advance(Duration::from_millis(5));

        assert_eq!(drain.step(&ports), Step::Suppressed(0x08));
        assert_eq!(drain.step(&ports), Step::Rendered(DEL));
        assert_eq!(drain.step(&ports), Step::Rendered(b'k'));
        assert_eq!(ports.rendered(), [DEL, b'k']);
    }

    #[test]
    fn suppression_expires_after_window() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);

        mailbox.post(Duration::ZERO);
        drain.step(&ports);

        ports.clock.set(SUPPRESSION_WINDOW + Duration::from_micros(1));
        ports.send(b"ab");
        ports.ingest();

        assert_eq!(drain.step(&ports), Step::Rendered(b'a'));
        assert_eq!(drain.step(&ports), Step::Rendered(b'b'));
    }

    #[test]
    fn custom_window_bounds_suppression() {
        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = FakePorts::new(producer);
        let mailbox = BackspaceMailbox::new();
        let window = Duration::from_millis(2);
        let mut drain = DrainLoop::with_window(consumer, &mailbox, window);

        mailbox.post(Duration::ZERO);
        ports.send(b"\x08 ");
        ports.ingest();

        // Inside the default window, but past the custom one.
        ports.clock.set(Duration::from_millis(3));
        assert!(Duration::from_millis(3) < SUPPRESSION_WINDOW);

        assert_eq!(drain.step(&ports), Step::Rendered(0x08));
        assert_eq!(drain.step(&ports), Step::Rendered(b' '));
    }

    #[test]
    fn run_returns_when_cancelled() {
        struct CancellingPorts<'a> {
            inner: FakePorts<'a>,
            cancel: CancelToken,
            iterations_left: Cell<usize>,
        }

        impl TerminalPorts for CancellingPorts<'_> {
            fn dma_busy(&self) -> bool {
                false
            }

            fn render_char(&self, byte: u8) {
                self.inner.render_char(byte)
            }

            fn ingest(&self) {
                self.inner.ingest()
            }

            fn service_timers(&self) {
                let left = self.iterations_left.get() - 1;
                self.iterations_left.set(left);
                if left == 0 {
                    self.cancel.cancel();
                }
            }

            fn uptime(&self) -> Duration {
                Duration::ZERO
            }
        }

        let mut ring = SerialRing::new(16).unwrap();
        let (producer, consumer) = ring.split();
        let ports = CancellingPorts {
            inner: FakePorts::new(producer),
            cancel: CancelToken::new(),
            iterations_left: Cell::new(10),
        };
        let mailbox = BackspaceMailbox::new();
        let mut drain = DrainLoop::new(consumer, &mailbox);

        ports.inner.send(b"hello");
        drain.run(&ports, &ports.cancel);

        assert_eq!(ports.inner.rendered(), b"hello");
        assert_eq!(ports.iterations_left.get(), 0);
    }
}
