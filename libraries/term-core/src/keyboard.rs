// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Keyboard bridge.
//!
//! Forwards key presses to the remote peer over the UART, after an optional chain of byte
//! transforms. Traffic flows opposite to the serial ring.

use crate::{
    backspace::{BackspaceMailbox, DEL},
    interface::{MonotonicClock, Render},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Keyboard bridge interfaces.
pub mod interface {
    /// Transmit side of a UART.
    pub trait UartTx {
        /// Send one byte. Busy-waits until the hardware accepts it.
        fn write_byte(&self, byte: u8);
    }
}

/// Backspace.
pub const BS: u8 = 0x08;

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Which transforms are applied to outbound key bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TransformConfig {
    /// Send CR before every LF.
    pub send_cr_lf: bool,

    /// Replace LF with CR.
    pub send_cr_only: bool,

    /// Replace DEL with BS.
    pub swap_del_with_backspace: bool,

    /// Render a DEL locally for every BS sent.
    pub backspace_echo: bool,

    /// Swallow the remote's echo of a DEL, see [`crate::backspace`].
    pub skip_backspace_echo: bool,
}

/// The bridge between the keyboard driver and the UART.
pub struct KeyboardBridge<'a> {
    config: TransformConfig,
    tx: &'a dyn interface::UartTx,
    display: &'a dyn Render,
    clock: &'a dyn MonotonicClock,
    backspace: &'a BackspaceMailbox,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<'a> KeyboardBridge<'a> {
    /// Create an instance.
    pub const fn new(
        config: TransformConfig,
        tx: &'a dyn interface::UartTx,
        display: &'a dyn Render,
        clock: &'a dyn MonotonicClock,
        backspace: &'a BackspaceMailbox,
    ) -> Self {
        Self {
            config,
            tx,
            display,
            clock,
            backspace,
        }
    }

    /// Handle the text produced by one key press.
    pub fn on_key_press(&self, text: &str) {
        for &byte in text.as_bytes() {
            self.forward(byte);
        }
    }

    fn forward(&self, mut byte: u8) {
        let cfg = &self.config;

        if cfg.send_cr_lf && byte == LF {
            self.tx.write_byte(CR);
        }

        if cfg.send_cr_only && byte == LF {
            byte = CR;
        }

        if cfg.swap_del_with_backspace && byte == DEL {
            byte = BS;
        }

        if cfg.backspace_echo && byte == BS {
            self.display.render_string(&[DEL]);
        }

        if cfg.skip_backspace_echo && byte == DEL {
            self.backspace.post(self.clock.uptime());
        }

        self.tx.write_byte(byte);
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{interface::UartTx, *};
    use crate::test_support::{ManualClock, RecordingDisplay};
    use core::{cell::RefCell, time::Duration};
    use std::vec::Vec;

    #[derive(Default)]
    struct RecordingTx(RefCell<Vec<u8>>);

    impl UartTx for RecordingTx {
        fn write_byte(&self, byte: u8) {
            self.0.borrow_mut().push(byte)
        }
    }

    struct Rig {
        tx: RecordingTx,
        display: RecordingDisplay,
        clock: ManualClock,
        mailbox: BackspaceMailbox,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                tx: RecordingTx::default(),
                display: RecordingDisplay::default(),
                clock: ManualClock::new(),
                mailbox: BackspaceMailbox::new(),
            }
        }

        fn press(&self, config: TransformConfig, text: &str) {
            KeyboardBridge::new(config, &self.tx, &self.display, &self.clock, &self.mailbox)
                .on_key_press(text)
        }

        fn sent(&self) -> Vec<u8> {
            self.tx.0.borrow().clone()
        }
    }

    #[test]
    fn plain_text_is_sent_unchanged() {
        let rig = Rig::new();
        rig.press(TransformConfig::default(), "a\n\x7f");

        assert_eq!(rig.sent(), b"a\n\x7f");
        assert!(rig.display.0.borrow().is_empty());
        assert_eq!(rig.mailbox.take(), None);
    }

    #[test]
    fn cr_lf_expansion_keeps_line_feed() {
        let rig = Rig::new();
        let config = TransformConfig {
            send_cr_lf: true,
            ..Default::default()
        };
        rig.press(config, "a\n");

        assert_eq!(rig.sent(), [0x61, 0x0D, 0x0A]);
    }

    #[test]
    fn cr_only_replaces_line_feed() {
        let rig = Rig::new();
        let config = TransformConfig {
            send_cr_only: true,
            ..Default::default()
        };
        rig.press(config, "a\n");

        assert_eq!(rig.sent(), [0x61, 0x0D]);
    }

    #[test]
    fn del_becomes_backspace_with_local_echo() {
        let rig = Rig::new();
        let config = TransformConfig {
            swap_del_with_backspace: true,
            backspace_echo: true,
            ..Default::default()
        };
        rig.press(config, "\x7f");

        assert_eq!(rig.sent(), [BS]);
        assert_eq!(*rig.display.0.borrow(), [DEL]);
    }

    #[test]
    fn del_posts_suppression_event_with_press_time() {
        let rig = Rig::new();
        let config = TransformConfig {
            skip_backspace_echo: true,
            ..Default::default()
        };
        rig.clock.set(Duration::from_millis(42));
        rig.press(config, "\x7f");

        assert_eq!(rig.sent(), [DEL]);
        assert_eq!(rig.mailbox.take(), Some(Duration::from_millis(42)));
    }

    #[test]
    fn swapped_del_does_not_arm_suppression() {
        let rig = Rig::new();
        let config = TransformConfig {
            swap_del_with_backspace: true,
            skip_backspace_echo: true,
            ..Default::default()
        };
        rig.press(config, "\x7f");

        assert_eq!(rig.sent(), [BS]);
        assert_eq!(rig.mailbox.take(), None);
    }
}
