// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Keyboard to UART forwarding.

use super::BACKSPACE_EVENTS;
use crate::{config, display, serial::LinkTx, time::time_manager};
use term_core::keyboard::KeyboardBridge;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The handler registered with the USB keyboard host.
pub fn on_key_press(text: &str) {
    KeyboardBridge::new(
        config::KEYBOARD_TRANSFORMS,
        &LinkTx,
        display::display(),
        time_manager(),
        &BACKSPACE_EVENTS,
    )
    .on_key_press(text)
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// A DEL posts a suppression event only when the remote's echo is to be skipped.
    #[kernel_test]
    fn del_posts_event_per_configuration() {
        BACKSPACE_EVENTS.take();

        on_key_press("\x7f");

        let expected = config::KEYBOARD_TRANSFORMS.skip_backspace_echo
            && !config::KEYBOARD_TRANSFORMS.swap_del_with_backspace;
        assert_eq!(BACKSPACE_EVENTS.take().is_some(), expected);
    }
}
