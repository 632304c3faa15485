// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! USB keyboard host.
//!
//! The USB stack itself is an external collaborator. It reports key presses as short strings,
//! already translated through the keymap, to one registered handler.

use crate::synchronization::{self, InitStateLock};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Called from the USB stack's context for every key press.
pub type KeyPressedHandler = fn(text: &str);

/// USB interfaces.
pub mod interface {
    /// Keyboard side of a USB host stack.
    pub trait KeyboardHost {
        /// Bring up the host controller and enumerate devices.
        fn initialize(&self) -> Result<(), &'static str>;

        /// Whether a keyboard was found during enumeration.
        fn keyboard_available(&self) -> bool;

        /// Install the handler for key presses. There is only one.
        fn register_key_pressed_handler(&self, handler: super::KeyPressedHandler);
    }
}

/// Outcome of [`init`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyboardStatus {
    /// A keyboard is attached and its presses reach the handler.
    Attached,

    /// The host came up, but no keyboard is plugged in.
    NoKeyboard,

    /// The host controller failed to start.
    HostFailed,
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Used when the board has no USB stack wired in.
struct NullKeyboardHost;

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static NULL_KEYBOARD_HOST: NullKeyboardHost = NullKeyboardHost;

static CUR_KEYBOARD_HOST: InitStateLock<&'static (dyn interface::KeyboardHost + Sync)> =
    InitStateLock::new(&NULL_KEYBOARD_HOST);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl interface::KeyboardHost for NullKeyboardHost {
    fn initialize(&self) -> Result<(), &'static str> {
        Err("No USB host stack")
    }

    fn keyboard_available(&self) -> bool {
        false
    }

    fn register_key_pressed_handler(&self, _handler: KeyPressedHandler) {}
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

/// Register a new keyboard host.
pub fn register_keyboard_host(new_host: &'static (dyn interface::KeyboardHost + Sync)) {
    CUR_KEYBOARD_HOST.write(|host| *host = new_host);
}

/// Return a reference to the currently registered keyboard host.
pub fn keyboard_host() -> &'static dyn interface::KeyboardHost {
    CUR_KEYBOARD_HOST.read(|host| *host)
}

/// Start the host and hook `handler` up to the keyboard, if there is one.
///
/// Prints the progress to the console as it goes. Failure is not fatal; the terminal keeps
/// working for the remote side.
pub fn init(handler: KeyPressedHandler) -> KeyboardStatus {
    use crate::{print, println};

    let host = keyboard_host();

    print!("\x1B[44;93mInitializing USB: \x1B[0m");

    if let Err(x) = host.initialize() {
        println!("\x1B[91mUSB initialization failed.\x1B[0m");
        crate::debug!("USB: {}", x);
        return KeyboardStatus::HostFailed;
    }

    println!("Initialization OK!");
    print!("Checking for keyboards: ");

    if !host.keyboard_available() {
        println!("\x1B[91mNo keyboard found.\x1B[0m");
        return KeyboardStatus::NoKeyboard;
    }

    host.register_key_pressed_handler(handler);
    println!("\x1B[92mKeyboard found.\x1B[0m");

    KeyboardStatus::Attached
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    fn ignore(_text: &str) {}

    #[kernel_test]
    fn missing_usb_stack_is_not_fatal() {
        assert_eq!(init(ignore), KeyboardStatus::HostFailed);
    }
}
