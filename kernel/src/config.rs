// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Build-time configuration of the terminal.
//!
//! There is no runtime configuration source. Everything that can be tuned is either a constant
//! here or a cargo feature of the `kernel` package.

use core::time::Duration;
use term_core::keyboard::TransformConfig;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Size of the serial ring in bytes. At most one byte less than this is buffered.
pub const SERIAL_RING_CAPACITY: usize = term_core::ring::DEFAULT_CAPACITY;

/// Baud rate of the PL011 UART. The line runs 8N1.
pub const UART_BAUD_RATE: u32 = 115_200;

/// Toggles per second of the timer-driven heartbeat.
pub const HEARTBEAT_FREQUENCY_HZ: u64 = 1;

/// Period of the timer-driven heartbeat.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_micros(1_000_000 / HEARTBEAT_FREQUENCY_HZ);

/// Toggle threshold of the blocking heartbeat.
pub const HEARTBEAT_BLOCKING_THRESHOLD: Duration = term_core::heartbeat::BLOCKING_THRESHOLD;

/// Number of concurrently armed timers.
pub const TIMER_SLOTS: usize = 16;

/// Video mode requested from the VideoCore.
pub const VIDEO_WIDTH: u32 = 640;
#[allow(missing_docs)]
pub const VIDEO_HEIGHT: u32 = 480;
#[allow(missing_docs)]
pub const VIDEO_DEPTH: u32 = 8;

/// Outbound keyboard transforms, selected by the cargo features of the same name.
pub const KEYBOARD_TRANSFORMS: TransformConfig = TransformConfig {
    send_cr_lf: cfg!(feature = "send_cr_lf"),
    send_cr_only: cfg!(feature = "send_cr_only"),
    swap_del_with_backspace: cfg!(feature = "swap_del_with_backspace"),
    backspace_echo: cfg!(feature = "backspace_echo"),
    skip_backspace_echo: cfg!(feature = "skip_backspace_echo"),
};
