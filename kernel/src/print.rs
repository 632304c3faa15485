// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Printing.
//!
//! All output goes to the console currently registered in [`crate::console`]. Leveled messages
//! are prefixed with the uptime, e.g. `[    1.000314] ` for info and `[W   1.000314] ` for warnings.

use crate::{console, time};
use core::fmt;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Severity tag printed in front of the timestamp.
#[doc(hidden)]
#[derive(Copy, Clone)]
pub enum Level {
    Info,
    Warn,
    Debug,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

#[doc(hidden)]
pub fn _print(args: fmt::Arguments) {
    // A broken console has nowhere to report to.
    let _ = console::console().write_fmt(args);
}

#[doc(hidden)]
pub fn _print_leveled(level: Level, args: fmt::Arguments) {
    let timestamp = time::time_manager().uptime();

    let (open, tag, close) = match level {
        Level::Info => ('[', ' ', ']'),
        Level::Warn => ('[', 'W', ']'),
        Level::Debug => ('<', 'D', '>'),
    };

    _print(format_args_nl!(
        "{}{} {:>3}.{:06}{} {}",
        open,
        tag,
        timestamp.as_secs(),
        timestamp.subsec_micros(),
        close,
        args
    ));
}

/// Prints without a newline.
///
/// Carbon copy from <https://doc.rust-lang.org/src/std/macros.rs.html>
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::print::_print(format_args!($($arg)*)));
}

/// Prints with a newline.
///
/// Carbon copy from <https://doc.rust-lang.org/src/std/macros.rs.html>
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ({
        $crate::print::_print(format_args_nl!($($arg)*));
    })
}

/// Prints an info, with a newline.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => ({
        $crate::print::_print_leveled($crate::print::Level::Info, format_args!($($arg)*));
    })
}

/// Prints a warning, with a newline.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => ({
        $crate::print::_print_leveled($crate::print::Level::Warn, format_args!($($arg)*));
    })
}

/// Debug print, with a newline.
///
/// Compiled to nothing unless the `debug_prints` feature is active.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => ({
        if cfg!(feature = "debug_prints") {
            $crate::print::_print_leveled($crate::print::Level::Debug, format_args!($($arg)*));
        }
    })
}
