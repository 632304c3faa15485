// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

// Rust embedded logo for `make doc`.
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/rust-embedded/wg/master/assets/logo/ewg-logo-blue-white-on-transparent.png"
)]

//! The `serterm` kernel library.
//!
//! A bare-metal serial terminal for the Raspberry Pi 3. Bytes arriving on the PL011 UART are
//! buffered in a ring by the UART interrupt handler and drained, one byte per loop iteration, into
//! the display engine. Keys pressed on a USB keyboard travel the opposite way.
//!
//! # Layout
//!
//! - One module per subsystem in `src`, e.g. `src/serial.rs` for the serial link.
//! - Architecture specific halves of a subsystem live under `src/_arch/aarch64` at the mirrored
//!   path and are pulled in with the `path` attribute as `arch_<name>` modules.
//! - `src/bsp` holds the board: memory map, translation layout and the driver instances.
//! - The target-independent terminal logic (ring, ingestion, drain loop, timers, heartbeat,
//!   keyboard transforms) lives in the `term-core` crate and is unit-tested on the host.
//!
//! Collaborators of the terminal are reached through `interface` traits. Each one sits behind a
//! registry holding a `&'static dyn` object that points at a null implementation until the BSP
//! registers the real driver.
//!
//! # Boot flow
//!
//! `_start` in `src/_arch/aarch64/cpu/boot.s` parks the secondary cores, sets up the stack and
//! zeroes `.bss`. It then hands over to `kernel_init()` in `main.rs`.

#![allow(clippy::upper_case_acronyms)]
#![allow(incomplete_features)]
#![feature(format_args_nl)]
#![feature(linkage)]
#![no_std]
// Testing
#![cfg_attr(test, no_main)]
#![feature(custom_test_frameworks)]
#![reexport_test_harness_main = "test_main"]
#![test_runner(crate::test_runner)]

extern crate alloc;

mod panic_wait;
mod synchronization;

pub mod bsp;
pub mod common;
pub mod config;
pub mod console;
pub mod cpu;
pub mod display;
pub mod dma;
pub mod driver;
pub mod exception;
pub mod memory;
pub mod print;
pub mod serial;
pub mod state;
pub mod terminal;
pub mod time;
pub mod usb;

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Version string.
pub fn version() -> &'static str {
    concat!(
        env!("CARGO_PKG_NAME"),
        " version ",
        env!("CARGO_PKG_VERSION")
    )
}

#[cfg(not(test))]
extern "Rust" {
    fn kernel_init() -> !;
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

/// Runs the `#[kernel_test]` functions of a test binary in order.
pub fn test_runner(tests: &[&test_types::UnitTest]) {
    println!("Running {} tests", tests.len());

    for (i, test) in tests.iter().enumerate() {
        print!(
            "{:>3}. {:.<58}",
            i + 1,
            alloc::format!("{}::{}", test.short_module(), test.name)
        );

        // A failing test panics and never returns here.
        (test.test_func)();
        println!("[ok]")
    }
}

/// The `kernel_init()` for unit tests.
#[cfg(test)]
#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    test_main();

    cpu::qemu_exit_success()
}
