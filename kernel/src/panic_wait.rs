// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Panic handler. Prints the message on the console and parks the core.

use crate::{cpu, exception, println};
use core::panic::PanicInfo;

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Where a panic ends up.
///
/// Weak, so that integration tests expecting a panic can provide a success exit instead.
#[linkage = "weak"]
#[no_mangle]
fn _panic_exit() -> ! {
    #[cfg(not(feature = "test_build"))]
    {
        cpu::wait_forever()
    }

    #[cfg(feature = "test_build")]
    {
        cpu::qemu_exit_failure()
    }
}

/// A panic while printing the panic message goes straight to [`_panic_exit`].
///
/// Only relaxed loads and stores are used. They compile to plain instructions on AArch64 and work
/// before the MMU is on, unlike read-modify-write atomics.
fn panic_prevent_reenter() {
    use core::sync::atomic::{AtomicBool, Ordering};

    #[cfg(not(target_arch = "aarch64"))]
    compile_error!("Check that relaxed atomics work without caches on this architecture");

    static PANICKING: AtomicBool = AtomicBool::new(false);

    if PANICKING.load(Ordering::Relaxed) {
        _panic_exit()
    }
    PANICKING.store(true, Ordering::Relaxed);
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    exception::asynchronous::local_irq_mask();

    panic_prevent_reenter();

    let timestamp = crate::time::time_manager().uptime();
    let (location, line, column) = match info.location() {
        Some(loc) => (loc.file(), loc.line(), loc.column()),
        _ => ("???", 0, 0),
    };

    println!(
        "[  {:>3}.{:06}] Kernel panic!\n\n\
        Panic location:\n      File '{}', line {}, column {}\n\n\
        {}",
        timestamp.as_secs(),
        timestamp.subsec_micros(),
        location,
        line,
        column,
        info.message(),
    );

    _panic_exit()
}
