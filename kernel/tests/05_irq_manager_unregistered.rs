// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Using the IRQ manager before the interrupt controller was registered must panic.

#![feature(format_args_nl)]
#![no_main]
#![no_std]

/// Overwrites libkernel's `panic_wait::_panic_exit()` so that it returns a "success" code.
///
/// In this test, reaching the panic is a success, because the null IRQ manager panics on use.
mod panic_exit_success;

use libkernel::{bsp, cpu, exception, info, memory, println};

use bsp::exception::asynchronous::irq_map;

#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    // This line will be printed as the test header.
    println!("Testing the unregistered IRQ manager");

    info!("Enabling the UART IRQ without an interrupt controller...");
    exception::asynchronous::irq_manager().enable(&irq_map::PL011_UART);

    // If execution reaches here, the null manager silently accepted the call.
    cpu::qemu_exit_failure()
}
