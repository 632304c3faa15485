// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! IRQ masking on the executing core.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

use libkernel::{bsp, cpu, exception, exception::asynchronous as irq, memory};
use test_macros::kernel_test;

/// Every test starts and ends with IRQs unmasked.
#[no_mangle]
unsafe fn kernel_init() -> ! {
    memory::init();
    bsp::driver::qemu_bring_up_console();

    exception::handling_init();
    irq::local_irq_unmask();

    test_main();

    cpu::qemu_exit_success()
}

#[kernel_test]
fn mask_and_unmask_toggle_the_irq_bit() {
    assert!(!irq::is_local_irq_masked());

    irq::local_irq_mask();
    assert!(irq::is_local_irq_masked());

    irq::local_irq_unmask();
    assert!(!irq::is_local_irq_masked());
}

/// The saved value describes the state before the call, so a nested save differs from it.
#[kernel_test]
fn mask_save_returns_previous_state() {
    let outer = irq::local_irq_mask_save();
    let inner = irq::local_irq_mask_save();

    assert!(irq::is_local_irq_masked());
    assert_ne!(outer, inner);

    irq::local_irq_restore(inner);
    assert!(irq::is_local_irq_masked());

    irq::local_irq_restore(outer);
    assert!(!irq::is_local_irq_masked());
}

#[kernel_test]
fn exec_with_irq_masked_restores_state() {
    let inside = irq::exec_with_irq_masked(irq::is_local_irq_masked);

    assert!(inside);
    assert!(!irq::is_local_irq_masked());
}
