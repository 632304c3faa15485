// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2019-2023 Andre Richter <andre.o.richter@gmail.com>

//! Boot sanity tests. The MMU is on, the heap hands out memory, and the console works.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

extern crate alloc;

use alloc::{boxed::Box, vec::Vec};
use libkernel::{bsp, console, cpu, exception, memory, print};
use test_macros::kernel_test;

#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    test_main();

    cpu::qemu_exit_success()
}

/// The banner names the kernel and the board.
#[kernel_test]
fn identification_strings() {
    assert!(libkernel::version().starts_with("serterm version "));
    assert_eq!(bsp::board_name(), "Raspberry Pi 3");
}

/// Allocations come from the arena and are never handed out twice.
#[kernel_test]
fn heap_allocations_are_distinct() {
    let (used_before, _) = memory::heap_alloc::kernel_heap_allocator().usage();

    let a = Box::new(0xAAu8);
    let b = Box::new(0xBBu8);
    let v: Vec<u64> = (0..128).collect();

    assert_ne!(&*a as *const u8, &*b as *const u8);
    assert_eq!(v.iter().sum::<u64>(), 127 * 128 / 2);

    let (used_after, _) = memory::heap_alloc::kernel_heap_allocator().usage();
    assert!(used_after >= used_before + 128 * 8);
}

/// Console statistics count what goes out.
#[kernel_test]
fn console_counts_written_chars() {
    let before = console::console().chars_written();

    print!("12345");

    assert_eq!(console::console().chars_written(), before + 5);
}
