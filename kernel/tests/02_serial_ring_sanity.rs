// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Serial ring sanity tests, with the storage coming from the kernel's arena.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

use libkernel::{bsp, config, cpu, exception, memory, terminal};
use term_core::ring::Push;
use test_macros::kernel_test;

#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    test_main();

    cpu::qemu_exit_success()
}

/// The production ring fits in the arena and wraps around by dropping the oldest byte.
#[kernel_test]
fn full_ring_overwrites_oldest() {
    let (_, free_before) = memory::heap_alloc::kernel_heap_allocator().usage();
    let (mut producer, mut consumer) = terminal::init(config::SERIAL_RING_CAPACITY).unwrap();
    let (_, free_after) = memory::heap_alloc::kernel_heap_allocator().usage();

    assert!(free_before - free_after >= config::SERIAL_RING_CAPACITY);

    let capacity = producer.ring().capacity();
    for i in 0..capacity - 1 {
        assert_eq!(producer.push(i as u8), Push::Stored);
    }
    assert_eq!(producer.push(0xEE), Push::DroppedOldest);

    // Byte 0 is gone, the rest arrive in order.
    assert_eq!(consumer.pop(), Some(1));
    for i in 2..capacity - 1 {
        assert_eq!(consumer.pop(), Some(i as u8));
    }
    assert_eq!(consumer.pop(), Some(0xEE));
    assert_eq!(consumer.pop(), None);
}
