// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Terminal loop sanity tests.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

use core::time::Duration;
use libkernel::{bsp, cpu, exception, memory, terminal, time};
use term_core::{
    cancel::CancelToken,
    timer::{interface::TimerScheduler, TimerHandle},
};
use test_macros::kernel_test;

#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    test_main();

    cpu::qemu_exit_success()
}

static CANCEL: CancelToken = CancelToken::new();

fn stop_terminal(_handle: TimerHandle, _param: usize, _context: usize) {
    CANCEL.cancel();
}

/// The loop drains the ring and services timers until a timer callback cancels it.
#[kernel_test]
fn loop_drains_ring_until_cancelled() {
    let (mut producer, consumer) = terminal::init(64).unwrap();

    for &b in b"Hello from the other side\n" {
        producer.push(b);
    }
    time::time_manager()
        .register_timer(Duration::from_millis(50), stop_terminal, 0, 0)
        .unwrap();

    let t1 = time::time_manager().uptime();
    terminal::run(consumer, &CANCEL);
    let t2 = time::time_manager().uptime();

    assert!(producer.ring().is_empty());
    assert!(t2 - t1 >= Duration::from_millis(50));
    assert_eq!(time::time_manager().armed_timers(), 0);
}
