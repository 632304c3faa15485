// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2019-2023 Andre Richter <andre.o.richter@gmail.com>

//! Timer sanity tests.

#![feature(custom_test_frameworks)]
#![no_main]
#![no_std]
#![reexport_test_harness_main = "test_main"]
#![test_runner(libkernel::test_runner)]

use core::{
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    time::Duration,
};
use libkernel::{bsp, cpu, exception, memory, time};
use term_core::timer::{interface::TimerScheduler, TimerHandle};
use test_macros::kernel_test;

#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();
    bsp::driver::qemu_bring_up_console();

    test_main();

    cpu::qemu_exit_success()
}

/// The counter runs from reset, so uptime is never zero once Rust code executes.
#[kernel_test]
fn uptime_is_counting_with_fine_resolution() {
    let tm = time::time_manager();

    assert!(tm.uptime() > Duration::ZERO);
    assert!(tm.resolution() > Duration::ZERO);
    assert!(tm.resolution() < Duration::from_nanos(100));
}

/// The heartbeat and the backspace window both rely on `spin_for()` style timing.
#[kernel_test]
fn spin_for_one_second_takes_one_second() {
    let tm = time::time_manager();

    let before = tm.uptime();
    tm.spin_for(Duration::from_secs(1));

    assert_eq!((tm.uptime() - before).as_secs(), 1)
}

static FIRED: AtomicUsize = AtomicUsize::new(0);

fn count(_handle: TimerHandle, param: usize, _context: usize) {
    FIRED.fetch_add(param, Ordering::Relaxed);
}

/// With IRQs masked, due callbacks run from the foreground service point, and only once.
#[kernel_test]
fn poll_fires_due_callbacks_once() {
    let tm = time::time_manager();
    tm.register_timer(Duration::from_millis(10), count, 3, 0)
        .unwrap();

    assert_eq!(tm.poll(), 0);
    tm.spin_for(Duration::from_millis(20));

    assert_eq!(tm.poll(), 1);
    assert_eq!(tm.poll(), 0);
    assert_eq!(FIRED.load(Ordering::Relaxed), 3);
    assert_eq!(tm.armed_timers(), 0);
}

static IRQ_SEEN_IN_CALLBACK: AtomicBool = AtomicBool::new(true);

fn sample_irq_line(_handle: TimerHandle, _param: usize, _context: usize) {
    IRQ_SEEN_IN_CALLBACK.store(time::time_manager().timeout_irq_pending(), Ordering::Relaxed);
}

/// Taking the last due entry from the foreground disarms the compare before its callback runs,
/// so no stale timeout IRQ is left behind.
#[kernel_test]
fn poll_disarms_timer_before_callback() {
    let tm = time::time_manager();
    tm.register_timer(Duration::from_millis(5), sample_irq_line, 0, 0)
        .unwrap();

    tm.spin_for(Duration::from_millis(10));
    assert!(tm.timeout_irq_pending());

    assert_eq!(tm.poll(), 1);
    assert!(!IRQ_SEEN_IN_CALLBACK.load(Ordering::Relaxed));
    assert!(!tm.timeout_irq_pending());
}
