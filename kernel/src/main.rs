// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

// Rust embedded logo for `make doc`.
#![doc(
    html_logo_url = "https://raw.githubusercontent.com/rust-embedded/wg/master/assets/logo/ewg-logo-blue-white-on-transparent.png"
)]

//! The `kernel` binary.

#![feature(format_args_nl)]
#![no_main]
#![no_std]

use libkernel::{
    bsp, config, display, driver, exception, info, memory, print, println, serial, state,
    terminal, time, usb,
};
use term_core::ring::Consumer;

/// Brings the board up in dependency order, then hands over to [`kernel_main`].
///
/// # Safety
///
/// - Runs once on the boot core, with IRQs masked until the unmask near the end.
#[no_mangle]
unsafe fn kernel_init() -> ! {
    exception::handling_init();
    memory::init();

    let (producer, consumer) = match terminal::init(config::SERIAL_RING_CAPACITY) {
        Err(x) => panic!("Error allocating the serial ring: {}", x),
        Ok(handles) => handles,
    };

    if let Err(x) = bsp::driver::init() {
        panic!("Error initializing BSP driver subsystem: {}", x);
    }

    if let Err(x) = time::init() {
        panic!("Error initializing timer subsystem: {}", x);
    }

    if let Err(x) = driver::driver_manager().init_drivers_and_irqs() {
        panic!("Error initializing device drivers: {}", x);
    }

    // From here on, the UART interrupt feeds the ring.
    if let Err(x) = serial::link().attach_producer(producer) {
        panic!("Error attaching the serial ring: {}", x);
    }

    if let Err(x) = display::init() {
        panic!("Error initializing the display: {}", x);
    }

    // The blocking heartbeat replaces the timer-driven one.
    #[cfg(not(feature = "heartbeat_blocking"))]
    if let Err(x) = terminal::heartbeat::arm() {
        panic!("Error arming the heartbeat: {}", x);
    }

    exception::asynchronous::local_irq_unmask();

    state::state_manager().transition_to_running();

    kernel_main(consumer)
}

/// Boot diagnostics.
fn print_diagnostics() {
    info!("Booting on: {}", bsp::board_name());

    memory::print_state();

    let (_, privilege_level) = exception::current_privilege_level();
    info!("Current privilege level: {}", privilege_level);

    info!("Exception handling state:");
    exception::asynchronous::print_state();

    info!(
        "Architectural timer resolution: {} ns",
        time::time_manager().resolution().as_nanos()
    );

    info!("Drivers loaded:");
    driver::driver_manager().enumerate();

    info!("Registered IRQ handlers:");
    exception::asynchronous::irq_manager().print_handler();

    info!(
        "UART bytes dropped before the ring was attached: {}",
        bsp::driver::uart_chars_dropped()
    );
}

/// Banner, diagnostics and the keyboard, then the terminal loop for good.
fn kernel_main(consumer: Consumer<'static>) -> ! {
    print!("\x1B[2J");
    println!("\x1B[44;97m === {} === \x1B[0m", libkernel::version());
    println!("Waiting for UART data ({},8,N,1)", config::UART_BAUD_RATE);

    print_diagnostics();

    usb::init(terminal::keyboard::on_key_press);

    #[cfg(feature = "heartbeat_blocking")]
    run_blocking_heartbeat(consumer);

    #[cfg(not(feature = "heartbeat_blocking"))]
    terminal::run_forever(consumer);
}

/// Diagnostic mode. The LED blinks from the foreground and nothing drains the ring.
#[cfg(feature = "heartbeat_blocking")]
fn run_blocking_heartbeat(consumer: Consumer<'static>) -> ! {
    use libkernel::cpu;
    use term_core::cancel::CancelToken;

    drop(consumer);
    info!("Blocking heartbeat");

    terminal::heartbeat::run_blocking(&CancelToken::new());
    cpu::wait_forever()
}
