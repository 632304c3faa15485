// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! BSP driver support.

use super::{exception, memory::map::mmio};
use crate::{
    bsp::device_driver, display, dma, driver as generic_driver,
    exception::{self as generic_exception},
    serial, terminal,
};
use core::sync::atomic::{AtomicBool, Ordering};

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static PL011_UART: device_driver::PL011Uart =
    unsafe { device_driver::PL011Uart::new(mmio::PL011_UART_START) };
static GPIO: device_driver::GPIO = unsafe { device_driver::GPIO::new(mmio::GPIO_START) };
static INTERRUPT_CONTROLLER: device_driver::InterruptController = unsafe {
    device_driver::InterruptController::new(mmio::LOCAL_IC_START, mmio::PERIPHERAL_IC_START)
};
static DMA: device_driver::DMAChannel0 =
    unsafe { device_driver::DMAChannel0::new(mmio::DMA_START) };
static MAILBOX: device_driver::Mailbox =
    unsafe { device_driver::Mailbox::new(mmio::MAILBOX_START) };

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// This must be called only after successful init of the UART driver.
unsafe fn post_init_uart() -> Result<(), &'static str> {
    serial::register_link(&PL011_UART);

    // Production builds print to the screen. Test builds need the UART as the console.
    #[cfg(feature = "test_build")]
    crate::console::register_console(&PL011_UART);

    Ok(())
}

/// This must be called only after successful init of the GPIO driver.
unsafe fn post_init_gpio() -> Result<(), &'static str> {
    GPIO.map_pl011_uart();
    terminal::heartbeat::register_status_indicator(&GPIO);

    Ok(())
}

/// This must be called only after successful init of the interrupt controller driver.
unsafe fn post_init_interrupt_controller() -> Result<(), &'static str> {
    generic_exception::asynchronous::register_irq_manager(&INTERRUPT_CONTROLLER);

    Ok(())
}

/// This must be called only after successful init of the DMA driver.
unsafe fn post_init_dma() -> Result<(), &'static str> {
    dma::register_dma_status(&DMA);

    Ok(())
}

/// This must be called only after successful init of the mailbox driver.
unsafe fn post_init_mailbox() -> Result<(), &'static str> {
    display::register_video_output(&MAILBOX);

    Ok(())
}

fn driver_uart() {
    let uart_descriptor = generic_driver::DeviceDriverDescriptor::new(
        &PL011_UART,
        Some(post_init_uart),
        Some(exception::asynchronous::irq_map::PL011_UART),
    );
    generic_driver::driver_manager().register_driver(uart_descriptor);
}

fn driver_gpio() {
    let gpio_descriptor =
        generic_driver::DeviceDriverDescriptor::new(&GPIO, Some(post_init_gpio), None);
    generic_driver::driver_manager().register_driver(gpio_descriptor);
}

fn driver_interrupt_controller() {
    let interrupt_controller_descriptor = generic_driver::DeviceDriverDescriptor::new(
        &INTERRUPT_CONTROLLER,
        Some(post_init_interrupt_controller),
        None,
    );
    generic_driver::driver_manager().register_driver(interrupt_controller_descriptor);
}

fn driver_dma() {
    let dma_descriptor =
        generic_driver::DeviceDriverDescriptor::new(&DMA, Some(post_init_dma), None);
    generic_driver::driver_manager().register_driver(dma_descriptor);
}

fn driver_mailbox() {
    let mailbox_descriptor =
        generic_driver::DeviceDriverDescriptor::new(&MAILBOX, Some(post_init_mailbox), None);
    generic_driver::driver_manager().register_driver(mailbox_descriptor);
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Initialize the driver subsystem.
///
/// The GPIO must come before the UART, because the UART's pins are routed in the GPIO's post-init
/// callback.
///
/// # Safety
///
/// See child function calls.
pub unsafe fn init() -> Result<(), &'static str> {
    static INIT_DONE: AtomicBool = AtomicBool::new(false);
    if INIT_DONE.load(Ordering::Relaxed) {
        return Err("Init already done");
    }

    driver_gpio();
    driver_uart();
    driver_interrupt_controller();
    driver_dma();
    driver_mailbox();

    INIT_DONE.store(true, Ordering::Relaxed);
    Ok(())
}

/// The UART's capture counter, for the boot diagnostics.
pub fn uart_chars_dropped() -> usize {
    PL011_UART.chars_dropped()
}

/// Minimal code needed to bring up the console in QEMU (for testing only). This is often less steps
/// than on real hardware due to QEMU's abstractions.
#[cfg(feature = "test_build")]
pub fn qemu_bring_up_console() {
    crate::console::register_console(&PL011_UART);
}
