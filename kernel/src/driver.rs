// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Driver support.
//!
//! Drivers are registered by the BSP in dependency order and brought up in that same order.
//! Interrupt handlers are attached in a second pass, after every post-init callback ran, because a
//! post-init callback is where the interrupt controller becomes the active IRQ manager.

use crate::{
    exception, info,
    synchronization::{interface::ReadWriteEx, InitStateLock},
    warn,
};
use alloc::vec::Vec;
use core::fmt;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Driver interfaces.
pub mod interface {
    /// A device the kernel brings up at boot.
    pub trait DeviceDriver {
        /// Interrupt number type of the controller the device is wired to.
        type IRQNumberType: super::fmt::Display;

        /// Name used in boot diagnostics.
        fn compatible(&self) -> &'static str;

        /// Bring up the device.
        ///
        /// # Safety
        ///
        /// - Runs once, single-threaded, with IRQs masked. May touch global hardware state.
        unsafe fn init(&self) -> Result<(), &'static str> {
            Ok(())
        }

        /// Bind the device's handler to `irq_number` and let the line through.
        ///
        /// The `'static` receiver is required because the IRQ manager keeps the reference.
        fn register_and_enable_irq_handler(
            &'static self,
            _irq_number: &Self::IRQNumberType,
        ) -> Result<(), &'static str> {
            Err("Driver does not support IRQs")
        }
    }
}

/// Runs right after the driver's `init()`. Typically registers the driver somewhere.
pub type DeviceDriverPostInitCallback = unsafe fn() -> Result<(), &'static str>;

/// One registered driver.
pub struct DeviceDriverDescriptor<T: 'static> {
    device_driver: &'static (dyn interface::DeviceDriver<IRQNumberType = T> + Sync),
    post_init_callback: Option<DeviceDriverPostInitCallback>,
    irq_number: Option<T>,
}

/// The ordered list of registered drivers.
pub struct DriverManager<T: 'static> {
    descriptors: InitStateLock<Vec<DeviceDriverDescriptor<T>>>,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static DRIVER_MANAGER: DriverManager<exception::asynchronous::IRQNumber> = DriverManager::new();

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl<T: fmt::Display> DeviceDriverDescriptor<T> {
    unsafe fn bring_up(&self) -> Result<(), &'static str> {
        let name = self.device_driver.compatible();

        self.device_driver
            .init()
            .inspect_err(|_| warn!("Error initializing driver: {}", name))?;

        if let Some(callback) = self.post_init_callback {
            callback().inspect_err(|_| warn!("Error during post-init callback: {}", name))?;
        }

        Ok(())
    }

    fn attach_irq(&self) -> Result<(), &'static str> {
        let Some(irq) = &self.irq_number else {
            return Ok(());
        };

        self.device_driver
            .register_and_enable_irq_handler(irq)
            .inspect_err(|_| {
                warn!(
                    "Error registering IRQ {} handler: {}",
                    irq,
                    self.device_driver.compatible()
                )
            })
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl<T> DeviceDriverDescriptor<T> {
    /// Create an instance.
    pub fn new(
        device_driver: &'static (dyn interface::DeviceDriver<IRQNumberType = T> + Sync),
        post_init_callback: Option<DeviceDriverPostInitCallback>,
        irq_number: Option<T>,
    ) -> Self {
        Self {
            device_driver,
            post_init_callback,
            irq_number,
        }
    }
}

/// The kernel's driver manager.
pub fn driver_manager() -> &'static DriverManager<exception::asynchronous::IRQNumber> {
    &DRIVER_MANAGER
}

impl<T: fmt::Display> DriverManager<T> {
    /// Create an empty instance.
    pub const fn new() -> Self {
        Self {
            descriptors: InitStateLock::new(Vec::new()),
        }
    }

    /// Append a driver. Registration order is bring-up order.
    pub fn register_driver(&self, descriptor: DeviceDriverDescriptor<T>) {
        self.descriptors.write(|list| list.push(descriptor));
    }

    /// Bring up every driver, then attach every interrupt handler.
    ///
    /// Stops at the first failure. The failing driver is named in a warning and the error is
    /// returned.
    ///
    /// # Safety
    ///
    /// - See [`interface::DeviceDriver::init`].
    pub unsafe fn init_drivers_and_irqs(&self) -> Result<(), &'static str> {
        self.descriptors.read(|list| {
            list.iter().try_for_each(|d| d.bring_up())?;
            list.iter().try_for_each(|d| d.attach_irq())
        })
    }

    /// Log the registered drivers.
    pub fn enumerate(&self) {
        self.descriptors.read(|list| {
            for (i, d) in list.iter().enumerate() {
                let name = d.device_driver.compatible();

                match &d.irq_number {
                    Some(irq) => info!("      {}. {} (IRQ {})", i + 1, name, irq),
                    None => info!("      {}. {}", i + 1, name),
                }
            }
        });
    }
}
