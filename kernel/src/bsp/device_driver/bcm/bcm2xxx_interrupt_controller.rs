// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Interrupt Controller Driver.
//!
//! The BCM2837 routes interrupts through two levels. The per-core local controller sees the ARM
//! timers directly and raises a single "peripheral" source for everything behind the legacy
//! peripheral controller, which in turn carries the UART.

mod local_ic;
mod peripheral_ic;

use crate::{
    bsp::device_driver::common::BoundedUsize,
    driver,
    exception::{self, asynchronous::IRQHandlerDescriptor},
    warn,
};
use core::fmt;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

/// Wrapper struct for a bitmask indicating pending IRQ numbers.
struct PendingIRQs {
    bitmask: u64,
}

/// Fixed-size table of registered handlers, indexed by IRQ number.
///
/// Writable only during kernel init. RO afterwards.
struct HandlerTable<T: Copy, const N: usize> {
    slots: [Option<IRQHandlerDescriptor<T>>; N],
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

pub type LocalIRQ = BoundedUsize<{ InterruptController::MAX_LOCAL_IRQ_NUMBER }>;
pub type PeripheralIRQ = BoundedUsize<{ InterruptController::MAX_PERIPHERAL_IRQ_NUMBER }>;

/// Used for the associated type of trait [`exception::asynchronous::interface::IRQManager`].
#[derive(Copy, Clone)]
#[allow(missing_docs)]
pub enum IRQNumber {
    Local(LocalIRQ),
    Peripheral(PeripheralIRQ),
}

/// Representation of the Interrupt Controller.
pub struct InterruptController {
    local: local_ic::LocalIC,
    periph: peripheral_ic::PeripheralIC,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl PendingIRQs {
    pub fn new(bitmask: u64) -> Self {
        Self { bitmask }
    }
}

impl Iterator for PendingIRQs {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bitmask == 0 {
            return None;
        }

        let next = self.bitmask.trailing_zeros() as usize;
        self.bitmask &= self.bitmask.wrapping_sub(1);
        Some(next)
    }
}

impl<T: Copy, const N: usize> HandlerTable<T, N> {
    const fn new() -> Self {
        Self { slots: [None; N] }
    }

    fn insert(&mut self, index: usize, descriptor: IRQHandlerDescriptor<T>) -> Result<(), &'static str> {
        let slot = self.slots.get_mut(index).ok_or("IRQ number out of range")?;

        if slot.is_some() {
            return Err("IRQ handler already registered");
        }
        *slot = Some(descriptor);

        Ok(())
    }

    /// Run the handler of every pending line.
    ///
    /// A pending line without a handler cannot be acknowledged and would fire forever, so that is
    /// fatal. A handler reporting an error is not.
    fn dispatch(&self, pending: PendingIRQs) {
        for irq_number in pending {
            match self.slots.get(irq_number).copied().flatten() {
                None => panic!("No handler registered for IRQ {}", irq_number),
                Some(descriptor) => {
                    if let Err(x) = descriptor.handler().handle() {
                        warn!("IRQ {} ({}): {}", irq_number, descriptor.name(), x);
                    }
                }
            }
        }
    }

    fn print(&self, title: &str) {
        use crate::info;

        info!("      {} handler:", title);

        for (i, opt) in self.slots.iter().enumerate() {
            if let Some(handler) = opt {
                info!("            {: >3}. {}", i, handler.name());
            }
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl fmt::Display for IRQNumber {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Local(number) => write!(f, "Local({})", number),
            Self::Peripheral(number) => write!(f, "Peripheral({})", number),
        }
    }
}

impl InterruptController {
    // Restrict to 3 for now. Those are the four per-core ARM timer lines.
    const MAX_LOCAL_IRQ_NUMBER: usize = 3;
    const MAX_PERIPHERAL_IRQ_NUMBER: usize = 63;

    pub const COMPATIBLE: &'static str = "BCM Interrupt Controller";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide correct MMIO start addresses.
    pub const unsafe fn new(local_mmio_start_addr: usize, periph_mmio_start_addr: usize) -> Self {
        Self {
            local: local_ic::LocalIC::new(local_mmio_start_addr),
            periph: peripheral_ic::PeripheralIC::new(periph_mmio_start_addr),
        }
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl driver::interface::DeviceDriver for InterruptController {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        self.local.init();
        self.periph.init();

        Ok(())
    }
}

impl exception::asynchronous::interface::IRQManager for InterruptController {
    type IRQNumberType = IRQNumber;

    fn register_handler(
        &self,
        irq_handler_descriptor: IRQHandlerDescriptor<Self::IRQNumberType>,
    ) -> Result<(), &'static str> {
        let name = irq_handler_descriptor.name();
        let handler = irq_handler_descriptor.handler();

        match irq_handler_descriptor.number() {
            IRQNumber::Local(lirq) => self
                .local
                .register_handler(IRQHandlerDescriptor::new(lirq, name, handler)),
            IRQNumber::Peripheral(pirq) => self
                .periph
                .register_handler(IRQHandlerDescriptor::new(pirq, name, handler)),
        }
    }

    fn enable(&self, irq: &Self::IRQNumberType) {
        match irq {
            IRQNumber::Local(lirq) => self.local.enable(lirq),
            IRQNumber::Peripheral(pirq) => self.periph.enable(pirq),
        }
    }

    fn handle_pending_irqs<'irq_context>(
        &'irq_context self,
        ic: &exception::asynchronous::IRQContext<'irq_context>,
    ) {
        self.local.handle_pending_irqs(ic);
        self.periph.handle_pending_irqs(ic)
    }

    fn print_handler(&self) {
        self.local.print_handler();
        self.periph.print_handler();
    }
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;
    use test_macros::kernel_test;

    /// Pending bits are reported lowest first, each exactly once.
    #[kernel_test]
    fn pending_irqs_iterate_set_bits() {
        let pending: Vec<usize> = PendingIRQs::new((1 << 57) | (1 << 1) | 1).collect();

        assert_eq!(pending, [0, 1, 57]);
    }

    /// A line takes one handler, and only lines the table covers are accepted.
    #[kernel_test]
    fn handler_table_rejects_double_and_out_of_range_registration() {
        struct Quiet;
        impl exception::asynchronous::interface::IRQHandler for Quiet {
            fn handle(&self) -> Result<(), &'static str> {
                Ok(())
            }
        }
        static QUIET: Quiet = Quiet;

        let mut table: HandlerTable<LocalIRQ, 4> = HandlerTable::new();
        let descriptor = IRQHandlerDescriptor::new(LocalIRQ::new(1), "quiet", &QUIET);

        assert!(table.insert(1, descriptor).is_ok());
        assert_eq!(table.insert(1, descriptor), Err("IRQ handler already registered"));
        assert_eq!(table.insert(4, descriptor), Err("IRQ number out of range"));
    }
}
