// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Per-core local interrupt controller of the BCM2836 family.
//!
//! Only core 0 is served, and only its four ARM timer lines are ever enabled. Bit 8 of the source
//! register means "the peripheral controller has something" and is handled by the parent driver.
//!
//! # Resources
//!
//! - <https://datasheets.raspberrypi.com/bcm2836/bcm2836-peripherals.pdf>

use super::{HandlerTable, LocalIRQ, PendingIRQs};
use crate::{
    bsp::device_driver::common::MMIODerefWrapper,
    exception::{self, asynchronous::IRQHandlerDescriptor},
    synchronization::{interface::ReadWriteEx, InitStateLock},
};
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_structs,
    registers::{ReadOnly, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => _control_and_prescaler),
        (0x40 => CORE0_TIMER_INTERRUPT_CONTROL: WriteOnly<u32>),
        (0x44 => _mailbox_control),
        (0x60 => CORE0_INTERRUPT_SOURCE: ReadOnly<u32>),
        (0x64 => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

/// CNTPSIRQ, CNTPNSIRQ, CNTHPIRQ and CNTVIRQ.
const TIMER_LINES: u32 = 0b1111;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The local controller of core 0.
pub struct LocalIC {
    registers: Registers,
    handlers: InitStateLock<HandlerTable<LocalIRQ, { LocalIRQ::MAX_INCLUSIVE + 1 }>>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl LocalIC {
    /// # Safety
    ///
    /// - `mmio_start_addr` must be the controller's base address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
            handlers: InitStateLock::new(HandlerTable::new()),
        }
    }

    /// Start with every timer line disabled.
    pub fn init(&self) {
        self.registers.CORE0_TIMER_INTERRUPT_CONTROL.set(0);
    }

    fn pending_irqs(&self) -> PendingIRQs {
        let source = self.registers.CORE0_INTERRUPT_SOURCE.get();

        PendingIRQs::new(u64::from(source & TIMER_LINES))
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl exception::asynchronous::interface::IRQManager for LocalIC {
    type IRQNumberType = LocalIRQ;

    fn register_handler(
        &self,
        descriptor: IRQHandlerDescriptor<Self::IRQNumberType>,
    ) -> Result<(), &'static str> {
        self.handlers
            .write(|table| table.insert(descriptor.number().get(), descriptor))
    }

    fn enable(&self, irq: &Self::IRQNumberType) {
        // This register is not write-1-to-set. One line in use means one bit is enough.
        self.registers
            .CORE0_TIMER_INTERRUPT_CONTROL
            .set(1 << irq.get());
    }

    fn handle_pending_irqs<'irq_context>(
        &'irq_context self,
        _ic: &exception::asynchronous::IRQContext<'irq_context>,
    ) {
        let pending = self.pending_irqs();

        self.handlers.read(|table| table.dispatch(pending))
    }

    fn print_handler(&self) {
        self.handlers.read(|table| table.print("Local"));
    }
}
