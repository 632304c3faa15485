// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2020-2023 Andre Richter <andre.o.richter@gmail.com>

//! Legacy peripheral interrupt controller ("ARMCTRL").
//!
//! 64 lines in two banks. Enable and disable registers are write-1-to-set, so single stores need
//! no lock.
//!
//! # Resources
//!
//! - <https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf>

use super::{HandlerTable, PendingIRQs, PeripheralIRQ};
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
        (0x00 => _basic_pending),
        (0x04 => PENDING: [ReadOnly<u32>; 2]),
        (0x0c => _fiq_control),
        (0x10 => ENABLE: [WriteOnly<u32>; 2]),
        (0x18 => _basic_enable),
        (0x1c => DISABLE: [WriteOnly<u32>; 2]),
        (0x24 => @END),
    }
}

type Registers = MMIODerefWrapper<RegisterBlock>;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The peripheral controller.
pub struct PeripheralIC {
    registers: Registers,
    handlers: InitStateLock<HandlerTable<PeripheralIRQ, { PeripheralIRQ::MAX_INCLUSIVE + 1 }>>,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl PeripheralIC {
    /// # Safety
    ///
    /// - `mmio_start_addr` must be the controller's base address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
            handlers: InitStateLock::new(HandlerTable::new()),
        }
    }

    /// Mask every line the firmware may have left enabled.
    pub fn init(&self) {
        for bank in &self.registers.DISABLE {
            bank.set(u32::MAX);
        }
    }

    fn pending_irqs(&self) -> PendingIRQs {
        let [low, high] = &self.registers.PENDING;

        PendingIRQs::new((u64::from(high.get()) << 32) | u64::from(low.get()))
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl exception::asynchronous::interface::IRQManager for PeripheralIC {
    type IRQNumberType = PeripheralIRQ;

    fn register_handler(
        &self,
        descriptor: IRQHandlerDescriptor<Self::IRQNumberType>,
    ) -> Result<(), &'static str> {
        self.handlers
            .write(|table| table.insert(descriptor.number().get(), descriptor))
    }

    fn enable(&self, irq: &Self::IRQNumberType) {
        let line = irq.get();

        self.registers.ENABLE[line / 32].set(1 << (line % 32));
    }

    fn handle_pending_irqs<'irq_context>(
        &'irq_context self,
        _ic: &exception::asynchronous::IRQContext<'irq_context>,
    ) {
        let pending = self.pending_irqs();

        self.handlers.read(|table| table.dispatch(pending))
    }

    fn print_handler(&self) {
        self.handlers.read(|table| table.print("Peripheral"));
    }
}
