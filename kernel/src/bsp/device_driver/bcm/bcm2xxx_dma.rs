// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! DMA controller status driver.
//!
//! Only the control/status word of channel 0 is touched. The display engine owns that channel for
//! block moves, and the terminal loop holds off rendering while a transfer is active.

use crate::{
    bsp::device_driver::common::MMIODerefWrapper, dma, driver, exception::asynchronous::IRQNumber,
};
use tock_registers::{
    interfaces::Readable, register_bitfields, register_structs, registers::ReadOnly,
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    /// Channel 0 Control and Status.
    CS [
        /// DMA Error. Set when the channel has an error flag set in its debug register.
        ERROR OFFSET(8) NUMBITS(1) [],

        /// Transfer paused because DREQ is inactive or the channel is paused.
        PAUSED OFFSET(4) NUMBITS(1) [],

        /// Activate the DMA. Reads as 1 while a transfer is in progress.
        ACTIVE OFFSET(0) NUMBITS(1) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => CS: ReadOnly<u32, CS::Register>),
        (0x04 => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of DMA channel 0.
pub struct DMAChannel0 {
    registers: Registers,
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl DMAChannel0 {
    pub const COMPATIBLE: &'static str = "BCM DMA channel 0";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
        }
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl driver::interface::DeviceDriver for DMAChannel0 {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        if self.registers.CS.is_set(CS::ERROR) {
            crate::warn!("DMA: channel 0 reports a pending error");
        }

        Ok(())
    }
}

impl dma::interface::Status for DMAChannel0 {
    fn is_busy(&self) -> bool {
        // A paused transfer still owns the channel.
        self.registers.CS.is_set(CS::ACTIVE)
    }
}
