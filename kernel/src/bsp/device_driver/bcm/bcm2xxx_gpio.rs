// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! GPIO Driver.
//!
//! Three pin groups are used:
//!
//! - 14/15: PL011 TX/RX on ALT0, pull resistors off.
//! - 16: the status LED, a plain output driven through the set/clear registers.
//! - 22..27: JTAG on ALT4, only with the `jtag` feature.

use crate::{
    bsp::device_driver::common::MMIODerefWrapper, driver, exception::asynchronous::IRQNumber,
    synchronization, synchronization::IRQSafeNullLock,
};
use term_core::heartbeat::interface::StatusIndicator;
use tock_registers::{
    interfaces::{ReadWriteable, Writeable},
    register_bitfields, register_structs,
    registers::{ReadWrite, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// GPIO registers.
//
// Descriptions taken from
// - https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf
register_bitfields! {
    u32,

    /// GPIO Function Select 1
    GPFSEL1 [
        /// Pin 16
        FSEL16 OFFSET(18) NUMBITS(3) [
            Input = 0b000,
            Output = 0b001
        ],

        /// Pin 15
        FSEL15 OFFSET(15) NUMBITS(3) [
            Input = 0b000,
            Output = 0b001,
            AltFunc0 = 0b100  // PL011 UART RX

        ],

        /// Pin 14
        FSEL14 OFFSET(12) NUMBITS(3) [
            Input = 0b000,
            Output = 0b001,
            AltFunc0 = 0b100  // PL011 UART TX
        ]
    ],

    /// GPIO Function Select 2
    GPFSEL2 [
        /// Pin 27
        FSEL27 OFFSET(21) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG TMS
        ],

        /// Pin 26
        FSEL26 OFFSET(18) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG TDI
        ],

        /// Pin 25
        FSEL25 OFFSET(15) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG TCK
        ],

        /// Pin 24
        FSEL24 OFFSET(12) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG TDO
        ],

        /// Pin 23
        FSEL23 OFFSET(9) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG RTCK
        ],

        /// Pin 22
        FSEL22 OFFSET(6) NUMBITS(3) [
            Input = 0b000,
            AltFunc4 = 0b011 // JTAG TRST
        ]
    ],

    /// GPIO Pull-up/down Register
    GPPUD [
        /// Controls the actuation of the internal pull-up/down control line to ALL the GPIO pins.
        PUD OFFSET(0) NUMBITS(2) [
            Off = 0b00,
            PullDown = 0b01,
            PullUp = 0b10
        ]
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => _reserved1),
        (0x04 => GPFSEL1: ReadWrite<u32, GPFSEL1::Register>),
        (0x08 => GPFSEL2: ReadWrite<u32, GPFSEL2::Register>),
        (0x0C => _reserved2),
        (0x1C => GPSET0: WriteOnly<u32>),
        (0x20 => _reserved3),
        (0x28 => GPCLR0: WriteOnly<u32>),
        (0x2C => _reserved4),
        (0x94 => GPPUD: ReadWrite<u32, GPPUD::Register>),
        (0x98 => GPPUDCLK0: WriteOnly<u32>),
        (0x9C => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

struct GPIOInner {
    registers: Registers,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the GPIO HW.
pub struct GPIO {
    inner: IRQSafeNullLock<GPIOInner>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl GPIOInner {
    const STATUS_LED_PIN: u32 = 16;
    const PL011_PINS: u32 = (1 << 14) | (1 << 15);
    #[cfg(feature = "jtag")]
    const JTAG_PINS: u32 = 0b11_1111 << 22;

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

    /// Switch the pull resistors of the pins in `pin_mask` off.
    ///
    /// The BCM2837 sequence: program GPPUD, wait 150 cycles, clock it into the pins, wait again,
    /// then remove the clock.
    fn disable_pud(&mut self, pin_mask: u32) {
        use crate::cpu;

        const DELAY: usize = 150;

        self.registers.GPPUD.write(GPPUD::PUD::Off);
        for _ in 0..DELAY {
            cpu::nop();
        }

        self.registers.GPPUDCLK0.set(pin_mask);
        for _ in 0..DELAY {
            cpu::nop();
        }

        self.registers.GPPUD.write(GPPUD::PUD::Off);
        self.registers.GPPUDCLK0.set(0);
    }

    /// Map PL011 UART as standard output.
    ///
    /// TX to pin 14
    /// RX to pin 15
    pub fn map_pl011_uart(&mut self) {
        self.registers
            .GPFSEL1
            .modify(GPFSEL1::FSEL15::AltFunc0 + GPFSEL1::FSEL14::AltFunc0);

        self.disable_pud(Self::PL011_PINS);
    }

    /// Configure the status LED pin as a low output.
    pub fn map_status_led(&mut self) {
        self.registers.GPFSEL1.modify(GPFSEL1::FSEL16::Output);
        self.set_status_led(false);
    }

    /// Route the ARM JTAG signals to pins 22..27.
    #[cfg(feature = "jtag")]
    pub fn map_jtag(&mut self) {
        self.registers.GPFSEL2.modify(
            GPFSEL2::FSEL22::AltFunc4
                + GPFSEL2::FSEL23::AltFunc4
                + GPFSEL2::FSEL24::AltFunc4
                + GPFSEL2::FSEL25::AltFunc4
                + GPFSEL2::FSEL26::AltFunc4
                + GPFSEL2::FSEL27::AltFunc4,
        );

        self.disable_pud(Self::JTAG_PINS);
    }

    fn set_status_led(&mut self, lit: bool) {
        let bit = 1 << Self::STATUS_LED_PIN;

        if lit {
            self.registers.GPSET0.set(bit);
        } else {
            self.registers.GPCLR0.set(bit);
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl GPIO {
    pub const COMPATIBLE: &'static str = "BCM GPIO";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            inner: IRQSafeNullLock::new(GPIOInner::new(mmio_start_addr)),
        }
    }

    /// Concurrency safe version of `GPIOInner.map_pl011_uart()`
    pub fn map_pl011_uart(&self) {
        self.inner.lock(|inner| inner.map_pl011_uart())
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------
use synchronization::interface::Mutex;

impl driver::interface::DeviceDriver for GPIO {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        self.inner.lock(|inner| {
            inner.map_status_led();

            #[cfg(feature = "jtag")]
            inner.map_jtag();
        });

        Ok(())
    }
}

impl StatusIndicator for GPIO {
    fn set_lit(&self, lit: bool) {
        self.inner.lock(|inner| inner.set_status_led(lit))
    }
}
