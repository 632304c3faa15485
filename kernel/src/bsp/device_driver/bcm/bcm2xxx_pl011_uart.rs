// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! PL011 UART driver.
//!
//! The receive side feeds the serial ring. Reception raises an IRQ when the RX FIFO reaches 1/8
//! fill level, or when it holds at least one byte and the line went idle for 32 bit periods
//! (receive timeout). The latter makes single keystrokes from the remote end visible without any
//! FIFO tricks.
//!
//! # Resources
//!
//! - <https://github.com/raspberrypi/documentation/files/1888662/BCM2837-ARM-Peripherals.-.Revised.-.V2-1.pdf>
//! - <https://developer.arm.com/documentation/ddi0183/latest>

use crate::{
    bsp::device_driver::common::MMIODerefWrapper,
    config, console, cpu, driver,
    exception::{self, asynchronous::IRQNumber},
    serial, synchronization,
    synchronization::IRQSafeNullLock,
};
use core::fmt;
use term_core::{
    ingest::{self, interface::RxFifo, IngestReport},
    ring::Producer,
};
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_bitfields, register_structs,
    registers::{ReadOnly, ReadWrite, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// Field layout as per the PL011 TRM r1p5, chapter 3. Only what this driver touches is listed.
register_bitfields! {
    u32,

    FR [
        /// TX FIFO full.
        TXFF OFFSET(5) NUMBITS(1) [],

        /// RX FIFO empty.
        RXFE OFFSET(4) NUMBITS(1) [],

        /// Still shifting out a character, stop bits included.
        BUSY OFFSET(3) NUMBITS(1) []
    ],

    IBRD [
        BAUD_DIVINT OFFSET(0) NUMBITS(16) []
    ],

    FBRD [
        BAUD_DIVFRAC OFFSET(0) NUMBITS(6) []
    ],

    LCR_H [
        #[allow(clippy::enum_variant_names)]
        WLEN OFFSET(5) NUMBITS(2) [
            EightBit = 0b11
        ],

        /// 16 entry FIFOs instead of one holding register per direction.
        FEN OFFSET(4) NUMBITS(1) []
    ],

    CR [
        RXE OFFSET(9) NUMBITS(1) [],
        TXE OFFSET(8) NUMBITS(1) [],
        UARTEN OFFSET(0) NUMBITS(1) []
    ],

    IFLS [
        /// RX interrupt trigger level.
        RXIFLSEL OFFSET(3) NUMBITS(3) [
            OneEighth = 0b000
        ]
    ],

    /// A set bit lets the interrupt through.
    IMSC [
        /// Break error.
        BEIM OFFSET(9) NUMBITS(1) [],

        /// Framing error.
        FEIM OFFSET(7) NUMBITS(1) [],

        /// Receive timeout.
        RTIM OFFSET(6) NUMBITS(1) [],

        /// Receive.
        RXIM OFFSET(4) NUMBITS(1) []
    ],

    ICR [
        ALL OFFSET(0) NUMBITS(11) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    pub RegisterBlock {
        (0x00 => DR: ReadWrite<u32>),
        (0x04 => _reserved1),
        (0x18 => FR: ReadOnly<u32, FR::Register>),
        (0x1c => _reserved2),
        (0x24 => IBRD: WriteOnly<u32, IBRD::Register>),
        (0x28 => FBRD: WriteOnly<u32, FBRD::Register>),
        (0x2c => LCR_H: WriteOnly<u32, LCR_H::Register>),
        (0x30 => CR: WriteOnly<u32, CR::Register>),
        (0x34 => IFLS: ReadWrite<u32, IFLS::Register>),
        (0x38 => IMSC: ReadWrite<u32, IMSC::Register>),
        (0x3C => _reserved3),
        (0x44 => ICR: WriteOnly<u32, ICR::Register>),
        (0x48 => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

/// The receive half of the register block, as seen by the ingestion routine.
struct RxRegisters<'a>(&'a Registers);

struct PL011UartInner {
    registers: Registers,
    producer: Option<Producer<'static>>,
    chars_written: usize,
    chars_read: usize,
    chars_dropped: usize,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the UART.
pub struct PL011Uart {
    inner: IRQSafeNullLock<PL011UartInner>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl RxFifo for RxRegisters<'_> {
    fn rx_data_available(&self) -> bool {
        !self.0.FR.matches_all(FR::RXFE::SET)
    }

    fn read_rx_byte(&self) -> u8 {
        // Bits 8..11 carry the per-byte error flags. The data byte is all the ring stores.
        self.0.DR.get() as u8
    }

    fn clear_pending_interrupts(&self) {
        self.0.ICR.write(ICR::ALL::CLEAR);
    }
}

impl PL011UartInner {
    /// The UART reference clock as set up by the firmware.
    const UART_CLOCK_HZ: u32 = 48_000_000;

    /// Baud rate divisor in units of 1/64, rounded to the nearest value.
    ///
    /// IBRD is the integer part, FBRD the six fractional bits.
    const BAUD_DIVISOR_X64: u32 =
        (4 * Self::UART_CLOCK_HZ + config::UART_BAUD_RATE / 2) / config::UART_BAUD_RATE;

    /// # Safety
    ///
    /// - `mmio_start_addr` must be the PL011's base address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
            producer: None,
            chars_written: 0,
            chars_read: 0,
            chars_dropped: 0,
        }
    }

    /// Set up baud rate and characteristics.
    ///
    /// With the default of 115200 baud at 48 MHz, the divisor is 26.0417, i.e. IBRD 26 and
    /// FBRD 3. The line is 8N1.
    pub fn init(&mut self) {
        // Switching off mid-character loses whatever the firmware still has queued.
        self.flush();

        self.registers.CR.set(0);
        self.registers.ICR.write(ICR::ALL::CLEAR);

        self.registers
            .IBRD
            .write(IBRD::BAUD_DIVINT.val(Self::BAUD_DIVISOR_X64 >> 6));
        self.registers
            .FBRD
            .write(FBRD::BAUD_DIVFRAC.val(Self::BAUD_DIVISOR_X64 & 0x3F));
        self.registers
            .LCR_H
            .write(LCR_H::WLEN::EightBit + LCR_H::FEN::SET);
        self.registers.IFLS.write(IFLS::RXIFLSEL::OneEighth);

        // Line errors are unmasked only so that the handler clears them.
        self.registers
            .IMSC
            .write(IMSC::RXIM::SET + IMSC::RTIM::SET + IMSC::FEIM::SET + IMSC::BEIM::SET);

        self.registers
            .CR
            .write(CR::UARTEN::SET + CR::TXE::SET + CR::RXE::SET);
    }

    /// Send a byte. Spins while the TX FIFO is full.
    fn write_byte(&mut self, byte: u8) {
        while self.registers.FR.matches_all(FR::TXFF::SET) {
            cpu::nop();
        }

        self.registers.DR.set(u32::from(byte));

        self.chars_written += 1;
    }

    /// Send a character, translating `\n` into `\r\n`.
    fn write_char(&mut self, c: char) {
        let mut utf8 = [0; 4];

        for &byte in c.encode_utf8(&mut utf8).as_bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    /// Spin until the last character left the shift register.
    fn flush(&self) {
        while self.registers.FR.matches_all(FR::BUSY::SET) {
            cpu::nop();
        }
    }

    /// Move everything the RX FIFO holds into the ring.
    ///
    /// Without an attached ring, the bytes are discarded, since leaving them in the FIFO would
    /// keep the RX interrupt asserted.
    fn ingest(&mut self) -> IngestReport {
        let fifo = RxRegisters(&self.registers);

        let report = match self.producer.as_mut() {
            Some(producer) => {
                let report = ingest::ingest(&fifo, producer);
                self.chars_read += report.stored;

                report
            }
            None => {
                let mut report = IngestReport::default();
                while fifo.rx_data_available() {
                    fifo.read_rx_byte();
                    report.dropped += 1;
                }
                fifo.clear_pending_interrupts();
                self.chars_read += report.dropped;

                report
            }
        };

        // With a ring attached, these are the oldest unread bytes it overwrote.
        self.chars_dropped += report.dropped;

        report
    }
}

/// Backs the console's `write_fmt()` while the UART is the console.
impl fmt::Write for PL011UartInner {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for c in s.chars() {
            self.write_char(c);
        }

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl PL011Uart {
    pub const COMPATIBLE: &'static str = "BCM PL011 UART";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            inner: IRQSafeNullLock::new(PL011UartInner::new(mmio_start_addr)),
        }
    }

    /// Number of received bytes that did not make it into the ring.
    pub fn chars_dropped(&self) -> usize {
        self.inner.lock(|inner| inner.chars_dropped)
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------
use synchronization::interface::Mutex;

impl driver::interface::DeviceDriver for PL011Uart {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }

    unsafe fn init(&self) -> Result<(), &'static str> {
        self.inner.lock(|inner| inner.init());

        Ok(())
    }

    fn register_and_enable_irq_handler(
        &'static self,
        irq_number: &Self::IRQNumberType,
    ) -> Result<(), &'static str> {
        use exception::asynchronous::{irq_manager, IRQHandlerDescriptor};

        let descriptor = IRQHandlerDescriptor::new(*irq_number, Self::COMPATIBLE, self);

        irq_manager().register_handler(descriptor)?;
        irq_manager().enable(irq_number);

        Ok(())
    }
}

impl serial::interface::Link for PL011Uart {
    fn attach_producer(&self, producer: Producer<'static>) -> Result<(), &'static str> {
        self.inner.lock(|inner| {
            if inner.producer.is_some() {
                return Err("Serial ring producer already attached");
            }
            inner.producer = Some(producer);

            Ok(())
        })
    }

    fn ingest(&self) -> IngestReport {
        self.inner.lock(|inner| inner.ingest())
    }

    fn write_byte(&self, byte: u8) {
        self.inner.lock(|inner| inner.write_byte(byte))
    }
}

impl console::interface::Write for PL011Uart {
    fn write_char(&self, c: char) {
        self.inner.lock(|inner| inner.write_char(c));
    }

    fn write_bytes(&self, bytes: &[u8]) {
        self.inner.lock(|inner| {
            for &byte in bytes {
                if byte == b'\n' {
                    inner.write_byte(b'\r');
                }
                inner.write_byte(byte);
            }
        });
    }

    fn write_fmt(&self, args: core::fmt::Arguments) -> fmt::Result {
        self.inner.lock(|inner| fmt::Write::write_fmt(inner, args))
    }

    fn flush(&self) {
        self.inner.lock(|inner| inner.flush());
    }
}

impl console::interface::Statistics for PL011Uart {
    fn chars_written(&self) -> usize {
        self.inner.lock(|inner| inner.chars_written)
    }
}

impl console::interface::All for PL011Uart {}

impl exception::asynchronous::interface::IRQHandler for PL011Uart {
    fn handle(&self) -> Result<(), &'static str> {
        use serial::interface::Link;

        let report = self.ingest();

        if report.dropped > 0 {
            crate::debug!("UART: {} bytes dropped", report.dropped);
        }

        Ok(())
    }
}
