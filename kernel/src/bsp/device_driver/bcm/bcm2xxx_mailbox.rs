// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! VideoCore mailbox driver.
//!
//! Talks to the GPU firmware over the property channel to allocate the framebuffer and to load
//! the palette.
//!
//! # Resources
//!
//! - <https://github.com/raspberrypi/firmware/wiki/Mailbox-property-interface>

use crate::{
    bsp::device_driver::common::MMIODerefWrapper,
    cpu, display, driver,
    exception::asynchronous::IRQNumber,
    synchronization,
    synchronization::IRQSafeNullLock,
};
use tock_registers::{
    interfaces::{Readable, Writeable},
    register_bitfields, register_structs,
    registers::{ReadOnly, WriteOnly},
};

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

register_bitfields! {
    u32,

    STATUS [
        FULL  OFFSET(31) NUMBITS(1) [],
        EMPTY OFFSET(30) NUMBITS(1) []
    ]
}

register_structs! {
    #[allow(non_snake_case)]
    RegisterBlock {
        (0x00 => READ: ReadOnly<u32>),
        (0x04 => _reserved1),
        (0x18 => STATUS: ReadOnly<u32, STATUS::Register>),
        (0x1C => _reserved2),
        (0x20 => WRITE: WriteOnly<u32>),
        (0x24 => @END),
    }
}

/// Abstraction for the associated MMIO registers.
type Registers = MMIODerefWrapper<RegisterBlock>;

mod channel {
    /// ARM to VideoCore property tags.
    pub const PROPERTY: u32 = 8;
}

mod tag {
    pub const ALLOCATE_BUFFER: u32 = 0x0004_0001;
    pub const GET_PITCH: u32 = 0x0004_0008;
    pub const SET_PHYSICAL_SIZE: u32 = 0x0004_8003;
    pub const SET_VIRTUAL_SIZE: u32 = 0x0004_8004;
    pub const SET_DEPTH: u32 = 0x0004_8005;
    pub const SET_PALETTE: u32 = 0x0004_800B;
    pub const END: u32 = 0;
}

mod code {
    pub const REQUEST: u32 = 0;
    pub const RESPONSE_SUCCESS: u32 = 0x8000_0000;
    pub const RESPONSE_ERROR: u32 = 0x8000_0001;
}

/// VideoCore bus addresses carry the cache alias in the top two bits.
const BUS_ADDRESS_MASK: u32 = 0x3FFF_FFFF;

const BUFFER_WORDS: usize = 36;

/// The message buffer. The VideoCore only sees the upper 28 bits of its address.
#[repr(C, align(16))]
struct PropertyBuffer([u32; BUFFER_WORDS]);

struct MailboxInner {
    registers: Registers,
    buffer: PropertyBuffer,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Representation of the VideoCore mailbox.
pub struct Mailbox {
    inner: IRQSafeNullLock<MailboxInner>,
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl MailboxInner {
    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            registers: Registers::new(mmio_start_addr),
            buffer: PropertyBuffer([0; BUFFER_WORDS]),
        }
    }

    /// Send the message in `self.buffer` on `channel` and wait for the reply to it.
    fn call(&mut self, channel: u32) -> Result<(), &'static str> {
        let buffer_addr = self.buffer.0.as_ptr() as usize;
        let message = u32::try_from(buffer_addr).map_err(|_| "Mailbox buffer above 4 GiB")?;

        // The GPU reads the message from RAM and writes the reply back in place.
        cpu::clean_and_invalidate_dcache_range(buffer_addr, BUFFER_WORDS * 4);

        while self.registers.STATUS.is_set(STATUS::FULL) {
            cpu::nop();
        }
        self.registers.WRITE.set((message & !0xF) | (channel & 0xF));

        loop {
            while self.registers.STATUS.is_set(STATUS::EMPTY) {
                cpu::nop();
            }

            let reply = self.registers.READ.get();
            if reply == ((message & !0xF) | (channel & 0xF)) {
                break;
            }
        }

        cpu::clean_and_invalidate_dcache_range(buffer_addr, BUFFER_WORDS * 4);

        match self.read_word(1) {
            code::RESPONSE_SUCCESS => Ok(()),
            code::RESPONSE_ERROR => Err("Mailbox: error parsing request"),
            _ => Err("Mailbox: unexpected response code"),
        }
    }

    /// The VideoCore writes the reply behind the compiler's back.
    fn read_word(&self, index: usize) -> u32 {
        unsafe { core::ptr::read_volatile(&self.buffer.0[index]) }
    }

    fn establish_video_surface(
        &mut self,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<display::VideoSurface, &'static str> {
        #[rustfmt::skip]
        let message: [u32; 26] = [
            26 * 4, code::REQUEST,
            tag::SET_PHYSICAL_SIZE, 8, 8, width, height,
            tag::SET_VIRTUAL_SIZE, 8, 8, width, height,
            tag::SET_DEPTH, 4, 4, depth,
            tag::ALLOCATE_BUFFER, 8, 4, 16, 0,
            tag::GET_PITCH, 4, 0, 0,
            tag::END,
        ];
        self.buffer.0[..message.len()].copy_from_slice(&message);

        self.call(channel::PROPERTY)?;

        let granted = (self.read_word(5), self.read_word(6), self.read_word(15));
        if granted != (width, height, depth) {
            return Err("Mailbox: video mode refused");
        }

        let base = self.read_word(19) & BUS_ADDRESS_MASK;
        let size = self.read_word(20);
        let pitch = self.read_word(24);
        if base == 0 || size == 0 {
            return Err("Mailbox: no framebuffer allocated");
        }

        Ok(display::VideoSurface {
            base: base as usize,
            size: size as usize,
            pitch: pitch as usize,
            width: width as usize,
            height: height as usize,
            depth: depth as usize,
        })
    }

    fn set_palette(&mut self, colors: &[u32]) -> Result<(), &'static str> {
        // Header (2), tag header (3), offset and length (2), end tag (1).
        const OVERHEAD: usize = 8;

        let count = colors.len();
        if count == 0 || count + OVERHEAD > BUFFER_WORDS {
            return Err("Mailbox: palette does not fit the message buffer");
        }

        let value_bytes = ((2 + count) * 4) as u32;
        let total_bytes = ((OVERHEAD + count) * 4) as u32;
        self.buffer.0[..7].copy_from_slice(&[
            total_bytes,
            code::REQUEST,
            tag::SET_PALETTE,
            value_bytes,
            value_bytes,
            0,
            count as u32,
        ]);

        // 0xRRGGBB in, 0xAABBGGRR out.
        for (slot, rgb) in self.buffer.0[7..7 + count].iter_mut().zip(colors) {
            let (r, g, b) = ((rgb >> 16) & 0xFF, (rgb >> 8) & 0xFF, rgb & 0xFF);
            *slot = 0xFF00_0000 | (b << 16) | (g << 8) | r;
        }
        self.buffer.0[7 + count] = tag::END;

        self.call(channel::PROPERTY)?;

        // The tag value returns 0 for a valid palette.
        match self.read_word(5) {
            0 => Ok(()),
            _ => Err("Mailbox: palette refused"),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

impl Mailbox {
    pub const COMPATIBLE: &'static str = "BCM VideoCore Mailbox";

    /// Create an instance.
    ///
    /// # Safety
    ///
    /// - The user must ensure to provide a correct MMIO start address.
    pub const unsafe fn new(mmio_start_addr: usize) -> Self {
        Self {
            inner: IRQSafeNullLock::new(MailboxInner::new(mmio_start_addr)),
        }
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------
use synchronization::interface::Mutex;

impl driver::interface::DeviceDriver for Mailbox {
    type IRQNumberType = IRQNumber;

    fn compatible(&self) -> &'static str {
        Self::COMPATIBLE
    }
}

impl display::interface::VideoOutput for Mailbox {
    fn establish_video_surface(
        &self,
        width: u32,
        height: u32,
        depth: u32,
    ) -> Result<display::VideoSurface, &'static str> {
        self.inner
            .lock(|inner| inner.establish_video_surface(width, height, depth))
    }

    fn set_palette(&self, colors: &[u32]) -> Result<(), &'static str> {
        self.inner.lock(|inner| inner.set_palette(colors))
    }
}
