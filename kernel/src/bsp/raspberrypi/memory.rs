// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! BSP Memory Management.
//!
//! The physical memory layout. Virtual addresses are identical.
//!
//! The Raspberry's firmware copies the kernel binary to 0x8_0000. The preceding region will be used
//! as the boot core's stack.
//!
//! +---------------------------------------+
//! |                                       | boot_core_stack_start @ 0x0
//! |                                       |                                ^
//! | Boot-core Stack                       |                                | stack
//! |                                       |                                | growth
//! |                                       |                                | direction
//! +---------------------------------------+
//! |                                       | code_start @ 0x8_0000 == boot_core_stack_end_exclusive
//! | .text                                 |
//! | .rodata                               |
//! | .got                                  |
//! |                                       |
//! +---------------------------------------+
//! |                                       | data_start == code_end_exclusive
//! | .data                                 |
//! | .bss                                  |
//! |                                       |
//! +---------------------------------------+
//! |                                       | heap_start == data_end_exclusive
//! | .heap (arena, 16 MiB)                 |
//! |                                       |
//! +---------------------------------------+
//! |                                       | heap_end_exclusive
//! |                                       |
//! ~                                       ~
//! +---------------------------------------+
//! |                                       | 0x3C00_0000
//! | VideoCore memory (framebuffer)        |
//! |                                       |
//! +---------------------------------------+
//! |                                       | 0x3F00_0000
//! | Peripherals, local interrupt ctrl     |
//! |                                       |
//! +---------------------------------------+  0x4001_0000
pub mod mmu;

use core::cell::UnsafeCell;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

// Symbols from the linker script.
extern "Rust" {
    static __code_start: UnsafeCell<()>;
    static __code_end_exclusive: UnsafeCell<()>;

    static __heap_start: UnsafeCell<()>;
    static __heap_end_exclusive: UnsafeCell<()>;
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The board's physical memory map.
#[rustfmt::skip]
pub(super) mod map {
    /// Start of the memory the GPU carves out of the SDRAM. The framebuffer is allocated in here.
    pub const VIDEOCORE_START:         usize =        0x3C00_0000;

    pub const END_INCLUSIVE:           usize =        0xFFFF_FFFF;

    /// Physical devices.
    pub mod mmio {
        pub const START:               usize =        0x3F00_0000;
        pub const DMA_START:           usize = START + 0x0000_7000;
        pub const PERIPHERAL_IC_START: usize = START + 0x0000_B200;
        pub const MAILBOX_START:       usize = START + 0x0000_B880;
        pub const GPIO_START:          usize = START + 0x0020_0000;
        pub const PL011_UART_START:    usize = START + 0x0020_1000;
        pub const LOCAL_IC_START:      usize =        0x4000_0000;
        pub const END_INCLUSIVE:       usize =        0x4000_FFFF;
    }
}

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

/// Start address of the Read+Execute (RX) range.
///
/// # Safety
///
/// - Value is provided by the linker script and must be trusted as-is.
#[inline(always)]
fn code_start() -> usize {
    unsafe { __code_start.get() as usize }
}

/// Exclusive end address of the Read+Execute (RX) range.
///
/// # Safety
///
/// - Value is provided by the linker script and must be trusted as-is.
#[inline(always)]
fn code_end_exclusive() -> usize {
    unsafe { __code_end_exclusive.get() as usize }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The region the kernel heap arena spans, as (start, size).
///
/// # Safety
///
/// - Values are provided by the linker script and must be trusted as-is.
pub fn heap_region() -> (usize, usize) {
    let start = unsafe { __heap_start.get() as usize };
    let end_exclusive = unsafe { __heap_end_exclusive.get() as usize };

    (start, end_exclusive - start)
}
