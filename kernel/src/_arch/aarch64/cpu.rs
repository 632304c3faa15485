// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Architectural processor code.
//!
//! # Orientation
//!
//! Since arch modules are imported into generic modules using the path attribute, the path of this
//! file is:
//!
//! crate::cpu::arch_cpu

use aarch64_cpu::asm::{self, barrier};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

pub use asm::nop;

/// Park the core.
#[inline(always)]
pub fn wait_forever() -> ! {
    loop {
        asm::wfe()
    }
}

/// Full-system data synchronization barrier.
///
/// Orders normal memory accesses against MMIO that other bus masters (the VideoCore, the DMA
/// engine) act upon.
#[inline(always)]
pub fn memory_barrier() {
    barrier::dsb(barrier::SY);
}

/// Clean and invalidate the data cache lines covering `[start, start + len)` to the point of
/// coherency.
///
/// Needed for buffers in cacheable memory that another bus master reads and then writes back.
#[inline(always)]
pub fn clean_and_invalidate_dcache_range(start: usize, len: usize) {
    // The Cortex-A53 has 64 byte cache lines.
    const LINE: usize = 64;

    let mut addr = start & !(LINE - 1);
    while addr < start + len {
        unsafe { core::arch::asm!("dc civac, {}", in(reg) addr, options(nostack)) };
        addr += LINE;
    }

    barrier::dsb(barrier::SY);
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------
#[cfg(feature = "test_build")]
use qemu_exit::QEMUExit;

#[cfg(feature = "test_build")]
const QEMU_EXIT_HANDLE: qemu_exit::AArch64 = qemu_exit::AArch64::new();

/// Semihosting exit with status 1.
#[cfg(feature = "test_build")]
pub fn qemu_exit_failure() -> ! {
    QEMU_EXIT_HANDLE.exit_failure()
}

/// Semihosting exit with status 0.
#[cfg(feature = "test_build")]
pub fn qemu_exit_success() -> ! {
    QEMU_EXIT_HANDLE.exit_success()
}
