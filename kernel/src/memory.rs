// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! Memory Management.

pub mod heap_alloc;
pub mod mmu;

use crate::{bsp, info};

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// Initialize the memory subsystem.
///
/// Turns on the MMU with the identity map of the BSP's layout, then hands the heap region to the
/// kernel's allocator. Nothing may allocate before this ran.
///
/// # Safety
///
/// - Must be called exactly once, from the boot core, before any other memory management call.
pub unsafe fn init() {
    use mmu::interface::MMU;

    if let Err(string) = mmu::mmu().enable_mmu_and_caching() {
        panic!("MMU: {}", string);
    }

    heap_alloc::kernel_init_heap_allocator();
}

/// Print the memory layout and allocator usage.
pub fn print_state() {
    info!("MMU online. Special regions:");
    bsp::memory::mmu::virt_mem_layout().print_layout();

    info!("Kernel heap:");
    heap_alloc::kernel_heap_allocator().print_usage();
}
