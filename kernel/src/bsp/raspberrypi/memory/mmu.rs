// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2018-2023 Andre Richter <andre.o.richter@gmail.com>

//! BSP Memory Management Unit.

use super::map as memory_map;
use crate::memory::mmu::*;
use core::ops::RangeInclusive;

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// The kernel's address space defined by this BSP.
pub type KernelAddrSpace = AddressSpace<{ 2 * 1024 * 1024 * 1024 }>;

const NUM_MEM_RANGES: usize = 3;

const DEVICE_RW: AttributeFields = AttributeFields {
    mem_attributes: MemAttributes::Device,
    acc_perms: AccessPermissions::ReadWrite,
    execute_never: true,
};

/// Everything that is not plain read-write DRAM.
///
/// The framebuffer lives in VideoCore memory and is written by the DMA engine behind the CPU's
/// back, so it is mapped uncached like the peripherals.
pub static LAYOUT: KernelVirtualLayout<NUM_MEM_RANGES> = KernelVirtualLayout::new(
    KernelAddrSpace::SIZE - 1,
    [
        TranslationDescriptor {
            name: "Kernel code and RO data",
            virtual_range: code_range_inclusive,
            attribute_fields: AttributeFields {
                mem_attributes: MemAttributes::CacheableDRAM,
                acc_perms: AccessPermissions::ReadOnly,
                execute_never: false,
            },
        },
        TranslationDescriptor {
            name: "VideoCore memory",
            virtual_range: videocore_range_inclusive,
            attribute_fields: DEVICE_RW,
        },
        TranslationDescriptor {
            name: "Device MMIO",
            virtual_range: mmio_range_inclusive,
            attribute_fields: DEVICE_RW,
        },
    ],
);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

#[allow(clippy::range_minus_one)]
fn code_range_inclusive() -> RangeInclusive<usize> {
    super::code_start()..=super::code_end_exclusive() - 1
}

fn videocore_range_inclusive() -> RangeInclusive<usize> {
    memory_map::VIDEOCORE_START..=memory_map::mmio::START - 1
}

fn mmio_range_inclusive() -> RangeInclusive<usize> {
    memory_map::mmio::START..=memory_map::mmio::END_INCLUSIVE
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------

/// The board's layout, consumed by the MMU driver.
pub fn virt_mem_layout() -> &'static KernelVirtualLayout<NUM_MEM_RANGES> {
    &LAYOUT
}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::kernel_test;

    /// Page attributes are per 64 KiB page, so every range must start and end on a page.
    #[kernel_test]
    fn virt_mem_layout_sections_are_64kib_aligned() {
        const PAGE: usize = 64 * 1024;

        for range in LAYOUT.inner().iter().map(|d| (d.virtual_range)()) {
            let (start, end_exclusive) = (*range.start(), *range.end() + 1);

            assert_eq!(start % PAGE, 0);
            assert_eq!(end_exclusive % PAGE, 0);
            assert!(end_exclusive > start);
        }
    }

    /// The framebuffer and the peripherals must never be cached.
    #[kernel_test]
    fn device_ranges_are_uncached() {
        let framebuffer = LAYOUT.virt_addr_properties(0x3C10_0000).unwrap();
        let uart = LAYOUT
            .virt_addr_properties(memory_map::mmio::PL011_UART_START)
            .unwrap();
        let heap = LAYOUT.virt_addr_properties(super::super::heap_region().0).unwrap();

        assert_eq!(framebuffer.mem_attributes, MemAttributes::Device);
        assert_eq!(uart.mem_attributes, MemAttributes::Device);
        assert_eq!(heap, AttributeFields::default());
    }
}
